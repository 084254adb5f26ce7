//! # Editor Events
//!
//! Notifications the editor fires for the host UI, and the listener
//! registry that delivers them.
//!
//! ## Design
//!
//! - Listeners see the event only, never the editor, so dispatch cannot
//!   re-enter an operation
//! - A failing listener does not stop the others; its error is handed back
//!   to the caller for the error hook
//! - `willPaste` is the one cancelable event; its listeners may rewrite the
//!   payload or veto the insertion

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::clipboard::ClipboardItem;
use crate::range::Range;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorEvent {
    /// Breadcrumb of the selection's ancestors
    PathChange { path: String },
    /// The selection changed and is not collapsed
    Select { range: Range },
    /// The selection changed and is collapsed
    Cursor { range: Range },
    /// Content changed
    Input,
    #[serde(rename_all = "camelCase")]
    UndoStateChange { can_undo: bool, can_redo: bool },
    /// Images were pasted; the host decides what to insert
    PasteImage { items: Vec<ClipboardItem> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    PathChange,
    Select,
    Cursor,
    Input,
    UndoStateChange,
    PasteImage,
    WillPaste,
}

impl EditorEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::PathChange { .. } => EventType::PathChange,
            Self::Select { .. } => EventType::Select,
            Self::Cursor { .. } => EventType::Cursor,
            Self::Input => EventType::Input,
            Self::UndoStateChange { .. } => EventType::UndoStateChange,
            Self::PasteImage { .. } => EventType::PasteImage,
        }
    }
}

/// Content about to be pasted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum PastePayload {
    /// Cleaned markup of the fragment to insert
    Html(String),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WillPasteEvent {
    pub payload: PastePayload,
    default_prevented: bool,
}

impl WillPasteEvent {
    pub fn new(payload: PastePayload) -> Self {
        Self {
            payload,
            default_prevented: false,
        }
    }

    /// Cancel the insertion. The tree and selection stay as they were.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

pub type Listener = Box<dyn FnMut(&EditorEvent) -> anyhow::Result<()>>;
pub type PasteListener = Box<dyn FnMut(&mut WillPasteEvent) -> anyhow::Result<()>>;

#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: HashMap<EventType, Vec<(ListenerId, Listener)>>,
    paste_listeners: Vec<(ListenerId, PasteListener)>,
}

impl EventBus {
    fn allocate(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }

    /// Register a listener for a notification type. `WillPaste` listeners
    /// go through [`EventBus::on_will_paste`].
    pub fn on<F>(&mut self, event_type: EventType, listener: F) -> ListenerId
    where
        F: FnMut(&EditorEvent) -> anyhow::Result<()> + 'static,
    {
        let id = self.allocate();
        self.listeners
            .entry(event_type)
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    pub fn on_will_paste<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&mut WillPasteEvent) -> anyhow::Result<()> + 'static,
    {
        let id = self.allocate();
        self.paste_listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove one listener. Returns whether it was registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.len();
        for handlers in self.listeners.values_mut() {
            handlers.retain(|(handler_id, _)| *handler_id != id);
        }
        self.listeners.retain(|_, handlers| !handlers.is_empty());
        self.paste_listeners.retain(|(handler_id, _)| *handler_id != id);
        self.len() != before
    }

    /// Remove every listener of one type.
    pub fn off_all(&mut self, event_type: EventType) {
        if event_type == EventType::WillPaste {
            self.paste_listeners.clear();
        } else {
            self.listeners.remove(&event_type);
        }
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
        self.paste_listeners.clear();
    }

    pub fn has_listeners(&self, event_type: EventType) -> bool {
        match event_type {
            EventType::WillPaste => !self.paste_listeners.is_empty(),
            other => self.listeners.contains_key(&other),
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.values().map(Vec::len).sum::<usize>() + self.paste_listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to its listeners in registration order. Returns the
    /// errors they raised.
    pub fn emit(&mut self, event: &EditorEvent) -> Vec<anyhow::Error> {
        let Some(handlers) = self.listeners.get_mut(&event.event_type()) else {
            return Vec::new();
        };
        handlers
            .iter_mut()
            .filter_map(|(_, handler)| handler(event).err())
            .collect()
    }

    pub fn emit_will_paste(&mut self, event: &mut WillPasteEvent) -> Vec<anyhow::Error> {
        self.paste_listeners
            .iter_mut()
            .filter_map(|(_, handler)| handler(event).err())
            .collect()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("listeners", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_emit_reaches_matching_listeners_only() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::default();
        let sink = seen.clone();
        bus.on(EventType::Input, move |e| {
            sink.borrow_mut().push(e.clone());
            Ok(())
        });
        bus.emit(&EditorEvent::Input);
        bus.emit(&EditorEvent::PathChange { path: "DIV".into() });
        assert_eq!(*seen.borrow(), vec![EditorEvent::Input]);
    }

    #[test]
    fn test_failing_listener_does_not_stop_dispatch() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::default();
        bus.on(EventType::Input, |_| Err(anyhow::anyhow!("listener failed")));
        let counter = count.clone();
        bus.on(EventType::Input, move |_| {
            *counter.borrow_mut() += 1;
            Ok(())
        });
        let errors = bus.emit(&EditorEvent::Input);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "listener failed");
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_off_removes_listener() {
        let mut bus = EventBus::default();
        let id = bus.on(EventType::Cursor, |_| Ok(()));
        let paste = bus.on_will_paste(|_| Ok(()));
        assert_eq!(bus.len(), 2);
        assert!(bus.off(id));
        assert!(!bus.off(id));
        assert!(!bus.has_listeners(EventType::Cursor));
        bus.off_all(EventType::WillPaste);
        assert!(bus.is_empty());
        assert!(!bus.off(paste));
    }

    #[test]
    fn test_will_paste_can_rewrite_and_veto() {
        let mut bus = EventBus::default();
        bus.on_will_paste(|e| {
            if let PastePayload::Text(text) = &mut e.payload {
                *text = text.to_uppercase();
            }
            Ok(())
        });
        let mut event = WillPasteEvent::new(PastePayload::Text("hi".into()));
        bus.emit_will_paste(&mut event);
        assert_eq!(event.payload, PastePayload::Text("HI".into()));
        assert!(!event.default_prevented());

        bus.on_will_paste(|e| {
            e.prevent_default();
            Ok(())
        });
        bus.emit_will_paste(&mut event);
        assert!(event.default_prevented());
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_string(&EditorEvent::UndoStateChange {
            can_undo: true,
            can_redo: false,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"undoStateChange","canUndo":true,"canRedo":false}"#);
    }
}
