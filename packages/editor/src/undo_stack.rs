//! # Undo/Redo Stack
//!
//! Snapshot history of the editable root.
//!
//! ## Design
//!
//! - Each entry is the serialized root plus the selection as child-index
//!   paths, so it survives a re-parse
//! - `index` points at the entry matching the live document while the
//!   editor is in the undo state; any edit leaves that state
//! - Recording after an undo truncates the redo tail
//! - Past the document size threshold, the oldest entries are evicted down
//!   to the undo limit
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new(UndoConfig::default());
//! stack.record(UndoEntry::new("<div>a</div>", None), false);
//! // the document changes
//! stack.leave_undo_state();
//! let previous = stack.undo(UndoEntry::new("<div>ab</div>", None));
//! ```

use scribe_dom::{Document, NodeId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::UndoConfig;
use crate::range::Range;

/// A selection stored as child-index paths from the editable root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSelection {
    pub start_path: Vec<usize>,
    pub start_offset: usize,
    pub end_path: Vec<usize>,
    pub end_offset: usize,
}

fn path_to(doc: &Document, root: NodeId, node: NodeId) -> Option<Vec<usize>> {
    let mut path = Vec::new();
    let mut current = node;
    while current != root {
        path.push(doc.index_of(current)?);
        current = doc.parent(current)?;
    }
    path.reverse();
    Some(path)
}

/// Follow `path` as far as it exists, clamping the offset at the node reached.
fn resolve(doc: &Document, root: NodeId, path: &[usize], offset: usize) -> (NodeId, usize) {
    let mut node = root;
    for (depth, index) in path.iter().enumerate() {
        match doc.child(node, *index) {
            Some(child) => node = child,
            None => {
                let offset = if depth + 1 == path.len() { *index } else { doc.length(node) };
                return (node, offset.min(doc.length(node)));
            }
        }
    }
    (node, offset.min(doc.length(node)))
}

impl SavedSelection {
    /// `None` if either boundary lies outside `root`.
    pub fn capture(doc: &Document, root: NodeId, range: &Range) -> Option<Self> {
        Some(Self {
            start_path: path_to(doc, root, range.start.node)?,
            start_offset: range.start.offset,
            end_path: path_to(doc, root, range.end.node)?,
            end_offset: range.end.offset,
        })
    }

    pub fn restore(&self, doc: &Document, root: NodeId) -> Range {
        let (start, start_offset) = resolve(doc, root, &self.start_path, self.start_offset);
        let (end, end_offset) = resolve(doc, root, &self.end_path, self.end_offset);
        Range::new(doc, start, start_offset, end, end_offset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    pub html: String,
    pub selection: Option<SavedSelection>,
}

impl UndoEntry {
    pub fn new(html: impl Into<String>, selection: Option<SavedSelection>) -> Self {
        Self {
            html: html.into(),
            selection,
        }
    }
}

/// Availability of undo and redo, as reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoState {
    pub can_undo: bool,
    pub can_redo: bool,
}

#[derive(Debug)]
pub struct UndoStack {
    entries: Vec<UndoEntry>,

    /// Entry matching the document in the undo state; -1 when empty
    index: isize,

    in_undo_state: bool,

    config: UndoConfig,
}

impl UndoStack {
    pub fn new(config: UndoConfig) -> Self {
        Self {
            entries: Vec::new(),
            index: -1,
            in_undo_state: false,
            config,
        }
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.index = -1;
        self.in_undo_state = false;
    }

    pub fn is_in_undo_state(&self) -> bool {
        self.in_undo_state
    }

    /// Mark the document as changed since the last snapshot. Returns whether
    /// the stack was in the undo state.
    pub fn leave_undo_state(&mut self) -> bool {
        std::mem::replace(&mut self.in_undo_state, false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> isize {
        self.index
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0 || (!self.in_undo_state && !self.entries.is_empty())
    }

    pub fn can_redo(&self) -> bool {
        self.in_undo_state && self.index + 1 < self.entries.len() as isize
    }

    /// Snapshot the document. Outside the undo state a new entry is pushed;
    /// with `replace` in the undo state the current entry is overwritten.
    /// Returns whether anything was stored.
    pub fn record(&mut self, entry: UndoEntry, replace: bool) -> bool {
        if self.in_undo_state && !replace {
            return false;
        }
        let mut next = (self.index + 1) as usize;
        self.entries.truncate(next);
        if self.in_undo_state {
            next -= 1;
            self.entries.truncate(next);
        }

        let threshold = self.config.document_size_threshold;
        let limit = self.config.undo_limit;
        if threshold > -1 && (entry.html.len() as i64) * 2 > threshold && limit > -1 {
            let limit = limit as usize;
            if next > limit {
                self.entries.drain(..next - limit);
                debug!(evicted = next - limit, "Trimmed undo history");
                next = limit;
            }
        }

        self.entries.push(entry);
        self.index = next as isize;
        self.in_undo_state = true;
        true
    }

    /// Step back. `current` is recorded first when the document has changed
    /// since the last snapshot. Returns the entry to restore.
    pub fn undo(&mut self, current: UndoEntry) -> Option<&UndoEntry> {
        if !self.can_undo() {
            return None;
        }
        self.record(current, false);
        self.index -= 1;
        self.in_undo_state = true;
        self.entries.get(self.index as usize)
    }

    pub fn redo(&mut self) -> Option<&UndoEntry> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index as usize)
    }

    pub fn state(&self) -> UndoState {
        UndoState {
            can_undo: self.index > 0,
            can_redo: self.index + 1 < self.entries.len() as isize,
        }
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(UndoConfig::default())
    }
}
