//! # Keyboard
//!
//! Key events from the host, their canonical `"modifiers+key"` names and
//! the dispatch table that maps them to editing operations.
//!
//! ## Design
//!
//! - Lookup is by canonical name: `Alt-`, `Ctrl-`, `Meta-`, `Shift-` in that
//!   order, then the key (`Digit*` codes use the digit)
//! - Shortcuts use `Meta-` on Apple platforms and `Ctrl-` elsewhere
//! - A handler returning [`KeyOutcome::Handled`] consumed the key; with
//!   [`KeyOutcome::Default`] the host carries on and the character arrives
//!   later as `insertText` input
//! - Deleting inside a block removes one character and queues the inline
//!   cleanup as a [`DeferredTask::AfterDelete`]

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use scribe_dom::NodeId;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::EditorConfig;
use crate::editor::{DeferredTask, Editor};
use crate::errors::{EditorError, EditorResult};
use crate::format::Format;
use crate::merge_split::{merge_containers, merge_with_block};
use crate::node_ops::get_nearest;
use crate::range::{compare_points, Boundary, Range};
use crate::range_ops::{
    delete_contents, move_boundaries_down, range_does_end_at_block_boundary,
    range_does_start_at_block_boundary, start_block,
};
use crate::tree::Tree;
use crate::whitespace::{fix_cursor, ZWS};

/// A key press or release as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    pub key: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub alt_key: bool,
    #[serde(default)]
    pub ctrl_key: bool,
    #[serde(default)]
    pub meta_key: bool,
    #[serde(default)]
    pub shift_key: bool,
    /// Part of an IME composition; never dispatched
    #[serde(default)]
    pub is_composing: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt_key = true;
        self
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl_key = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta_key = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift_key = true;
        self
    }

    /// The name the dispatch table is keyed by, e.g. `Ctrl-Shift-7`.
    /// Backspace and Delete carry no modifiers, except Shift-Delete on
    /// Windows.
    pub fn canonical(&self, is_win: bool) -> String {
        let digit = self
            .code
            .strip_prefix("Digit")
            .filter(|d| d.len() == 1 && d.chars().all(|c| c.is_ascii_digit()));
        let key = digit.unwrap_or(&self.key);

        let mut name = String::new();
        if key != "Backspace" && key != "Delete" {
            for (held, prefix) in [
                (self.alt_key, "Alt-"),
                (self.ctrl_key, "Ctrl-"),
                (self.meta_key, "Meta-"),
                (self.shift_key, "Shift-"),
            ] {
                if held {
                    name.push_str(prefix);
                }
            }
        }
        if is_win && self.shift_key && key == "Delete" {
            name.push_str("Shift-");
        }
        name.push_str(key);
        name
    }
}

/// Whether the host should go on with its own handling of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyOutcome {
    /// The editor acted on the key; the host should drop it
    Handled,
    /// The host's default action applies
    Default,
}

pub type KeyHandler = Rc<dyn Fn(&mut Editor, &KeyEvent, Range) -> KeyOutcome>;

/// What a key does.
#[derive(Clone)]
pub enum KeyAction {
    Backspace,
    Delete,
    /// Split the block; Shift inserts a line break instead
    Enter,
    Tab,
    ShiftTab,
    Space,
    ArrowLeft,
    ArrowRight,
    ToggleFormat {
        tag: &'static str,
        exclusive: Option<&'static str>,
    },
    /// Make a list of this tag, or remove it when already in one
    ToggleList(&'static str),
    /// Outdent a list, or unquote outside lists
    DecreaseLevel,
    /// Indent a list, or quote outside lists
    IncreaseLevel,
    ToggleCode,
    Undo,
    Redo,
    MoveCursorToStart,
    MoveCursorToEnd,
    Custom(KeyHandler),
}

impl fmt::Debug for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToggleFormat { tag, exclusive } => f
                .debug_struct("ToggleFormat")
                .field("tag", tag)
                .field("exclusive", exclusive)
                .finish(),
            Self::ToggleList(tag) => f.debug_tuple("ToggleList").field(tag).finish(),
            Self::Custom(_) => f.write_str("Custom"),
            Self::Backspace => f.write_str("Backspace"),
            Self::Delete => f.write_str("Delete"),
            Self::Enter => f.write_str("Enter"),
            Self::Tab => f.write_str("Tab"),
            Self::ShiftTab => f.write_str("ShiftTab"),
            Self::Space => f.write_str("Space"),
            Self::ArrowLeft => f.write_str("ArrowLeft"),
            Self::ArrowRight => f.write_str("ArrowRight"),
            Self::DecreaseLevel => f.write_str("DecreaseLevel"),
            Self::IncreaseLevel => f.write_str("IncreaseLevel"),
            Self::ToggleCode => f.write_str("ToggleCode"),
            Self::Undo => f.write_str("Undo"),
            Self::Redo => f.write_str("Redo"),
            Self::MoveCursorToStart => f.write_str("MoveCursorToStart"),
            Self::MoveCursorToEnd => f.write_str("MoveCursorToEnd"),
        }
    }
}

/// The built-in dispatch table for `config`'s platform.
pub fn default_key_handlers(config: &EditorConfig) -> HashMap<String, KeyAction> {
    let toggle = |tag, exclusive| KeyAction::ToggleFormat { tag, exclusive };
    let mut handlers: HashMap<String, KeyAction> = [
        ("Backspace", KeyAction::Backspace),
        ("Delete", KeyAction::Delete),
        ("Enter", KeyAction::Enter),
        ("Shift-Enter", KeyAction::Enter),
        ("Tab", KeyAction::Tab),
        ("Shift-Tab", KeyAction::ShiftTab),
        (" ", KeyAction::Space),
        ("ArrowLeft", KeyAction::ArrowLeft),
        ("ArrowRight", KeyAction::ArrowRight),
    ]
    .into_iter()
    .map(|(key, action)| (key.to_string(), action))
    .collect();

    let ctrl = config.ctrl_key();
    let shortcuts = [
        ("b", toggle("b", None)),
        ("i", toggle("i", None)),
        ("u", toggle("u", None)),
        ("Shift-7", toggle("s", None)),
        ("Shift-5", toggle("sub", Some("sup"))),
        ("Shift-6", toggle("sup", Some("sub"))),
        ("Shift-8", KeyAction::ToggleList("ul")),
        ("Shift-9", KeyAction::ToggleList("ol")),
        ("[", KeyAction::DecreaseLevel),
        ("]", KeyAction::IncreaseLevel),
        ("d", KeyAction::ToggleCode),
        ("z", KeyAction::Undo),
        ("y", KeyAction::Redo),
        // Shift may or may not upper-case the key depending on platform
        ("Shift-z", KeyAction::Redo),
        ("Shift-Z", KeyAction::Redo),
    ];
    handlers.extend(shortcuts.into_iter().map(|(key, action)| (format!("{ctrl}{key}"), action)));

    if !config.platform.is_mac {
        handlers.insert("PageUp".to_string(), KeyAction::MoveCursorToStart);
        handlers.insert("PageDown".to_string(), KeyAction::MoveCursorToEnd);
    }
    handlers
}

fn path_has(path: &str, name: &str) -> bool {
    path.split('>').any(|part| part.starts_with(name))
}

fn in_list(tree: &Tree, node: NodeId, root: NodeId) -> bool {
    get_nearest(tree, node, root, "ul", &[]).is_some() || get_nearest(tree, node, root, "ol", &[]).is_some()
}

fn is_uneditable(tree: &Tree, node: NodeId) -> bool {
    tree.attr(node, "contenteditable").is_some_and(|v| v.eq_ignore_ascii_case("false"))
}

/// Whether `node` sits inside a `contenteditable="false"` island below
/// `root`.
fn inside_uneditable(tree: &Tree, node: NodeId, root: NodeId) -> bool {
    tree.ancestors(node)
        .take_while(|n| *n != root)
        .any(|n| is_uneditable(tree, n))
}

/// Remove the outermost non-editable ancestor of `node` below `root`.
fn detach_uneditable(tree: &mut Tree, node: NodeId, root: NodeId) {
    let mut node = node;
    while let Some(parent) = tree.parent(node).filter(|p| *p != root && is_uneditable(tree, *p)) {
        node = parent;
    }
    tree.detach(node);
}

/// Start and end points of `node` for document-order comparisons.
fn node_bounds(tree: &Tree, node: NodeId) -> Option<(Boundary, Boundary)> {
    if tree.is_text(node) {
        return Some((Boundary::new(node, 0), Boundary::new(node, tree.length(node))));
    }
    let parent = tree.parent(node)?;
    let index = tree.index_of(node)?;
    Some((Boundary::new(parent, index), Boundary::new(parent, index + 1)))
}

enum Deleted {
    Char(Range),
    Leaf(Range),
    Nothing,
}

/// Remove the character or leaf element next to `caret` inside `block`.
fn delete_adjacent(tree: &mut Tree, caret: Boundary, block: NodeId, backward: bool) -> EditorResult<Deleted> {
    if tree.is_text(caret.node) {
        let length = tree.length(caret.node);
        if backward && caret.offset > 0 {
            tree.delete_text(caret.node, caret.offset - 1, 1)?;
            return Ok(Deleted::Char(Range::collapsed_at(caret.node, caret.offset - 1)));
        }
        if !backward && caret.offset < length {
            tree.delete_text(caret.node, caret.offset, 1)?;
            return Ok(Deleted::Char(Range::collapsed_at(caret.node, caret.offset)));
        }
    }

    let candidates: Vec<NodeId> = tree
        .descendants(block)
        .into_iter()
        .filter(|n| (tree.is_text(*n) && tree.text(*n).is_some_and(|t| t.chars().any(|c| c != ZWS))) || tree.is_leaf(*n))
        .collect();
    let target = if backward {
        candidates.iter().rev().copied().find(|n| {
            node_bounds(tree, *n).is_some_and(|(_, end)| compare_points(tree, end, caret) != Ordering::Greater)
        })
    } else {
        candidates.iter().copied().find(|n| {
            node_bounds(tree, *n).is_some_and(|(start, _)| compare_points(tree, start, caret) != Ordering::Less)
        })
    };
    let Some(target) = target else {
        return Ok(Deleted::Nothing);
    };

    if tree.is_text(target) {
        let offset = if backward { tree.length(target) - 1 } else { 0 };
        tree.delete_text(target, offset, 1)?;
        return Ok(Deleted::Char(Range::collapsed_at(target, offset)));
    }
    let (start, _) = node_bounds(tree, target).ok_or(EditorError::Detached(target))?;
    tree.detach(target);
    Ok(Deleted::Leaf(Range::collapsed_at(start.node, start.offset)))
}

impl Editor {
    /// Bind `key` (a canonical name such as `Ctrl-b`) to `action`, or
    /// unbind it with `None`.
    pub fn set_key_handler(&mut self, key: &str, action: Option<KeyAction>) -> &mut Self {
        match action {
            Some(action) => {
                self.key_handlers.insert(key.to_string(), action);
            }
            None => {
                self.key_handlers.remove(key);
            }
        }
        self
    }

    pub fn key_up(&mut self, event: &KeyEvent) {
        self.is_shift_down = event.shift_key;
    }

    /// Dispatch a key press. Unbound printable keys over a selection delete
    /// it first, so the character replaces the selected content.
    #[instrument(skip(self), fields(key = %event.key))]
    pub fn key_down(&mut self, event: &KeyEvent) -> KeyOutcome {
        self.is_shift_down = event.shift_key;
        if event.is_composing {
            return KeyOutcome::Default;
        }
        let key = event.canonical(self.config.platform.is_win);
        let range = self.get_selection();
        let Some(action) = self.key_handlers.get(&key).cloned() else {
            let printable = event.key.chars().count() == 1 && !event.ctrl_key && !event.meta_key;
            if printable && !range.is_collapsed() {
                self.run(|editor| {
                    let root = editor.tree.root();
                    let mut range = range;
                    editor.save_undo_state_at(&range);
                    delete_contents(&mut editor.tree, &mut range, root)?;
                    editor.finish(range);
                    Ok(())
                });
            }
            return KeyOutcome::Default;
        };
        debug!(key = %key, action = ?action, "Dispatching key");
        self.dispatch_key(action, event, range)
    }

    fn dispatch_key(&mut self, action: KeyAction, event: &KeyEvent, range: Range) -> KeyOutcome {
        match action {
            KeyAction::Backspace => self.run_key(|editor| editor.on_backspace(range)),
            KeyAction::Delete => self.run_key(|editor| editor.on_delete(range)),
            KeyAction::Enter => self.run_key(|editor| {
                editor.try_split_block(event.shift_key, range)?;
                Ok(KeyOutcome::Handled)
            }),
            KeyAction::Tab => self.run_key(|editor| editor.on_tab(range)),
            KeyAction::ShiftTab => self.run_key(|editor| editor.on_shift_tab(range)),
            KeyAction::Space => self.run_key(|editor| editor.on_space(range)),
            KeyAction::ArrowLeft => {
                self.remove_zws_if_needed();
                KeyOutcome::Default
            }
            KeyAction::ArrowRight => self.run_key(|editor| editor.on_arrow_right(range)),
            KeyAction::ToggleFormat { tag, exclusive } => {
                self.toggle_format(tag, exclusive);
                KeyOutcome::Handled
            }
            KeyAction::ToggleList(tag) => {
                if path_has(self.get_path(), &tag.to_ascii_uppercase()) {
                    self.remove_list();
                } else if tag == "ol" {
                    self.make_ordered_list();
                } else {
                    self.make_unordered_list();
                }
                KeyOutcome::Handled
            }
            KeyAction::DecreaseLevel | KeyAction::IncreaseLevel => {
                let path = self.get_path();
                let quoting = path_has(path, "BLOCKQUOTE") || !(path_has(path, "UL") || path_has(path, "OL"));
                match (quoting, matches!(action, KeyAction::IncreaseLevel)) {
                    (true, true) => self.increase_quote_level(None),
                    (true, false) => self.decrease_quote_level(None),
                    (false, true) => self.increase_list_level(None),
                    (false, false) => self.decrease_list_level(None),
                };
                KeyOutcome::Handled
            }
            KeyAction::ToggleCode => {
                self.toggle_code();
                KeyOutcome::Handled
            }
            KeyAction::Undo => {
                self.undo();
                KeyOutcome::Handled
            }
            KeyAction::Redo => {
                self.redo();
                KeyOutcome::Handled
            }
            KeyAction::MoveCursorToStart => {
                self.move_cursor_to_start();
                KeyOutcome::Default
            }
            KeyAction::MoveCursorToEnd => {
                self.move_cursor_to_end();
                KeyOutcome::Default
            }
            KeyAction::Custom(handler) => handler(self, event, range),
        }
    }

    /// Run a key handler as one operation. A failed handler still counts
    /// as having consumed the key.
    fn run_key<F>(&mut self, handler: F) -> KeyOutcome
    where
        F: FnOnce(&mut Self) -> EditorResult<KeyOutcome>,
    {
        let mut outcome = KeyOutcome::Handled;
        self.run(|editor| {
            outcome = handler(editor)?;
            Ok(())
        });
        outcome
    }

    fn on_backspace(&mut self, range: Range) -> EditorResult<KeyOutcome> {
        let root = self.tree.root();
        let mut range = range;
        self.remove_zws_if_needed();
        self.save_undo_state_at(&range);
        if !range.is_collapsed() {
            delete_contents(&mut self.tree, &mut range, root)?;
            self.after_delete(Some(range))?;
            return Ok(KeyOutcome::Handled);
        }

        if range_does_start_at_block_boundary(&self.tree, &range, root) {
            let Some(current) = start_block(&self.tree, &range, root) else {
                return Ok(KeyOutcome::Handled);
            };
            if let Some(previous) = self.tree.previous_block(current, root) {
                if inside_uneditable(&self.tree, previous, root) || is_uneditable(&self.tree, previous) {
                    detach_uneditable(&mut self.tree, previous, root);
                    return Ok(KeyOutcome::Handled);
                }
                merge_with_block(&mut self.tree, previous, current, &mut range, root)?;
                self.merge_following_container(previous)?;
                self.finish(range);
            } else if in_list(&self.tree, current, root) {
                self.decrease_list_level_at(range)?;
            } else if get_nearest(&self.tree, current, root, "blockquote", &[]).is_some() {
                self.remove_quote_at(range)?;
            } else {
                self.finish(range);
            }
            return Ok(KeyOutcome::Handled);
        }

        move_boundaries_down(&mut self.tree, &mut range);
        let (text, offset) = (range.start.node, range.start.offset);
        let link = self.tree.parent(text).filter(|a| self.tree.has_tag(*a, "a"));
        if let (Some(link), Some(data)) = (link, self.tree.text(text)) {
            let in_href = self.tree.attr(link, "href").is_some_and(|href| href.contains(data));
            if offset > 0 && in_href {
                // Editing a bare URL breaks it, so the link goes too.
                self.tree.delete_text(text, offset - 1, 1)?;
                let range = Range::collapsed_at(text, offset - 1);
                self.apply_format(range, None, Some(&Format::new("a")), true)?;
                return Ok(KeyOutcome::Handled);
            }
        }
        self.delete_in_block(range, true)
    }

    fn on_delete(&mut self, range: Range) -> EditorResult<KeyOutcome> {
        let root = self.tree.root();
        let mut range = range;
        self.remove_zws_if_needed();
        self.save_undo_state_at(&range);
        if !range.is_collapsed() {
            delete_contents(&mut self.tree, &mut range, root)?;
            self.after_delete(Some(range))?;
            return Ok(KeyOutcome::Handled);
        }

        if range_does_end_at_block_boundary(&self.tree, &range, root) {
            let Some(current) = start_block(&self.tree, &range, root) else {
                return Ok(KeyOutcome::Handled);
            };
            if let Some(next) = self.tree.next_block(current, root) {
                if inside_uneditable(&self.tree, next, root) || is_uneditable(&self.tree, next) {
                    detach_uneditable(&mut self.tree, next, root);
                    return Ok(KeyOutcome::Handled);
                }
                merge_with_block(&mut self.tree, current, next, &mut range, root)?;
                self.merge_following_container(current)?;
                self.finish(range);
            }
            return Ok(KeyOutcome::Handled);
        }

        move_boundaries_down(&mut self.tree, &mut range);
        self.delete_in_block(range, false)
    }

    /// After two blocks merged, merge the container following the merged
    /// block's outermost last-child ancestor into its predecessor.
    fn merge_following_container(&mut self, block: NodeId) -> EditorResult<()> {
        let root = self.tree.root();
        let Some(mut current) = self.tree.parent(block) else {
            return Ok(());
        };
        while current != root && self.tree.next_sibling(current).is_none() {
            current = self.tree.parent(current).ok_or(EditorError::Detached(current))?;
        }
        if current != root {
            if let Some(next) = self.tree.next_sibling(current) {
                merge_containers(&mut self.tree, next, root)?;
            }
        }
        Ok(())
    }

    /// Remove one character (or image, or line break) beside a caret that
    /// is not at a block boundary.
    fn delete_in_block(&mut self, range: Range, backward: bool) -> EditorResult<KeyOutcome> {
        let root = self.tree.root();
        let block = start_block(&self.tree, &range, root).unwrap_or(root);
        match delete_adjacent(&mut self.tree, range.start, block, backward)? {
            Deleted::Char(range) => {
                self.finish(range);
                self.defer(DeferredTask::AfterDelete);
            }
            Deleted::Leaf(mut range) => {
                move_boundaries_down(&mut self.tree, &mut range);
                self.after_delete(Some(range))?;
            }
            Deleted::Nothing => self.finish(range),
        }
        Ok(KeyOutcome::Handled)
    }

    /// Drop the empty inlines around the caret left by a deletion and make
    /// the block focusable again.
    pub(crate) fn after_delete(&mut self, range: Option<Range>) -> EditorResult<()> {
        let root = self.tree.root();
        let mut range = range.unwrap_or_else(|| self.get_selection());
        let mut node = range.start.node;
        if self.tree.is_text(node) {
            node = self.tree.parent(node).ok_or(EditorError::Detached(node))?;
        }
        let mut parent = node;
        let is_blank = |tree: &Tree, n: NodeId| {
            !tree.is_leaf(n)
                && tree.elements_by_tag(n, "img").is_empty()
                && tree.text_content(n).chars().all(|c| c == ZWS)
        };
        while parent != root && self.tree.is_inline(parent) && is_blank(&self.tree, parent) {
            node = parent;
            parent = self.tree.parent(node).ok_or(EditorError::Detached(node))?;
        }
        if node != parent {
            let index = self.tree.index_of(node).unwrap_or(0);
            range = Range::collapsed_at(parent, index);
            self.tree.detach(node);
            let block = if self.tree.is_block(parent) {
                parent
            } else {
                self.tree.previous_block(parent, root).unwrap_or(root)
            };
            fix_cursor(&mut self.tree, block)?;
            move_boundaries_down(&mut self.tree, &mut range);
        }
        if node == root {
            if let Some(br) = self.tree.first_child(root).filter(|c| self.tree.has_tag(*c, "br")) {
                self.tree.detach(br);
            }
        }
        self.finish(range);
        Ok(())
    }

    fn on_tab(&mut self, range: Range) -> EditorResult<KeyOutcome> {
        let root = self.tree.root();
        self.remove_zws_if_needed();
        if !range.is_collapsed() || !range_does_start_at_block_boundary(&self.tree, &range, root) {
            return Ok(KeyOutcome::Default);
        }
        let Some(block) = start_block(&self.tree, &range, root) else {
            return Ok(KeyOutcome::Default);
        };
        if in_list(&self.tree, block, root) {
            self.increase_list_level_at(range)?;
            return Ok(KeyOutcome::Handled);
        }
        Ok(KeyOutcome::Default)
    }

    fn on_shift_tab(&mut self, range: Range) -> EditorResult<KeyOutcome> {
        let root = self.tree.root();
        self.remove_zws_if_needed();
        if range.is_collapsed()
            && range_does_start_at_block_boundary(&self.tree, &range, root)
            && in_list(&self.tree, range.start.node, root)
        {
            self.decrease_list_level_at(range)?;
            return Ok(KeyOutcome::Handled);
        }
        Ok(KeyOutcome::Default)
    }

    /// Space: `* ` or `1. ` alone in a block starts a list; a space at the
    /// end of a link goes after it; the word before the caret may become a
    /// link.
    fn on_space(&mut self, range: Range) -> EditorResult<KeyOutcome> {
        let root = self.tree.root();
        let mut range = range;
        self.record_undo_state(&range, false);
        if !range.is_collapsed() {
            delete_contents(&mut self.tree, &mut range, root)?;
            self.finish(range);
        } else if range_does_end_at_block_boundary(&self.tree, &range, root) {
            let block = start_block(&self.tree, &range, root).filter(|b| !self.tree.has_tag(*b, "pre"));
            if let Some(block) = block {
                let text = self.tree.text_content(block).trim_end().replace(ZWS, "");
                if text == "*" || text == "1." {
                    self.start_list_from_marker(&text)?;
                    return Ok(KeyOutcome::Handled);
                }
            }
        }

        let mut node = range.end.node;
        if range.end.offset == self.tree.length(node) {
            loop {
                if self.tree.has_tag(node, "a") {
                    range.set_start_after(&self.tree, node);
                    break;
                }
                match self.tree.parent(node) {
                    Some(parent) if self.tree.next_sibling(node).is_none() && parent != root => node = parent,
                    _ => break,
                }
            }
        }
        if self.config.add_links {
            let mut link_range = range;
            move_boundaries_down(&mut self.tree, &mut link_range);
            if self.tree.is_text(link_range.start.node) {
                self.defer(DeferredTask::Linkify {
                    text_node: link_range.start.node,
                    offset: link_range.start.offset,
                });
            }
        }
        self.set_selection(range);
        Ok(KeyOutcome::Default)
    }

    /// Turn a block holding only a list marker into a list item. Undo
    /// brings back the marker with the typed space.
    fn start_list_from_marker(&mut self, marker: &str) -> EditorResult<()> {
        self.try_type_text(" ")?;
        self.flush_changes();
        let range = self.get_selection();
        self.save_undo_state_at(&range);

        // make_list_at overwrites the snapshot; the marker must still be present.
        let list_tag = if marker == "*" { "ul" } else { "ol" };
        self.make_list_at(range, list_tag)?;

        let root = self.tree.root();
        let range = self.get_selection();
        let item = start_block(&self.tree, &range, root)
            .ok_or(EditorError::invariant("a new list has no item at the caret"))?;
        let texts: Vec<NodeId> = self
            .tree
            .descendants(item)
            .into_iter()
            .filter(|n| self.tree.is_text(*n))
            .collect();
        for text in texts {
            self.tree.detach(text);
        }
        fix_cursor(&mut self.tree, item)?;
        let mut range = Range::collapsed_at(item, 0);
        move_boundaries_down(&mut self.tree, &mut range);
        debug!(list_tag, "List started from marker");
        self.finish(range);
        Ok(())
    }

    /// ArrowRight at the end of inline code steps out of it.
    fn on_arrow_right(&mut self, range: Range) -> EditorResult<KeyOutcome> {
        let root = self.tree.root();
        let mut range = range;
        self.remove_zws_if_needed();
        if !range_does_end_at_block_boundary(&self.tree, &range, root) {
            return Ok(KeyOutcome::Default);
        }
        move_boundaries_down(&mut self.tree, &mut range);
        let mut node = range.end.node;
        loop {
            if self.tree.has_tag(node, "code") {
                let parent = self.tree.parent(node).ok_or(EditorError::Detached(node))?;
                let next = self.tree.next_sibling(node);
                let text = match next.filter(|n| self.tree.is_text(*n)) {
                    Some(text) => text,
                    None => {
                        let text = self.tree.create_text("\u{a0}");
                        self.tree.insert_before(parent, text, next)?;
                        text
                    }
                };
                let offset = self.tree.length(text).min(1);
                self.finish(Range::collapsed_at(text, offset));
                return Ok(KeyOutcome::Handled);
            }
            match self.tree.parent(node) {
                Some(parent) if self.tree.next_sibling(node).is_none() && parent != root => node = parent,
                _ => break,
            }
        }
        Ok(KeyOutcome::Default)
    }
}
