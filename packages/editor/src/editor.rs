//! # Editor
//!
//! [`Editor`] owns the editable tree, the selection, the undo history and
//! the listeners, and exposes the editing API.
//!
//! ## Design
//!
//! - Public operations never return errors; failures go to the
//!   `did_error` hook and the operation returns `&mut Self` for chaining
//! - Change tracking follows the document's change records: they are
//!   flushed around every operation, leaving the undo state and firing
//!   `input` once per operation
//! - Rewrites the engine makes on its own behalf (undo, redo, `set_html`)
//!   discard their records instead
//! - Work a browser would run on the next tick is queued as
//!   [`DeferredTask`]s and drained by [`Editor::run_deferred`]
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut editor = Editor::new(EditorConfig::default());
//! editor.set_html("<div>Hello <b>world</b></div>");
//! editor.move_cursor_to_end().remove_bold().type_text(" ");
//! assert_eq!(editor.get_html(), "<div>Hello <b>world</b> </div>");
//! ```

use std::collections::{HashMap, VecDeque};

use scribe_dom::NodeId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::clean::{clean_tree, strip_semantic};
use crate::config::EditorConfig;
use crate::errors::{EditorError, EditorResult};
use crate::events::{EditorEvent, EventBus, EventType, ListenerId, WillPasteEvent};
use crate::keyboard::{default_key_handlers, KeyAction};
use crate::links::linkify_text;
use crate::range::Range;
use crate::range_ops::{move_boundaries_down, text_contents};
use crate::sanitize::SanitizeOptions;
use crate::tree::Tree;
use crate::undo_stack::{SavedSelection, UndoEntry, UndoStack, UndoState};
use crate::whitespace::{fix_cursor, remove_zws, ZWS};

/// Work queued for the host's next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    /// Tidy empty inlines left by a native deletion
    AfterDelete,
    /// Keep a default block at the end of the root
    EnsureBottomLine,
    /// Link the word ending at `offset`
    Linkify { text_node: NodeId, offset: usize },
}

/// Inline styles in effect at the caret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontInfo {
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<String>,
}

pub struct Editor {
    pub(crate) tree: Tree,
    pub(crate) config: EditorConfig,
    pub(crate) last_selection: Range,
    pub(crate) path: String,
    last_anchor: Option<NodeId>,
    last_focus: Option<NodeId>,
    pub(crate) undo: UndoStack,
    pub(crate) events: EventBus,
    pub(crate) key_handlers: HashMap<String, KeyAction>,
    pub(crate) deferred: VecDeque<DeferredTask>,
    pub(crate) may_have_zws: bool,
    pub(crate) is_shift_down: bool,
}

impl Editor {
    /// Create an editor over an empty root holding one default block.
    pub fn new(config: EditorConfig) -> Self {
        let mut tree = Tree::new(&config.block_tag);
        tree.block_attributes = config.block_attribute_pairs();
        tree.cant_focus_empty_text_nodes = config.platform.cant_focus_empty_text_nodes;
        let root = tree.root();
        tree.observe(root);
        info!(block_tag = %config.block_tag, "Creating editor");

        let mut editor = Self {
            tree,
            last_selection: Range::collapsed_at(root, 0),
            path: String::new(),
            last_anchor: None,
            last_focus: None,
            undo: UndoStack::new(config.undo),
            events: EventBus::default(),
            key_handlers: default_key_handlers(&config),
            deferred: VecDeque::new(),
            may_have_zws: false,
            is_shift_down: false,
            config,
        };
        editor.set_html("");
        editor
    }

    /// Drop listeners, history and queued work, and stop tracking changes.
    pub fn destroy(&mut self) {
        info!("Destroying editor");
        self.events.clear();
        self.undo.reset();
        self.deferred.clear();
        self.tree.disconnect();
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    pub fn on<F>(&mut self, event_type: EventType, listener: F) -> ListenerId
    where
        F: FnMut(&EditorEvent) -> anyhow::Result<()> + 'static,
    {
        self.events.on(event_type, listener)
    }

    pub fn on_will_paste<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&mut WillPasteEvent) -> anyhow::Result<()> + 'static,
    {
        self.events.on_will_paste(listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub(crate) fn fire(&mut self, event: EditorEvent) {
        for err in self.events.emit(&event) {
            self.report(EditorError::Callback(err));
        }
    }

    /// Run `willPaste` listeners. Returns `false` when one vetoed.
    pub(crate) fn fire_will_paste(&mut self, event: &mut WillPasteEvent) -> bool {
        for err in self.events.emit_will_paste(event) {
            self.report(EditorError::Callback(err));
        }
        if event.default_prevented() {
            warn!("Paste vetoed by listener");
        }
        !event.default_prevented()
    }

    pub(crate) fn report(&self, err: EditorError) {
        let hook = self.config.hooks.did_error.clone();
        hook(&err);
    }

    // ------------------------------------------------------------------
    // Operation boundary and change tracking
    // ------------------------------------------------------------------

    /// Run `op` as one public operation: changes made before it are
    /// flushed first, its own changes after, and its error is reported.
    pub(crate) fn run<F>(&mut self, op: F) -> &mut Self
    where
        F: FnOnce(&mut Self) -> EditorResult<()>,
    {
        self.flush_changes();
        if let Err(err) = op(self) {
            self.report(err);
        }
        self.flush_changes();
        self
    }

    pub(crate) fn flush_changes(&mut self) {
        if self.tree.has_records() {
            self.tree.take_records();
            self.doc_was_changed();
        }
    }

    /// Forget changes the engine made on its own behalf.
    pub(crate) fn discard_changes(&mut self) {
        self.tree.take_records();
        self.tree.reset_cache();
        self.may_have_zws = true;
    }

    pub(crate) fn doc_was_changed(&mut self) {
        self.tree.reset_cache();
        self.may_have_zws = true;
        if self.undo.leave_undo_state() {
            self.fire(EditorEvent::UndoStateChange {
                can_undo: true,
                can_redo: false,
            });
        }
        self.fire(EditorEvent::Input);
    }

    /// Let `modify` rewrite the tree without the edit counting as a change.
    pub fn modify_document<F>(&mut self, modify: F) -> &mut Self
    where
        F: FnOnce(&mut Tree),
    {
        self.flush_changes();
        modify(&mut self.tree);
        self.discard_changes();
        self
    }

    // ------------------------------------------------------------------
    // Selection and path
    // ------------------------------------------------------------------

    fn is_live(&self, node: NodeId) -> bool {
        self.tree.is_alive(node) && self.tree.contains(self.tree.root(), node)
    }

    /// The current selection, falling back to the start of the content when
    /// the stored one no longer lies inside the root.
    pub fn get_selection(&mut self) -> Range {
        let root = self.tree.root();
        let stored = self.last_selection;
        let range = if self.is_live(stored.start.node) && self.is_live(stored.end.node) {
            let mut range = Range::new(
                &self.tree,
                stored.start.node,
                stored.start.offset,
                stored.end.node,
                stored.end.offset,
            );
            if self.tree.is_leaf(range.start.node) {
                range.set_start_before(&self.tree, range.start.node);
            }
            if self.tree.is_leaf(range.end.node) {
                range.set_end_before(&self.tree, range.end.node);
            }
            range
        } else {
            let first = self.tree.first_element_child(root).unwrap_or(root);
            Range::collapsed_at(first, 0)
        };
        self.last_selection = range;
        range
    }

    /// Ranges with a boundary outside the root are reported and dropped.
    pub fn set_selection(&mut self, range: Range) -> &mut Self {
        let outside = [range.start.node, range.end.node].into_iter().find(|n| !self.is_live(*n));
        if let Some(node) = outside {
            self.report(EditorError::OutsideRoot(node));
            return self;
        }
        self.last_selection = range;
        self.update_path(&range, false);
        self
    }

    pub(crate) fn store_selection(&mut self, range: Range) {
        self.last_selection = range;
    }

    pub fn get_path(&self) -> &str {
        &self.path
    }

    /// Breadcrumb of the element ancestors of `node` below the root.
    pub(crate) fn path_of(&self, node: NodeId) -> String {
        let root = self.tree.root();
        let names = &self.config.class_names;
        let mut chain: Vec<NodeId> = self
            .tree
            .ancestors(node)
            .take_while(|n| *n != root)
            .filter(|n| self.tree.is_element(*n))
            .collect();
        chain.reverse();

        let mut parts = Vec::with_capacity(chain.len());
        for element in chain {
            let tree = &self.tree;
            let mut part = tree.node_name(element).to_ascii_uppercase();
            if let Some(id) = tree.attr(element, "id").filter(|id| !id.is_empty()) {
                part.push('#');
                part.push_str(id);
            }
            let mut classes = tree.class_list(element);
            classes.sort_unstable();
            if !classes.is_empty() {
                part.push('.');
                part.push_str(&classes.join("."));
            }
            if let Some(dir) = tree.attr(element, "dir").filter(|d| !d.is_empty()) {
                part.push_str(&format!("[dir={dir}]"));
            }
            let style = |property: &str| tree.style_property(element, property).unwrap_or_default();
            if tree.has_class(element, &names.highlight) {
                part.push_str(&format!("[backgroundColor={}]", style("background-color").replace(' ', "")));
            }
            if tree.has_class(element, &names.color) {
                part.push_str(&format!("[color={}]", style("color").replace(' ', "")));
            }
            if tree.has_class(element, &names.font_family) {
                part.push_str(&format!("[fontFamily={}]", style("font-family").replace(' ', "")));
            }
            if tree.has_class(element, &names.font_size) {
                part.push_str(&format!("[fontSize={}]", style("font-size")));
            }
            parts.push(part);
        }
        parts.join(">")
    }

    /// Recompute the path for `range`, firing `pathChange` when it moved,
    /// then `cursor` or `select`.
    pub(crate) fn update_path(&mut self, range: &Range, force: bool) {
        let anchor = range.start.node;
        let focus = range.end.node;
        if force || Some(anchor) != self.last_anchor || Some(focus) != self.last_focus {
            self.last_anchor = Some(anchor);
            self.last_focus = Some(focus);
            let path = if anchor == focus {
                self.path_of(focus)
            } else {
                "(selection)".to_string()
            };
            if path != self.path {
                self.path = path.clone();
                self.fire(EditorEvent::PathChange { path });
            }
        }
        let event = if range.is_collapsed() {
            EditorEvent::Cursor { range: *range }
        } else {
            EditorEvent::Select { range: *range }
        };
        self.fire(event);
    }

    /// Select and report `range` after an edit.
    pub(crate) fn finish(&mut self, range: Range) {
        self.store_selection(range);
        self.update_path(&range, true);
    }

    pub fn move_cursor_to_start(&mut self) -> &mut Self {
        self.move_cursor_to(true)
    }

    pub fn move_cursor_to_end(&mut self) -> &mut Self {
        self.move_cursor_to(false)
    }

    fn move_cursor_to(&mut self, to_start: bool) -> &mut Self {
        let root = self.tree.root();
        let offset = if to_start { 0 } else { self.tree.child_count(root) };
        let mut range = Range::collapsed_at(root, offset);
        move_boundaries_down(&mut self.tree, &mut range);
        self.set_selection(range)
    }

    /// Plain text of `range`, or of the selection.
    pub fn get_selected_text(&mut self, range: Option<Range>) -> String {
        let range = range.unwrap_or_else(|| self.get_selection());
        text_contents(&self.tree, &range)
    }

    /// Colour, highlight, family and size of the inline styles around a
    /// collapsed range or a range inside one text node. Empty otherwise.
    pub fn get_font_info(&mut self, range: Option<Range>) -> FontInfo {
        let range = range.unwrap_or_else(|| self.get_selection());
        let mut info = FontInfo::default();
        let mut element = Some(range.common_ancestor(&self.tree));
        let in_text = element.is_some_and(|e| self.tree.is_text(e));
        if !range.is_collapsed() && !in_text {
            return info;
        }
        if in_text {
            element = element.and_then(|e| self.tree.parent(e));
        }
        let fill = |slot: &mut Option<String>, value: Option<String>| {
            if slot.is_none() {
                *slot = value.filter(|v| !v.is_empty());
            }
        };
        while let Some(node) = element {
            if info.color.is_some()
                && info.background_color.is_some()
                && info.font_family.is_some()
                && info.font_size.is_some()
            {
                break;
            }
            fill(&mut info.color, self.tree.style_property(node, "color"));
            fill(&mut info.background_color, self.tree.style_property(node, "background-color"));
            fill(&mut info.font_family, self.tree.style_property(node, "font-family"));
            fill(&mut info.font_size, self.tree.style_property(node, "font-size"));
            element = self.tree.parent(node);
        }
        info
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Serialized content without focus placeholders.
    pub fn get_html(&self) -> String {
        self.tree.inner_html(self.tree.root()).replace(ZWS, "")
    }

    pub(crate) fn sanitize(&mut self, html: &str) -> EditorResult<NodeId> {
        let sanitizer = self.config.hooks.sanitizer.clone();
        Ok(sanitizer.sanitize(&mut self.tree, html, &SanitizeOptions::default())?)
    }

    /// Replace all content, reset the history to a single baseline and put
    /// the caret at the start.
    #[instrument(skip_all, fields(bytes = html.len()))]
    pub fn set_html(&mut self, html: &str) -> &mut Self {
        self.run(|editor| editor.try_set_html(html))
    }

    fn try_set_html(&mut self, html: &str) -> EditorResult<()> {
        let root = self.tree.root();
        let frag = self.sanitize(html)?;
        strip_semantic(&mut self.tree, frag)?;
        clean_tree(&mut self.tree, frag, &self.config.class_names, false)?;
        for child in self.tree.children(root).to_vec() {
            self.tree.release(child);
        }
        self.tree.append_child(root, frag)?;
        self.tree.release(frag);
        fix_cursor(&mut self.tree, root)?;
        self.discard_changes();

        self.undo.reset();
        let first = self.tree.first_element_child(root).unwrap_or(root);
        let range = Range::collapsed_at(first, 0);
        self.record_undo_state(&range, false);
        self.finish(range);
        info!(blocks = self.tree.child_count(root), "Content replaced");
        Ok(())
    }

    /// Load serialized content as-is, making every block focusable.
    pub(crate) fn set_raw_html(&mut self, html: &str) -> EditorResult<()> {
        let root = self.tree.root();
        self.tree.set_inner_html(root, html)?;
        if self.tree.first_child(root).is_none() {
            let block = self.tree.create_default_block(&[])?;
            self.tree.append_child(root, block)?;
        } else {
            let mut node = root;
            while let Some(block) = self.tree.next_block(node, root) {
                fix_cursor(&mut self.tree, block)?;
                node = block;
            }
        }
        self.discard_changes();
        Ok(())
    }

    /// Strip focus placeholders if any may have been left behind.
    pub(crate) fn remove_zws_if_needed(&mut self) {
        if !self.may_have_zws {
            return;
        }
        let root = self.tree.root();
        remove_zws(&mut self.tree, root, None);
        self.may_have_zws = false;
    }

    pub(crate) fn ensure_bottom_line(&mut self) -> EditorResult<()> {
        let root = self.tree.root();
        let needs_line = match self.tree.last_element_child(root) {
            Some(last) => !self.tree.is_block_tag(last) || !self.tree.is_block(last),
            None => true,
        };
        if needs_line {
            let block = self.tree.create_default_block(&[])?;
            self.tree.append_child(root, block)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    fn snapshot(&self, range: &Range) -> UndoEntry {
        let root = self.tree.root();
        UndoEntry::new(self.tree.inner_html(root), SavedSelection::capture(&self.tree, root, range))
    }

    pub(crate) fn record_undo_state(&mut self, range: &Range, replace: bool) {
        if self.undo.is_in_undo_state() && !replace {
            return;
        }
        let entry = self.snapshot(range);
        if self.undo.record(entry, replace) {
            debug!(index = self.undo.index(), "Recorded undo state");
        }
    }

    /// Snapshot the document at `range` before an edit.
    pub(crate) fn save_undo_state_at(&mut self, range: &Range) {
        let replace = self.undo.is_in_undo_state();
        self.record_undo_state(range, replace);
    }

    /// Record a checkpoint of the current content.
    pub fn save_undo_state(&mut self) -> &mut Self {
        self.run(|editor| {
            let range = editor.get_selection();
            editor.save_undo_state_at(&range);
            Ok(())
        })
    }

    pub fn undo_state(&self) -> UndoState {
        UndoState {
            can_undo: self.undo.can_undo(),
            can_redo: self.undo.can_redo(),
        }
    }

    #[instrument(skip(self))]
    pub fn undo(&mut self) -> &mut Self {
        self.run(|editor| {
            let range = editor.get_selection();
            let current = editor.snapshot(&range);
            let Some(entry) = editor.undo.undo(current).cloned() else {
                return Ok(());
            };
            debug!(index = editor.undo.index(), "Undo");
            editor.restore(&entry)
        })
    }

    #[instrument(skip(self))]
    pub fn redo(&mut self) -> &mut Self {
        self.run(|editor| {
            let Some(entry) = editor.undo.redo().cloned() else {
                return Ok(());
            };
            debug!(index = editor.undo.index(), "Redo");
            editor.restore(&entry)
        })
    }

    fn restore(&mut self, entry: &UndoEntry) -> EditorResult<()> {
        self.set_raw_html(&entry.html)?;
        let root = self.tree.root();
        let range = match &entry.selection {
            Some(saved) => saved.restore(&self.tree, root),
            None => Range::collapsed_at(self.tree.first_element_child(root).unwrap_or(root), 0),
        };
        self.finish(range);
        let state = self.undo.state();
        self.fire(EditorEvent::UndoStateChange {
            can_undo: state.can_undo,
            can_redo: state.can_redo,
        });
        self.fire(EditorEvent::Input);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Deferred work
    // ------------------------------------------------------------------

    pub(crate) fn defer(&mut self, task: DeferredTask) {
        self.deferred.push_back(task);
    }

    pub fn pending_tasks(&self) -> usize {
        self.deferred.len()
    }

    /// Run every queued task. Failures are reported, never returned.
    pub fn run_deferred(&mut self) -> &mut Self {
        while let Some(task) = self.deferred.pop_front() {
            self.run(|editor| editor.run_task(task));
        }
        self
    }

    fn run_task(&mut self, task: DeferredTask) -> EditorResult<()> {
        match task {
            DeferredTask::AfterDelete => self.after_delete(None),
            DeferredTask::EnsureBottomLine => self.ensure_bottom_line(),
            DeferredTask::Linkify { text_node, offset } => {
                if !self.is_live(text_node) || !self.tree.is_text(text_node) {
                    warn!(node = %text_node, "Skipping link detection on a removed node");
                    return Ok(());
                }
                self.linkify_at(text_node, offset)
            }
        }
    }

    /// Turn the word ending at `offset` into a link, keeping a caret in
    /// the same text node on the same character.
    pub(crate) fn linkify_at(&mut self, text_node: NodeId, offset: usize) -> EditorResult<()> {
        let root = self.tree.root();
        let selection = self.get_selection();
        let before = self.snapshot(&selection);
        let attributes = self.config.attributes_for("a");
        let Some(end) = linkify_text(&mut self.tree, text_node, offset, root, &attributes)? else {
            return Ok(());
        };
        // The content before the link becomes an undo step of its own; the
        // link itself is flushed as a change when the operation ends.
        self.undo.leave_undo_state();
        self.undo.record(before, false);

        let mut range = selection;
        if selection.start.node == text_node {
            let offset = selection.start.offset.saturating_sub(end);
            range = Range::collapsed_at(text_node, offset);
        }
        self.set_selection(range);
        Ok(())
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("root", &self.tree.root())
            .field("selection", &self.last_selection)
            .field("path", &self.path)
            .field("undo", &self.undo)
            .field("events", &self.events)
            .field("deferred", &self.deferred)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record(editor: &mut Editor, event_type: EventType) -> Rc<RefCell<Vec<EditorEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        editor.on(event_type, move |e| {
            sink.borrow_mut().push(e.clone());
            Ok(())
        });
        seen
    }

    #[test]
    fn test_new_editor_has_one_block() {
        let editor = Editor::new(EditorConfig::default());
        assert_eq!(editor.get_html(), "<div><br></div>");
        assert!(!editor.undo_state().can_undo);
    }

    #[test]
    fn test_set_html_cleans_and_resets_history() {
        let mut editor = Editor::new(EditorConfig::default());
        editor.set_html("<section><div>  a  <b>b</b></div></section><script>x</script>");
        assert_eq!(editor.get_html(), "<div>a <b>b</b></div>");
        assert_eq!(editor.undo.len(), 1);
        let block = editor.tree().first_child(editor.root()).unwrap();
        assert_eq!(editor.get_selection(), Range::collapsed_at(block, 0));
    }

    #[test]
    fn test_get_html_strips_placeholders() {
        let mut editor = Editor::new(EditorConfig::default());
        editor.modify_document(|tree| {
            let root = tree.root();
            tree.set_inner_html(root, "<div>a\u{200B}b</div>").unwrap();
        });
        assert_eq!(editor.get_html(), "<div>ab</div>");
    }

    #[test]
    fn test_path_breadcrumb() {
        let mut editor = Editor::new(EditorConfig::default());
        editor.set_html(
            "<div id=\"x\" class=\"b a\" dir=\"rtl\"><span class=\"color\" style=\"color: rgb(1, 2, 3);\">t</span></div>",
        );
        let paths = record(&mut editor, EventType::PathChange);
        let span = editor.tree().first_child(editor.tree().first_child(editor.root()).unwrap()).unwrap();
        let text = editor.tree().first_child(span).unwrap();
        editor.set_selection(Range::collapsed_at(text, 1));
        assert_eq!(editor.get_path(), "DIV#x.a.b[dir=rtl]>SPAN.color[color=rgb(1,2,3)]");
        assert_eq!(paths.borrow().len(), 1);

        let block = editor.tree().first_child(editor.root()).unwrap();
        editor.set_selection(Range::new(editor.tree(), block, 0, text, 1));
        assert_eq!(editor.get_path(), "(selection)");
    }

    #[test]
    fn test_stale_selection_falls_back_to_first_block() {
        let mut editor = Editor::new(EditorConfig::default());
        editor.set_html("<div>one</div><div>two</div>");
        let second = editor.tree().child(editor.root(), 1).unwrap();
        editor.set_selection(Range::collapsed_at(second, 0));
        editor.modify_document(|tree| {
            tree.detach(second);
        });
        let first = editor.tree().first_child(editor.root()).unwrap();
        assert_eq!(editor.get_selection(), Range::collapsed_at(first, 0));
    }

    #[test]
    fn test_modify_document_is_not_a_change() {
        let mut editor = Editor::new(EditorConfig::default());
        let inputs = record(&mut editor, EventType::Input);
        editor.modify_document(|tree| {
            let root = tree.root();
            let block = tree.first_child(root).unwrap();
            let text = tree.create_text("quiet");
            tree.append_child(block, text).unwrap();
        });
        editor.save_undo_state();
        assert!(inputs.borrow().is_empty());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut editor = Editor::new(EditorConfig::default());
        editor.set_html("<div>a</div>");
        let states = record(&mut editor, EventType::UndoStateChange);
        editor.move_cursor_to_end().type_text("b");
        assert_eq!(editor.get_html(), "<div>ab</div>");
        assert_eq!(
            states.borrow().last(),
            Some(&EditorEvent::UndoStateChange { can_undo: true, can_redo: false })
        );

        editor.undo();
        assert_eq!(editor.get_html(), "<div>a</div>");
        assert_eq!(editor.undo_state(), UndoState { can_undo: false, can_redo: true });

        editor.redo();
        assert_eq!(editor.get_html(), "<div>ab</div>");
        assert_eq!(
            states.borrow().last(),
            Some(&EditorEvent::UndoStateChange { can_undo: true, can_redo: false })
        );
    }

    #[test]
    fn test_undo_redo_cycles_reuse_nodes() {
        let mut editor = Editor::new(EditorConfig::default());
        editor.set_html("<div>a</div><div>b</div>");
        editor.move_cursor_to_end().type_text("c");
        editor.undo().redo();
        let settled = editor.tree().node_count();
        for _ in 0..200 {
            editor.undo().redo();
        }
        assert_eq!(editor.tree().node_count(), settled);
        assert_eq!(editor.get_html(), "<div>a</div><div>bc</div>");
    }

    #[test]
    fn test_selection_outside_root_is_rejected() {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        let mut config = EditorConfig::default();
        config.hooks.did_error = Rc::new(move |err: &EditorError| sink.borrow_mut().push(err.to_string()));
        let mut editor = Editor::new(config);
        editor.set_html("<div>ab</div>").move_cursor_to_end();
        let before = editor.get_selection();
        let stray = editor.tree.create_text("loose");
        editor.set_selection(Range::collapsed_at(stray, 1));
        assert_eq!(editor.get_selection(), before);
        assert_eq!(
            *errors.borrow(),
            vec![format!("Node {stray} is not inside the editable root")]
        );
    }

    #[test]
    fn test_failing_listener_reaches_error_hook() {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        let mut config = EditorConfig::default();
        config.hooks.did_error = Rc::new(move |err: &EditorError| sink.borrow_mut().push(err.to_string()));
        let mut editor = Editor::new(config);
        editor.on(EventType::Input, |_| Err(anyhow::anyhow!("listener broke")));
        editor.set_html("<div>a</div>").move_cursor_to_end().type_text("b");
        assert_eq!(*errors.borrow(), vec!["listener broke".to_string()]);
    }

    #[test]
    fn test_font_info_at_caret() {
        let mut editor = Editor::new(EditorConfig::default());
        editor.set_html(
            "<div><span class=\"size\" style=\"font-size: 12px;\"><span class=\"color\" style=\"color: red;\">x</span></span></div>",
        );
        editor.move_cursor_to_end();
        let info = editor.get_font_info(None);
        assert_eq!(info.color.as_deref(), Some("red"));
        assert_eq!(info.font_size.as_deref(), Some("12px"));
        assert_eq!(info.font_family, None);
    }

    #[test]
    fn test_deferred_linkify_skips_removed_node() {
        let mut editor = Editor::new(EditorConfig::default());
        editor.set_html("<div>see www.a.com</div>");
        let text = editor.tree().first_child(editor.tree().first_child(editor.root()).unwrap()).unwrap();
        editor.defer(DeferredTask::Linkify { text_node: text, offset: 13 });
        editor.run_deferred();
        assert_eq!(editor.get_html(), "<div>see <a href=\"http://www.a.com\">www.a.com</a></div>");

        editor.defer(DeferredTask::Linkify { text_node: text, offset: 0 });
        editor.modify_document(|tree| {
            tree.detach(text);
        });
        editor.run_deferred();
        assert_eq!(editor.pending_tasks(), 0);
    }
}
