//! # Content Insertion
//!
//! Inserting markup, plain text, elements and typed characters at the
//! selection, and the clipboard handlers built on top of them.
//!
//! ## Design
//!
//! - Markup always goes through the configured sanitizer, then the same
//!   cleaning `set_html` applies, before it touches the document
//! - Pastes fire `willPaste` with the cleaned markup; a listener may rewrite
//!   it (it is cleaned again) or veto the insertion
//! - Plain text becomes markup line by line: the first line joins the block
//!   at the caret, every later line gets a default block of its own
//! - Inside `<pre>` plain text is inserted verbatim

use scribe_dom::NodeId;
use tracing::{debug, instrument};

use crate::clean::{clean_tree, escape_html, remove_empty_inlines, strip_semantic};
use crate::clipboard::{
    drop_needs_snapshot, extract_range_to_clipboard, route_paste, ClipboardData, PasteRoute,
};
use crate::config::EditorConfig;
use crate::editor::{DeferredTask, Editor};
use crate::errors::{EditorError, EditorResult};
use crate::events::{EditorEvent, PastePayload, WillPasteEvent};
use crate::links::{add_detected_links, is_link};
use crate::merge_split::{split, SplitAt};
use crate::node_ops::get_nearest;
use crate::range::{Boundary, Range};
use crate::range_ops::{
    delete_contents, insert_node_in_range, insert_tree_fragment_into_range, move_boundaries_down,
    move_boundary_out_of, start_block,
};
use crate::tree::not_ws;
use crate::whitespace::fix_cursor;

/// Escape `line` and keep its significant spaces: a space followed by
/// another space, or ending the line, becomes `&nbsp;`.
fn escape_line(line: &str) -> String {
    let escaped = escape_html(line);
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' && matches!(chars.peek(), None | Some(' ')) {
            out.push_str("&nbsp;");
        } else {
            out.push(c);
        }
    }
    out
}

/// Markup for plain text. The first line is left bare so it takes on the
/// formatting of the line it lands in.
pub(crate) fn plain_text_to_html(text: &str, config: &EditorConfig) -> String {
    let tag = &config.block_tag;
    let attributes: String = config
        .block_attribute_pairs()
        .iter()
        .map(|(name, value)| format!(" {name}=\"{}\"", escape_html(value)))
        .collect();
    text.split('\n')
        .enumerate()
        .map(|(i, line)| {
            let line = escape_line(line.strip_suffix('\r').unwrap_or(line));
            if i == 0 {
                line
            } else if line.is_empty() {
                format!("<{tag}{attributes}><br></{tag}>")
            } else {
                format!("<{tag}{attributes}>{line}</{tag}>")
            }
        })
        .collect()
}

impl Editor {
    /// Sanitize and clean `html` into a detached fragment ready for
    /// insertion.
    fn prepare_fragment(&mut self, html: &str) -> EditorResult<NodeId> {
        let frag = self.sanitize(html)?;
        strip_semantic(&mut self.tree, frag)?;
        if self.config.add_links {
            let attributes = self.config.attributes_for("a");
            add_detected_links(&mut self.tree, frag, frag, &attributes)?;
        }
        let frag = clean_tree(&mut self.tree, frag, &self.config.class_names, false)?;
        remove_empty_inlines(&mut self.tree, frag);
        self.tree.normalize(frag);
        let mut node = frag;
        while let Some(block) = self.tree.next_block(node, frag) {
            fix_cursor(&mut self.tree, block)?;
            node = block;
        }
        Ok(frag)
    }

    /// Insert `html` at the selection, replacing any selected content.
    /// With `is_paste` the cleaned markup is offered to `willPaste`
    /// listeners first.
    #[instrument(skip(self, html), fields(bytes = html.len()))]
    pub fn insert_html(&mut self, html: &str, is_paste: bool) -> &mut Self {
        self.run(|editor| editor.try_insert_html(html, is_paste))
    }

    fn try_insert_html(&mut self, html: &str, is_paste: bool) -> EditorResult<()> {
        let root = self.tree.root();
        let mut frag = self.prepare_fragment(html)?;
        let mut range = self.get_selection();
        self.save_undo_state_at(&range);

        if is_paste {
            let markup = self.tree.inner_html(frag);
            let mut event = WillPasteEvent::new(PastePayload::Html(markup.clone()));
            if !self.fire_will_paste(&mut event) {
                self.finish(range);
                return Ok(());
            }
            match event.payload {
                PastePayload::Html(rewritten) if rewritten != markup => {
                    frag = self.prepare_fragment(&rewritten)?;
                }
                PastePayload::Text(text) => {
                    let rewritten = plain_text_to_html(&text, &self.config);
                    frag = self.prepare_fragment(&rewritten)?;
                }
                PastePayload::Html(_) => {}
            }
        }

        insert_tree_fragment_into_range(&mut self.tree, &mut range, frag, root)?;
        range.collapse(false);
        move_boundary_out_of(&self.tree, &mut range, "a", root);
        self.ensure_bottom_line()?;
        debug!(is_paste, "Inserted markup");
        self.finish(range);
        Ok(())
    }

    /// Insert `text` at the selection. Line breaks start new blocks, except
    /// inside `<pre>` where the text goes in as-is.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub fn insert_plain_text(&mut self, text: &str, is_paste: bool) -> &mut Self {
        self.run(|editor| editor.try_insert_plain_text(text, is_paste))
    }

    fn try_insert_plain_text(&mut self, text: &str, is_paste: bool) -> EditorResult<()> {
        let root = self.tree.root();
        let mut range = self.get_selection();
        let in_pre = range.is_collapsed() && get_nearest(&self.tree, range.start.node, root, "pre", &[]).is_some();
        if !in_pre {
            let html = plain_text_to_html(text, &self.config);
            return self.try_insert_html(&html, is_paste);
        }

        let mut text = text.to_string();
        if is_paste {
            let mut event = WillPasteEvent::new(PastePayload::Text(text.clone()));
            if !self.fire_will_paste(&mut event) {
                self.finish(range);
                return Ok(());
            }
            match event.payload {
                PastePayload::Text(rewritten) => text = rewritten,
                PastePayload::Html(markup) => return self.try_insert_html(&markup, false),
            }
        }
        self.save_undo_state_at(&range);
        let (node, offset) = if self.tree.is_text(range.start.node) {
            (range.start.node, range.start.offset)
        } else {
            let node = self.tree.create_text("");
            insert_node_in_range(&mut self.tree, &mut range, node)?;
            (node, 0)
        };
        self.tree.insert_text(node, offset, &text)?;
        self.finish(Range::collapsed_at(node, offset + text.chars().count()));
        Ok(())
    }

    /// Insert `element` at the start of the selection. An inline element
    /// goes in at the caret; a block element splits the content there and
    /// is followed by a blank line that takes the caret.
    pub fn insert_element(&mut self, element: NodeId, range: Option<Range>) -> &mut Self {
        self.run(|editor| {
            let range = range.unwrap_or_else(|| editor.get_selection());
            editor.try_insert_element(element, range)
        })
    }

    fn try_insert_element(&mut self, element: NodeId, range: Range) -> EditorResult<()> {
        let root = self.tree.root();
        let mut range = range;
        self.save_undo_state_at(&range);
        range.collapse(true);

        if self.tree.is_inline(element) {
            insert_node_in_range(&mut self.tree, &mut range, element)?;
            range.set_start_after(&self.tree, element);
            range.collapse(true);
            self.finish(range);
            return Ok(());
        }

        let start = start_block(&self.tree, &range, root);
        let mut split_node = start.unwrap_or(root);
        while split_node != root && self.tree.next_sibling(split_node).is_none() {
            split_node = self.tree.parent(split_node).ok_or(EditorError::Detached(split_node))?;
        }
        let mut node_after_split = None;
        if split_node != root {
            let parent = self.tree.parent(split_node).ok_or(EditorError::Detached(split_node))?;
            let next = self.tree.next_sibling(split_node);
            node_after_split = split(&mut self.tree, parent, SplitAt::Node(next), root, root)?;
        }
        if let Some(start) = start.filter(|b| self.tree.is_empty_block(*b)) {
            self.tree.detach(start);
        }
        self.tree.insert_before(root, element, node_after_split)?;
        let blank_line = self.tree.create_default_block(&[])?;
        self.tree.insert_before(root, blank_line, node_after_split)?;
        let mut range = Range::collapsed_at(blank_line, 0);
        move_boundaries_down(&mut self.tree, &mut range);
        debug!(element = %element, "Inserted block element");
        self.finish(range);
        Ok(())
    }

    /// Insert an image at the selection and return it.
    pub fn insert_image(&mut self, src: &str, attributes: &[(String, String)]) -> NodeId {
        let mut pairs = vec![("src".to_string(), src.to_string())];
        pairs.extend(attributes.iter().filter(|(name, _)| name != "src").cloned());
        let image = self.tree.create_element_with("img", &pairs);
        self.insert_element(image, None);
        image
    }

    /// Type `text` at the selection as a keyboard would: selected content
    /// is replaced, and the characters go into the text node at the caret.
    pub fn type_text(&mut self, text: &str) -> &mut Self {
        self.run(|editor| editor.try_type_text(text))
    }

    /// A text node and offset for characters typed at the caret. A caret
    /// between nodes uses an adjacent text node, never one inside a
    /// neighbouring inline, so typing after a link stays outside it.
    fn text_position_at(&mut self, range: &mut Range) -> EditorResult<(NodeId, usize)> {
        let Boundary { node: container, offset } = range.start;
        if self.tree.is_text(container) {
            return Ok((container, offset));
        }
        if let Some(next) = self.tree.child(container, offset).filter(|c| self.tree.is_text(*c)) {
            return Ok((next, 0));
        }
        let previous = offset.checked_sub(1).and_then(|i| self.tree.child(container, i));
        if let Some(previous) = previous.filter(|c| self.tree.is_text(*c)) {
            return Ok((previous, self.tree.length(previous)));
        }
        if self.tree.is_block(container) && self.tree.is_empty_block(container) {
            let placeholder = self.tree.child(container, offset).filter(|c| self.tree.has_tag(*c, "br"));
            if let Some(br) = placeholder {
                self.tree.detach(br);
            }
        }
        let node = self.tree.create_text("");
        insert_node_in_range(&mut self.tree, range, node)?;
        Ok((node, 0))
    }

    pub(crate) fn try_type_text(&mut self, text: &str) -> EditorResult<()> {
        let root = self.tree.root();
        let mut range = self.get_selection();
        if !range.is_collapsed() {
            self.save_undo_state_at(&range);
            delete_contents(&mut self.tree, &mut range, root)?;
        }
        let (node, offset) = self.text_position_at(&mut range)?;
        self.tree.insert_text(node, offset, text)?;
        self.finish(Range::collapsed_at(node, offset + text.chars().count()));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Clipboard
    // ------------------------------------------------------------------

    /// Write the selection to `clipboard`. Returns whether anything was
    /// written.
    pub fn copy(&mut self, clipboard: &mut ClipboardData) -> bool {
        let mut handled = false;
        self.run(|editor| {
            let root = editor.tree.root();
            let mut range = editor.get_selection();
            handled = extract_range_to_clipboard(
                &mut editor.tree,
                Some(clipboard),
                &mut range,
                root,
                false,
                &editor.config.hooks,
                editor.config.platform.is_win,
            )?;
            Ok(())
        });
        handled
    }

    /// Move the selection to `clipboard`. A collapsed selection cuts
    /// nothing.
    #[instrument(skip_all)]
    pub fn cut(&mut self, clipboard: &mut ClipboardData) -> bool {
        let mut handled = false;
        self.run(|editor| {
            let root = editor.tree.root();
            let mut range = editor.get_selection();
            if range.is_collapsed() {
                return Ok(());
            }
            editor.save_undo_state_at(&range);
            handled = extract_range_to_clipboard(
                &mut editor.tree,
                Some(clipboard),
                &mut range,
                root,
                true,
                &editor.config.hooks,
                editor.config.platform.is_win,
            )?;
            editor.defer(DeferredTask::EnsureBottomLine);
            editor.finish(range);
            Ok(())
        });
        handled
    }

    /// Insert the best item of `clipboard`: images go to `pasteImage`
    /// listeners, then markup unless Shift is held, then plain text.
    #[instrument(skip_all, fields(types = ?clipboard.types()))]
    pub fn paste(&mut self, clipboard: &ClipboardData) -> &mut Self {
        match route_paste(clipboard, self.is_shift_down) {
            PasteRoute::Image(items) => {
                self.fire(EditorEvent::PasteImage { items });
                self
            }
            PasteRoute::Html(html) => self.insert_html(&html, true),
            PasteRoute::Text(text) => {
                let range = self.get_selection();
                let selected = self.get_selected_text(Some(range));
                if !range.is_collapsed() && not_ws(&selected) && is_link(&text) {
                    self.make_link(&text, &[])
                } else {
                    self.insert_plain_text(&text, true)
                }
            }
            PasteRoute::Nothing => self,
        }
    }

    /// Snapshot before a drop of markup or plain text lands.
    pub fn drop_data(&mut self, types: &[&str]) -> &mut Self {
        if drop_needs_snapshot(types) {
            self.save_undo_state();
        }
        self
    }
}
