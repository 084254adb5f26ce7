//! # Block Operations
//!
//! Commands that restructure whole blocks: lists, quotes, alignment,
//! direction and splitting a block on Enter.
//!
//! ## Design
//!
//! - [`Editor::modify_blocks`] lifts the blocks touched by the range out of
//!   the root, hands them to a transform as a fragment and puts the result
//!   back where they were, merging alike containers on either side
//! - List level changes move list items in place rather than going through
//!   a fragment, so the items keep their identity
//! - Boundaries are pushed down into text before nodes move, so the range
//!   survives the rebalancing without live-range updates
//! - Splitting a block picks the tag of the new half from a continuation
//!   table: `dt` → `dd`, `dd` → `dt`, `li` → `li`, anything else the
//!   configured default block

use scribe_dom::NodeId;
use tracing::{debug, instrument};

use crate::clean::remove_empty_inlines;
use crate::editor::{DeferredTask, Editor};
use crate::errors::{EditorError, EditorResult};
use crate::merge_split::{fix_container, merge_containers, split, SplitAt};
use crate::node_ops::{create_element, empty, get_nearest, has_tag_attributes};
use crate::range::{Boundary, Range};
use crate::range_ops::{
    delete_contents, expand_to_block_boundaries, extract_contents, insert_node_in_range, move_boundaries_down,
    move_boundaries_up, move_boundary_out_of, range_does_end_at_block_boundary, range_does_start_at_block_boundary,
    start_block,
};
use crate::tree::Tree;
use crate::whitespace::{fix_cursor, remove_zws, ZWS};

fn is_list(tree: &Tree, node: NodeId) -> bool {
    tree.has_tag(node, "ol") || tree.has_tag(node, "ul")
}

/// Re-create `range` with both offsets clamped to their containers.
pub(crate) fn clamp(tree: &Tree, range: &Range) -> Range {
    let start = range.start.offset.min(tree.length(range.start.node));
    let mut clamped = Range::collapsed_at(range.start.node, start);
    clamped.set_end(tree, range.end.node, range.end.offset);
    clamped
}

/// Point every boundary on `from` at `to` instead.
fn retarget(range: &mut Range, from: NodeId, to: NodeId) {
    for point in [&mut range.start, &mut range.end] {
        if point.node == from {
            *point = Boundary::new(to, point.offset);
        }
    }
}

/// Turn each block of `frag` into an item of a `list_tag` list, merging
/// into a preceding list of the same kind and retagging lists of the
/// other kind.
pub(crate) fn make_list(
    tree: &mut Tree,
    frag: NodeId,
    root: NodeId,
    list_tag: &str,
    list_attributes: &[(String, String)],
    item_attributes: &[(String, String)],
) -> EditorResult<NodeId> {
    let mut walker = tree.block_walker(frag, root);
    while let Some(mut node) = walker.next_node(tree) {
        if let Some(item) = tree.parent(node).filter(|p| tree.has_tag(*p, "li")) {
            node = item;
            walker.current = tree.last_child(item).unwrap_or(item);
        }
        if !tree.has_tag(node, "li") {
            let item = tree.create_element_with("li", item_attributes);
            if let Some(dir) = tree.attr(node, "dir").filter(|d| !d.is_empty()).map(str::to_string) {
                tree.set_attr(item, "dir", &dir);
            }
            match tree.previous_sibling(node).filter(|p| tree.has_tag(*p, list_tag)) {
                Some(list) => {
                    tree.append_child(list, item)?;
                    tree.detach(node);
                }
                None => {
                    let list = create_element(tree, list_tag, list_attributes, &[item]);
                    tree.replace_with(node, list)?;
                }
            }
            let contents = empty(tree, node);
            tree.append_child(item, contents)?;
            walker.current = item;
        } else if let Some(list) = tree.parent(node) {
            if is_list(tree, list) && !tree.has_tag(list, list_tag) {
                let contents = empty(tree, list);
                let replacement = create_element(tree, list_tag, list_attributes, &[contents]);
                tree.replace_with(list, replacement)?;
            }
        }
    }
    Ok(frag)
}

/// Unwrap every list in `frag`; list items become default blocks.
pub(crate) fn remove_list(tree: &mut Tree, frag: NodeId, root: NodeId) -> EditorResult<NodeId> {
    let lists: Vec<NodeId> = tree
        .descendants(frag)
        .into_iter()
        .filter(|n| is_list(tree, *n))
        .collect();
    let items = tree.elements_by_tag(frag, "li");
    for list in lists {
        let contents = empty(tree, list);
        fix_container(tree, contents, root)?;
        tree.replace_with(list, contents)?;
    }
    for item in items {
        if tree.is_block(item) {
            let contents = empty(tree, item);
            let block = tree.create_default_block(&[contents])?;
            tree.replace_with(item, block)?;
        } else {
            fix_container(tree, item, root)?;
            let contents = empty(tree, item);
            tree.replace_with(item, contents)?;
        }
    }
    Ok(frag)
}

/// Unwrap the outermost quotes in `frag`.
fn unquote(tree: &mut Tree, frag: NodeId) -> EditorResult<NodeId> {
    let outermost: Vec<NodeId> = tree
        .elements_by_tag(frag, "blockquote")
        .into_iter()
        .filter(|q| {
            tree.parent(*q)
                .map_or(true, |p| get_nearest(tree, p, frag, "blockquote", &[]).is_none())
        })
        .collect();
    for quote in outermost {
        let contents = empty(tree, quote);
        tree.replace_with(quote, contents)?;
    }
    Ok(frag)
}

/// The list around the range, with the items holding each boundary.
fn list_selection(tree: &Tree, range: &Range, root: NodeId) -> Option<(NodeId, Option<NodeId>, Option<NodeId>)> {
    let mut list = range.common_ancestor(tree);
    while list != root && !is_list(tree, list) {
        list = tree.parent(list)?;
    }
    if list == root {
        return None;
    }
    let item_of = |point: Boundary| {
        let mut node = if point.node == list {
            tree.child(list, point.offset)
        } else {
            Some(point.node)
        };
        while let Some(n) = node {
            if tree.parent(n) == Some(list) {
                break;
            }
            node = tree.parent(n);
        }
        node
    };
    Some((list, item_of(range.start), item_of(range.end)))
}

impl Editor {
    /// Replace the blocks touched by `range` with what `modify` makes of
    /// them. `modify` receives the tree, the extracted fragment and the root.
    pub(crate) fn modify_blocks_at<F>(&mut self, range: Range, modify: F) -> EditorResult<()>
    where
        F: FnOnce(&mut Tree, NodeId, NodeId) -> EditorResult<NodeId>,
    {
        let mut range = range;
        self.save_undo_state_at(&range);
        let root = self.tree.root();
        let tree = &mut self.tree;
        expand_to_block_boundaries(tree, &mut range, root);
        move_boundaries_up(tree, &mut range, Some(root), Some(root), root);

        let before: Vec<NodeId> = tree.children(root).to_vec();
        let frag = extract_contents(tree, &mut range, Some(root), root)?;
        let placeholder = tree
            .first_child(root)
            .filter(|b| tree.child_count(root) == 1 && !before.contains(b) && tree.is_empty_block(*b));
        if let Some(placeholder) = placeholder.filter(|_| range.start.node == root) {
            tree.detach(placeholder);
            range = Range::collapsed_at(root, 0);
        } else if !range.is_collapsed() {
            let mut node = range.end.node;
            if node == root {
                range.collapse(false);
            } else {
                while let Some(parent) = tree.parent(node).filter(|p| *p != root) {
                    node = parent;
                }
                range.set_start_before(tree, node);
                range.collapse(true);
            }
        }

        let replacement = modify(tree, frag, root)?;
        insert_node_in_range(tree, &mut range, replacement)?;
        fix_cursor(tree, root)?;

        let after = tree.child(range.end.node, range.end.offset);
        let first = tree.child(range.start.node, range.start.offset);
        move_boundaries_down(tree, &mut range);
        if let Some(after) = after {
            merge_containers(tree, after, root)?;
        }
        if let Some(first) = first.filter(|f| tree.parent(*f).is_some()) {
            merge_containers(tree, first, root)?;
        }
        let range = clamp(tree, &range);
        debug!(blocks = tree.child_count(root), "Modified blocks");
        self.finish(range);
        Ok(())
    }

    /// Run `modify` over the blocks of the range (or selection), taken out
    /// of the document as a fragment, and insert what it returns.
    pub fn modify_blocks<F>(&mut self, modify: F, range: Option<Range>) -> &mut Self
    where
        F: FnOnce(&mut Tree, NodeId) -> NodeId,
    {
        self.run(|editor| {
            let range = range.unwrap_or_else(|| editor.get_selection());
            editor.modify_blocks_at(range, |tree, frag, _| Ok(modify(tree, frag)))
        })
    }

    fn make_list_of(&mut self, list_tag: &'static str) -> &mut Self {
        self.run(|editor| {
            let range = editor.get_selection();
            editor.make_list_at(range, list_tag)
        })
    }

    pub(crate) fn make_list_at(&mut self, range: Range, list_tag: &'static str) -> EditorResult<()> {
        let list_attributes = self.config.attributes_for(list_tag);
        let item_attributes = self.config.attributes_for("li");
        self.modify_blocks_at(range, |tree, frag, root| {
            make_list(tree, frag, root, list_tag, &list_attributes, &item_attributes)
        })
    }

    #[instrument(skip(self))]
    pub fn make_ordered_list(&mut self) -> &mut Self {
        self.make_list_of("ol")
    }

    #[instrument(skip(self))]
    pub fn make_unordered_list(&mut self) -> &mut Self {
        self.make_list_of("ul")
    }

    #[instrument(skip(self))]
    pub fn remove_list(&mut self) -> &mut Self {
        self.run(|editor| {
            let range = editor.get_selection();
            editor.modify_blocks_at(range, remove_list)
        })
    }

    /// Nest the selected list items one level deeper, under the item
    /// before them.
    #[instrument(skip(self))]
    pub fn increase_list_level(&mut self, range: Option<Range>) -> &mut Self {
        self.run(|editor| {
            let range = range.unwrap_or_else(|| editor.get_selection());
            editor.increase_list_level_at(range)
        })
    }

    pub(crate) fn increase_list_level_at(&mut self, range: Range) -> EditorResult<()> {
        let root = self.tree.root();
        let Some((list, Some(start_item), end_item)) = list_selection(&self.tree, &range, root) else {
            return Ok(());
        };
        if self.tree.first_child(list) == Some(start_item) {
            return Ok(());
        }
        self.save_undo_state_at(&range);
        let list_tag = self.tree.tag(list).unwrap_or("ul").to_string();
        let list_attributes = self.config.attributes_for(&list_tag);

        let tree = &mut self.tree;
        let mut range = range;
        move_boundaries_down(tree, &mut range);
        let mut new_parent = tree
            .previous_sibling(start_item)
            .ok_or(EditorError::invariant("list item after the first has no previous sibling"))?;
        if !tree.has_tag(new_parent, &list_tag) {
            new_parent = tree.create_element_with(&list_tag, &list_attributes);
            tree.insert_before(list, new_parent, Some(start_item))?;
        }
        let mut item = Some(start_item);
        while let Some(current) = item {
            item = if Some(current) == end_item {
                None
            } else {
                tree.next_sibling(current)
            };
            tree.append_child(new_parent, current)?;
        }
        if let Some(next) = tree.next_sibling(new_parent) {
            merge_containers(tree, next, root)?;
        }
        let range = clamp(tree, &range);
        self.finish(range);
        Ok(())
    }

    /// Move the selected list items one level up. Items leaving the
    /// outermost list become default blocks.
    #[instrument(skip(self))]
    pub fn decrease_list_level(&mut self, range: Option<Range>) -> &mut Self {
        self.run(|editor| {
            let range = range.unwrap_or_else(|| editor.get_selection());
            editor.decrease_list_level_at(range)
        })
    }

    pub(crate) fn decrease_list_level_at(&mut self, range: Range) -> EditorResult<()> {
        let root = self.tree.root();
        let Some((list, start_item, end_item)) = list_selection(&self.tree, &range, root) else {
            return Ok(());
        };
        let start_item = start_item.or_else(|| self.tree.first_child(list));
        let end_item = end_item.or_else(|| self.tree.last_child(list));
        self.save_undo_state_at(&range);

        let tree = &mut self.tree;
        let mut range = range;
        move_boundaries_down(tree, &mut range);
        let mut insert_before = None;
        if let (Some(start_item), Some(end_item)) = (start_item, end_item) {
            let mut new_parent = tree.parent(list).ok_or(EditorError::Detached(list))?;
            insert_before = match tree.next_sibling(end_item) {
                Some(next) => split(tree, list, SplitAt::Node(Some(next)), new_parent, root)?,
                None => tree.next_sibling(list),
            };
            if new_parent != root && tree.has_tag(new_parent, "li") {
                // Items after the selection stay nested, now under the last moved item.
                let item_parent = new_parent;
                new_parent = tree.parent(item_parent).ok_or(EditorError::Detached(item_parent))?;
                while let Some(node) = insert_before {
                    insert_before = tree.next_sibling(node);
                    tree.append_child(end_item, node)?;
                }
                insert_before = tree.next_sibling(item_parent);
            }
            let make_not_list = !is_list(tree, new_parent);
            let mut item = Some(start_item);
            while let Some(current) = item {
                item = if current == end_item {
                    None
                } else {
                    tree.next_sibling(current)
                };
                tree.detach(current);
                let mut moved = current;
                if make_not_list && tree.has_tag(current, "li") {
                    let contents = empty(tree, current);
                    moved = tree.create_default_block(&[contents])?;
                    retarget(&mut range, current, moved);
                }
                tree.insert_before(new_parent, moved, insert_before)?;
            }
        }
        if tree.first_child(list).is_none() {
            tree.detach(list);
        }
        if let Some(next) = insert_before {
            merge_containers(tree, next, root)?;
        }
        let range = clamp(tree, &range);
        self.finish(range);
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn increase_quote_level(&mut self, range: Option<Range>) -> &mut Self {
        let attributes = self.config.attributes_for("blockquote");
        self.run(|editor| {
            let range = range.unwrap_or_else(|| editor.get_selection());
            editor.modify_blocks_at(range, |tree, frag, _| {
                Ok(create_element(tree, "blockquote", &attributes, &[frag]))
            })
        })
    }

    #[instrument(skip(self))]
    pub fn decrease_quote_level(&mut self, range: Option<Range>) -> &mut Self {
        self.run(|editor| {
            let range = range.unwrap_or_else(|| editor.get_selection());
            editor.modify_blocks_at(range, |tree, frag, _| unquote(tree, frag))
        })
    }

    /// Replace the blocks of the range with one empty default block,
    /// splitting the quote around them.
    pub(crate) fn remove_quote_at(&mut self, range: Range) -> EditorResult<()> {
        self.modify_blocks_at(range, |tree, _, _| tree.create_default_block(&[]))
    }

    /// Align the selected blocks; `None` clears the alignment.
    pub fn set_text_alignment(&mut self, alignment: Option<&str>) -> &mut Self {
        let alignment = alignment.filter(|a| !a.is_empty()).map(str::to_string);
        self.for_each_block(
            move |tree, block| {
                let mut classes: Vec<String> = tree
                    .class_list(block)
                    .into_iter()
                    .filter(|c| !c.starts_with("align"))
                    .map(str::to_string)
                    .collect();
                match &alignment {
                    Some(alignment) => {
                        classes.push(format!("align-{alignment}"));
                        tree.set_class_name(block, &classes.join(" "));
                        tree.set_style_property(block, "text-align", alignment);
                    }
                    None => {
                        tree.set_class_name(block, &classes.join(" "));
                        tree.remove_style_property(block, "text-align");
                    }
                }
                false
            },
            true,
            None,
        )
    }

    /// Set `dir` on the selected blocks; `None` removes it.
    pub fn set_text_direction(&mut self, direction: Option<&str>) -> &mut Self {
        let direction = direction.filter(|d| !d.is_empty()).map(str::to_string);
        self.for_each_block(
            move |tree, block| {
                match &direction {
                    Some(direction) => tree.set_attr(block, "dir", direction),
                    None => tree.remove_attr(block, "dir"),
                }
                false
            },
            true,
            None,
        )
    }

    /// Break the block at the range, as Enter does. With `line_break_only`
    /// a `<br>` is inserted instead, as Shift-Enter does.
    #[instrument(skip(self))]
    pub fn split_block(&mut self, line_break_only: bool, range: Option<Range>) -> &mut Self {
        self.run(|editor| {
            let range = range.unwrap_or_else(|| editor.get_selection());
            editor.try_split_block(line_break_only, range)
        })
    }

    pub(crate) fn try_split_block(&mut self, line_break_only: bool, range: Range) -> EditorResult<()> {
        let mut range = range;
        let root = self.tree.root();
        self.record_undo_state(&range, false);
        self.remove_zws_if_needed();
        range = clamp(&self.tree, &range);
        if !range.is_collapsed() {
            delete_contents(&mut self.tree, &mut range, root)?;
        }
        if self.config.add_links {
            move_boundaries_down(&mut self.tree, &mut range);
            if self.tree.is_text(range.start.node) {
                self.defer(DeferredTask::Linkify {
                    text_node: range.start.node,
                    offset: range.start.offset,
                });
            }
        }

        let block = start_block(&self.tree, &range, root);
        if let Some(pre) = block.and_then(|b| get_nearest(&self.tree, b, root, "pre", &[])) {
            return self.split_in_pre(pre, range, line_break_only);
        }
        let splittable = block.filter(|b| {
            !line_break_only && !self.tree.has_tag(*b, "td") && !self.tree.has_tag(*b, "th")
        });
        let Some(mut block) = splittable else {
            let tree = &mut self.tree;
            move_boundary_out_of(tree, &mut range, "a", root);
            let node = if block.is_none() && !line_break_only {
                tree.create_default_block(&[])?
            } else {
                tree.create_element("br")
            };
            insert_node_in_range(tree, &mut range, node)?;
            range.collapse(false);
            self.finish(range);
            return Ok(());
        };

        if let Some(item) = get_nearest(&self.tree, block, root, "li", &[]) {
            block = item;
        }
        if self.tree.is_empty_block(block) {
            if get_nearest(&self.tree, block, root, "ul", &[]).is_some()
                || get_nearest(&self.tree, block, root, "ol", &[]).is_some()
            {
                return self.decrease_list_level_at(range);
            }
            if get_nearest(&self.tree, block, root, "blockquote", &[]).is_some() {
                return self.remove_quote_at(range);
            }
        }

        let (split_tag, split_attributes) = match self.tree.tag(block) {
            Some("dt") => ("dd".to_string(), Vec::new()),
            Some("dd") => ("dt".to_string(), Vec::new()),
            Some("li") => ("li".to_string(), Vec::new()),
            _ => (self.config.block_tag.clone(), self.config.block_attribute_pairs()),
        };
        let tree = &mut self.tree;
        let parent = tree.parent(block).ok_or(EditorError::Detached(block))?;
        let mut node_after = split(tree, range.start.node, SplitAt::Offset(range.start.offset), parent, root)?
            .ok_or(EditorError::invariant("splitting a block left no second half"))?;
        if !has_tag_attributes(tree, node_after, &split_tag, &split_attributes) {
            let replacement = tree.create_element_with(&split_tag, &split_attributes);
            if let Some(dir) = tree.attr(node_after, "dir").map(str::to_string) {
                tree.set_attr(replacement, "dir", &dir);
            }
            tree.replace_with(node_after, replacement)?;
            let contents = empty(tree, node_after);
            tree.append_child(replacement, contents)?;
            fix_cursor(tree, replacement)?;
            node_after = replacement;
        }
        remove_zws(tree, block, None);
        remove_empty_inlines(tree, block);
        fix_cursor(tree, block)?;

        while tree.is_element(node_after) {
            let text = tree.text_content(node_after);
            if tree.has_tag(node_after, "a") && (text.is_empty() || text == ZWS.to_string()) {
                let placeholder = tree.create_text("");
                tree.replace_with(node_after, placeholder)?;
                node_after = placeholder;
                break;
            }
            let mut child = tree.first_child(node_after);
            while let Some(c) = child.filter(|c| tree.text(*c) == Some("")) {
                match tree.next_sibling(c) {
                    Some(next) if !tree.has_tag(next, "br") => {
                        tree.detach(c);
                        child = Some(next);
                    }
                    _ => break,
                }
            }
            match child {
                Some(c) if !tree.has_tag(c, "br") && !tree.is_text(c) => node_after = c,
                _ => break,
            }
        }
        debug!(tag = %split_tag, "Split block");
        self.finish(Range::collapsed_at(node_after, 0));
        Ok(())
    }

    /// Enter inside `<pre>`: a newline, or on a blank line, a new default
    /// block after the preformatted text.
    fn split_in_pre(&mut self, pre: NodeId, range: Range, line_break_only: bool) -> EditorResult<()> {
        let mut range = range;
        let root = self.tree.root();
        let tree = &mut self.tree;
        move_boundaries_down(tree, &mut range);
        range.collapse(true);
        let (mut node, mut offset) = (range.start.node, range.start.offset);
        if !tree.is_text(node) {
            let text = tree.create_text("");
            insert_node_in_range(tree, &mut range, text)?;
            node = text;
            offset = 0;
        }
        let caret = Range::collapsed_at(node, offset);
        let at_line_start = (offset > 0 && tree.char_at(node, offset - 1) == Some('\n'))
            || range_does_start_at_block_boundary(tree, &caret, root);
        let at_line_end =
            tree.char_at(node, offset) == Some('\n') || range_does_end_at_block_boundary(tree, &caret, root);

        let range = if !line_break_only && at_line_start && at_line_end {
            // Enter on a blank line leaves the preformatted block.
            let start = offset.saturating_sub(1);
            let count = if offset > 0 { 2 } else { 1 };
            let count = count.min(tree.length(node).saturating_sub(start));
            tree.delete_text(node, start, count)?;
            let after = split(tree, node, SplitAt::Offset(start), root, root)?
                .ok_or(EditorError::invariant("splitting a pre left no second half"))?;
            if let Some(before) = tree.previous_sibling(after).filter(|b| tree.text_content(*b).is_empty()) {
                tree.detach(before);
            }
            let block = tree.create_default_block(&[])?;
            let parent = tree.parent(after).ok_or(EditorError::Detached(after))?;
            tree.insert_before(parent, block, Some(after))?;
            if tree.text_content(after).is_empty() {
                tree.detach(after);
            }
            Range::collapsed_at(block, 0)
        } else {
            tree.insert_text(node, offset, "\n")?;
            fix_cursor(tree, pre)?;
            if tree.length(node) == offset + 1 {
                let mut range = Range::collapsed_at(node, offset + 1);
                range.set_start_after(tree, node);
                range.collapse(true);
                range
            } else {
                Range::collapsed_at(node, offset + 1)
            }
        };
        self.finish(range);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;

    fn editor_with(html: &str) -> Editor {
        let mut editor = Editor::new(EditorConfig::default());
        editor.set_html(html);
        editor
    }

    fn node_at(editor: &Editor, path: &[usize]) -> NodeId {
        let mut node = editor.root();
        for index in path {
            node = editor.tree().child(node, *index).unwrap();
        }
        node
    }

    fn select_all(editor: &mut Editor) {
        let range = Range::of_contents(editor.tree(), editor.root());
        editor.set_selection(range);
    }

    #[test]
    fn test_make_unordered_list_from_blocks() {
        let mut editor = editor_with("<div>a</div><div dir=\"rtl\">b</div>");
        select_all(&mut editor);
        editor.make_unordered_list();
        assert_eq!(editor.get_html(), "<ul><li>a</li><li dir=\"rtl\">b</li></ul>");
        assert!(editor.undo_state().can_undo);
    }

    #[test]
    fn test_make_ordered_list_retags_existing_list() {
        let mut editor = editor_with("<ul><li>a</li><li>b</li></ul>");
        select_all(&mut editor);
        editor.make_ordered_list();
        assert_eq!(editor.get_html(), "<ol><li>a</li><li>b</li></ol>");
    }

    #[test]
    fn test_remove_list_makes_default_blocks() {
        let mut editor = editor_with("<ol><li>a</li><li>b</li></ol>");
        select_all(&mut editor);
        editor.remove_list();
        assert_eq!(editor.get_html(), "<div>a</div><div>b</div>");
    }

    #[test]
    fn test_quote_level_round_trip() {
        let mut editor = editor_with("<div>a</div>");
        editor.increase_quote_level(None);
        assert_eq!(editor.get_html(), "<blockquote><div>a</div></blockquote>");
        editor.decrease_quote_level(None);
        assert_eq!(editor.get_html(), "<div>a</div>");
    }

    #[test]
    fn test_list_level_round_trip() {
        let mut editor = editor_with("<ol><li>a</li><li>b</li></ol>");
        let b = node_at(&editor, &[0, 1, 0]);
        editor.set_selection(Range::collapsed_at(b, 1));
        editor.increase_list_level(None);
        assert_eq!(editor.get_html(), "<ol><li>a</li><ol><li>b</li></ol></ol>");
        assert_eq!(editor.get_selection(), Range::collapsed_at(b, 1));

        editor.decrease_list_level(None);
        assert_eq!(editor.get_html(), "<ol><li>a</li><li>b</li></ol>");
    }

    #[test]
    fn test_first_item_cannot_be_indented() {
        let mut editor = editor_with("<ul><li>a</li></ul>");
        let a = node_at(&editor, &[0, 0, 0]);
        editor.set_selection(Range::collapsed_at(a, 0));
        editor.increase_list_level(None);
        assert_eq!(editor.get_html(), "<ul><li>a</li></ul>");
    }

    #[test]
    fn test_text_alignment_and_direction() {
        let mut editor = editor_with("<div class=\"align-left note\">a</div>");
        editor.set_text_alignment(Some("center"));
        assert_eq!(
            editor.get_html(),
            "<div class=\"note align-center\" style=\"text-align: center;\">a</div>"
        );
        editor.set_text_alignment(None).set_text_direction(Some("rtl"));
        assert_eq!(editor.get_html(), "<div class=\"note\" dir=\"rtl\">a</div>");
    }

    #[test]
    fn test_enter_splits_block() {
        let mut editor = editor_with("<div>ab</div>");
        let ab = node_at(&editor, &[0, 0]);
        editor.set_selection(Range::collapsed_at(ab, 1));
        editor.split_block(false, None);
        assert_eq!(editor.get_html(), "<div>a</div><div>b</div>");
        let second = node_at(&editor, &[1]);
        assert_eq!(editor.get_selection(), Range::collapsed_at(second, 0));
        assert_eq!(editor.pending_tasks(), 1);
    }

    #[test]
    fn test_enter_continues_list_items() {
        let mut editor = editor_with("<ul><li>ab</li></ul>");
        let ab = node_at(&editor, &[0, 0, 0]);
        editor.set_selection(Range::collapsed_at(ab, 2));
        editor.split_block(false, None);
        assert_eq!(editor.get_html(), "<ul><li>ab</li><li><br></li></ul>");
    }

    #[test]
    fn test_enter_after_heading_makes_default_block() {
        let mut editor = editor_with("<h1>ab</h1>");
        let ab = node_at(&editor, &[0, 0]);
        editor.set_selection(Range::collapsed_at(ab, 2));
        editor.split_block(false, None);
        assert_eq!(editor.get_html(), "<h1>ab</h1><div><br></div>");
    }

    #[test]
    fn test_enter_in_empty_item_leaves_list() {
        let mut editor = editor_with("<ul><li>a</li><li><br></li></ul>");
        let item = node_at(&editor, &[0, 1]);
        editor.set_selection(Range::collapsed_at(item, 0));
        editor.split_block(false, None);
        assert_eq!(editor.get_html(), "<ul><li>a</li></ul><div><br></div>");
    }

    #[test]
    fn test_enter_in_empty_quoted_block_leaves_quote() {
        let mut editor = editor_with("<blockquote><div>a</div><div><br></div></blockquote>");
        let block = node_at(&editor, &[0, 1]);
        editor.set_selection(Range::collapsed_at(block, 0));
        editor.split_block(false, None);
        assert_eq!(
            editor.get_html(),
            "<blockquote><div>a</div></blockquote><div><br></div>"
        );
    }

    #[test]
    fn test_shift_enter_inserts_line_break() {
        let mut editor = editor_with("<div>ab</div>");
        let ab = node_at(&editor, &[0, 0]);
        editor.set_selection(Range::collapsed_at(ab, 1));
        editor.split_block(true, None);
        assert_eq!(editor.get_html(), "<div>a<br>b</div>");
        let b = node_at(&editor, &[0, 2]);
        assert_eq!(editor.get_selection(), Range::collapsed_at(b, 0));
    }

    #[test]
    fn test_enter_in_pre_inserts_newline() {
        let mut editor = editor_with("<pre>ab</pre>");
        let ab = node_at(&editor, &[0, 0]);
        editor.set_selection(Range::collapsed_at(ab, 1));
        editor.split_block(false, None);
        assert_eq!(editor.get_html(), "<pre>a\nb</pre>");
        assert_eq!(editor.get_selection(), Range::collapsed_at(ab, 2));
    }

    #[test]
    fn test_modify_blocks_with_custom_transform() {
        let mut editor = editor_with("<div>a</div>");
        editor.modify_blocks(
            |tree, frag| {
                let block = tree.first_child(frag).unwrap();
                tree.set_attr(block, "class", "done");
                frag
            },
            None,
        );
        assert_eq!(editor.get_html(), "<div class=\"done\">a</div>");
    }
}
