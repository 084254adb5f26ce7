//! # Range Operations
//!
//! Boundary normalization, block lookup, text extraction and the content
//! moving algorithms every editing command is built on.
//!
//! ## Design
//!
//! - Boundaries are pushed down to text positions before editing and pulled
//!   up to block edges before structural changes
//! - Extraction splits both boundaries up to the common ancestor, so the
//!   removed region never shares a half-split parent with the document
//! - Deletion always leaves a focusable root with at least one block
//! - Every function leaves the caller's range on a valid position

use scribe_dom::NodeId;
use tracing::debug;

use crate::clean::cleanup_brs;
use crate::errors::{EditorError, EditorResult};
use crate::merge_split::{fix_container, merge_containers, merge_with_block, split, SplitAt};
use crate::node_ops::{get_nearest, node_after_offset, node_before_offset};
use crate::range::Range;
use crate::tree::Tree;
use crate::walker::{TreeWalker, SHOW_ELEMENT_OR_TEXT};
use crate::whitespace::{fix_cursor, is_line_break, ZWS};

pub fn is_node_contained(tree: &Tree, range: &Range, node: NodeId, partial: bool) -> bool {
    range.contains_node(tree, node, partial)
}

/// Push both boundaries as deep as they go towards text positions.
pub fn move_boundaries_down(tree: &mut Tree, range: &mut Range) {
    let (mut sc, mut so) = (range.start.node, range.start.offset);
    let (mut ec, mut eo) = (range.end.node, range.end.offset);

    while !tree.is_text(sc) {
        let child = tree.child(sc, so);
        if let Some(child) = child.filter(|c| !tree.is_leaf(*c)) {
            sc = child;
            so = 0;
            continue;
        }
        let before = if so > 0 { tree.child(sc, so - 1) } else { None };
        if let Some(mut text_child) = before.filter(|c| tree.is_text(*c)) {
            while tree.length(text_child) == 0 {
                let prev = tree.previous_sibling(text_child);
                let Some(prev) = prev.filter(|p| tree.is_text(*p)) else {
                    break;
                };
                if ec == text_child {
                    ec = prev;
                    eo = tree.length(prev);
                } else if Some(ec) == tree.parent(text_child) {
                    let index = tree.index_of(text_child).unwrap_or(0);
                    if eo > index {
                        eo -= 1;
                    }
                }
                tree.detach(text_child);
                text_child = prev;
            }
            sc = text_child;
            so = tree.length(text_child);
        }
        break;
    }

    if eo > 0 {
        while !tree.is_text(ec) {
            let child = if eo > 0 { tree.child(ec, eo - 1) } else { None };
            match child {
                Some(c) if !tree.is_leaf(c) => {
                    ec = c;
                    eo = tree.length(c);
                }
                Some(c) if tree.has_tag(c, "br") && !is_line_break(tree, c, false) => eo -= 1,
                _ => break,
            }
        }
    } else {
        while !tree.is_text(ec) {
            match tree.first_child(ec) {
                Some(c) if !tree.is_leaf(c) => ec = c,
                _ => break,
            }
        }
    }

    range.set_start(tree, sc, so);
    range.set_end(tree, ec, eo);
}

/// Pull boundaries sitting at the very start (or end) of their container
/// outwards, stopping at `start_max`/`end_max` or the root.
pub fn move_boundaries_up(
    tree: &Tree,
    range: &mut Range,
    start_max: Option<NodeId>,
    end_max: Option<NodeId>,
    root: NodeId,
) {
    let start_max = start_max.unwrap_or_else(|| range.common_ancestor(tree));
    let end_max = end_max.unwrap_or(start_max);
    let (mut sc, mut so) = (range.start.node, range.start.offset);
    let (mut ec, mut eo) = (range.end.node, range.end.offset);

    while so == 0 && sc != start_max && sc != root {
        let (Some(parent), Some(index)) = (tree.parent(sc), tree.index_of(sc)) else {
            break;
        };
        so = index;
        sc = parent;
    }

    while ec != end_max && ec != root {
        if !tree.is_text(ec) {
            if let Some(c) = tree.child(ec, eo) {
                if tree.has_tag(c, "br") && !is_line_break(tree, c, false) {
                    eo += 1;
                }
            }
        }
        if eo != tree.length(ec) {
            break;
        }
        let (Some(parent), Some(index)) = (tree.parent(ec), tree.index_of(ec)) else {
            break;
        };
        eo = index + 1;
        ec = parent;
    }

    range.set_start(tree, sc, so);
    range.set_end(tree, ec, eo);
}

/// Collapse the range just after the nearest `tag` ancestor of its end,
/// when the end is at that ancestor's very end.
pub fn move_boundary_out_of(tree: &Tree, range: &mut Range, tag: &str, root: NodeId) {
    let Some(nearest) = get_nearest(tree, range.end.node, root, tag, &[]) else {
        return;
    };
    let Some(parent) = tree.parent(nearest) else {
        return;
    };
    let mut clone = *range;
    move_boundaries_up(tree, &mut clone, Some(parent), Some(parent), root);
    if clone.end.node == parent {
        *range = Range::collapsed_at(parent, clone.end.offset);
    }
}

/// First block touched by the range.
pub fn start_block(tree: &Tree, range: &Range, root: NodeId) -> Option<NodeId> {
    let container = range.start.node;
    let block = if tree.is_inline(container) {
        tree.previous_block(container, root)
    } else if container != root && tree.is_element(container) && tree.is_block(container) {
        Some(container)
    } else {
        let node = node_before_offset(tree, container, range.start.offset);
        tree.next_block(node, root)
    };
    block.filter(|b| range.contains_node(tree, *b, true))
}

/// Last block touched by the range.
pub fn end_block(tree: &Tree, range: &Range, root: NodeId) -> Option<NodeId> {
    let container = range.end.node;
    let block = if tree.is_inline(container) {
        tree.previous_block(container, root)
    } else if container != root && tree.is_element(container) && tree.is_block(container) {
        Some(container)
    } else {
        let mut node = node_after_offset(tree, container, range.end.offset)
            .filter(|n| tree.contains(root, *n))
            .unwrap_or(root);
        if node == root {
            while let Some(last) = tree.last_child(node) {
                node = last;
            }
        }
        tree.previous_block(node, root)
    };
    block.filter(|b| range.contains_node(tree, *b, true))
}

/// Grow the range to cover whole blocks.
pub fn expand_to_block_boundaries(tree: &Tree, range: &mut Range, root: NodeId) {
    let (Some(start), Some(end)) = (start_block(tree, range, root), end_block(tree, range, root)) else {
        return;
    };
    range.set_start_before(tree, start);
    range.set_end_after(tree, end);
}

/// Plain text of the range, with a newline per `<br>` and per block
/// boundary after text.
pub fn text_contents(tree: &Tree, range: &Range) -> String {
    if range.is_collapsed() {
        return String::new();
    }
    let r = *range;
    let common = r.common_ancestor(tree);
    let mut walker = TreeWalker::new(
        common,
        SHOW_ELEMENT_OR_TEXT,
        Box::new(move |t: &Tree, n| r.contains_node(t, n, true)),
    )
    .starting_at(r.start.node);

    let mut node = Some(r.start.node);
    if !walker.accepts(tree, r.start.node) {
        node = walker.next_node(tree);
    }
    let mut out = String::new();
    let mut added_text_in_block = false;
    while let Some(n) = node {
        if let Some(data) = tree.text(n) {
            if data.chars().any(|c| !c.is_whitespace()) {
                let mut value: Vec<char> = data.chars().collect();
                if n == r.end.node {
                    value.truncate(r.end.offset);
                }
                if n == r.start.node {
                    value.drain(..r.start.offset.min(value.len()));
                }
                out.extend(value);
                added_text_in_block = true;
            }
        } else if tree.has_tag(n, "br") || (added_text_in_block && !tree.is_inline(n)) {
            out.push('\n');
            added_text_in_block = false;
        }
        node = walker.next_node(tree);
    }
    out.replace('\u{a0}', " ")
}

/// Move the range's content into a new fragment. `common` defaults to the
/// range's common ancestor.
pub fn extract_contents(
    tree: &mut Tree,
    range: &mut Range,
    common: Option<NodeId>,
    root: NodeId,
) -> EditorResult<NodeId> {
    let frag = tree.create_fragment();
    if range.is_collapsed() {
        return Ok(frag);
    }
    let mut common = common.unwrap_or_else(|| range.common_ancestor(tree));
    if tree.is_text(common) {
        common = tree.parent(common).ok_or(EditorError::Detached(common))?;
    }
    let (start_container, start_offset) = (range.start.node, range.start.offset);
    let mut end_container = split(tree, range.end.node, SplitAt::Offset(range.end.offset), common, root)?;
    let mut end_offset = 0;
    let mut node = split(tree, start_container, SplitAt::Offset(start_offset), common, root)?;
    while let Some(n) = node.filter(|n| Some(*n) != end_container) {
        node = tree.next_sibling(n);
        tree.append_child(frag, n)?;
    }
    if let Some(end) = end_container {
        if tree.is_text(start_container) && tree.is_text(end) {
            let data = tree.text(end).unwrap_or_default().to_string();
            tree.append_text(start_container, &data)?;
            tree.detach(end);
            end_container = Some(start_container);
            end_offset = start_offset;
        }
    }

    *range = Range::collapsed_at(start_container, start_offset);
    match end_container {
        Some(end) => range.set_end(tree, end, end_offset),
        None => {
            let length = tree.length(common);
            range.set_end(tree, common, length);
        }
    }
    fix_cursor(tree, common)?;
    Ok(frag)
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Forward,
    BackwardPostOrder,
}

fn adjacent_inline_node(tree: &Tree, root: NodeId, direction: Direction, node: NodeId) -> Option<NodeId> {
    let mut walker = TreeWalker::unfiltered(root, SHOW_ELEMENT_OR_TEXT).starting_at(node);
    loop {
        let next = match direction {
            Direction::Forward => walker.next_node(tree),
            Direction::BackwardPostOrder => walker.previous_post_order(tree),
        }?;
        if tree.is_text(next) || tree.is_leaf(next) {
            return Some(next);
        }
        if !tree.is_inline(next) {
            return None;
        }
    }
}

/// Delete the range's content, merge the blocks on either side and
/// collapse the range at the junction. Returns the removed content.
pub fn delete_contents(tree: &mut Tree, range: &mut Range, root: NodeId) -> EditorResult<NodeId> {
    let start = start_block(tree, range, root);
    let end = end_block(tree, range, root);
    let needs_merge = start != end;
    if start.is_some() && end.is_some() {
        move_boundaries_down(tree, range);
        move_boundaries_up(tree, range, start, end, root);
    }
    let frag = extract_contents(tree, range, None, root)?;
    move_boundaries_down(tree, range);
    if needs_merge {
        if let (Some(start), Some(end)) = (start, end_block(tree, range, root)) {
            if start != end {
                merge_with_block(tree, start, end, range, root)?;
            }
        }
    }
    if let Some(start) = start {
        fix_cursor(tree, start)?;
    }
    let first = tree.first_child(root);
    if first.map_or(true, |c| tree.has_tag(c, "br")) {
        fix_cursor(tree, root)?;
        if let Some(first) = tree.first_child(root) {
            range.select_node_contents(tree, first);
        }
    }
    // An emptied list or quote left as the only child becomes a plain block.
    let emptied_shell = tree
        .first_child(root)
        .filter(|c| needs_merge && tree.child_count(root) == 1 && tree.is_container(*c))
        .filter(|c| tree.is_empty_block(*c));
    if let Some(shell) = emptied_shell {
        let block = tree.create_default_block(&[])?;
        tree.replace_with(shell, block)?;
        *range = Range::collapsed_at(block, 0);
    }
    range.collapse(true);

    // Keep a space next to the junction visible once it becomes the
    // first or last character of a run.
    let (start_container, start_offset) = (range.start.node, range.start.offset);
    let mut after_node = Some(start_container);
    let mut after_offset = start_offset;
    if !tree.is_text(start_container) || start_offset == tree.length(start_container) {
        after_node = adjacent_inline_node(tree, root, Direction::Forward, start_container);
        after_offset = 0;
    }
    let mut before_node = Some(start_container);
    let mut before_offset = start_offset.checked_sub(1);
    if !tree.is_text(start_container) || before_offset.is_none() {
        let from = after_node.unwrap_or_else(|| {
            if tree.is_text(start_container) {
                start_container
            } else {
                tree.child(start_container, start_offset).unwrap_or(start_container)
            }
        });
        before_node = adjacent_inline_node(tree, root, Direction::BackwardPostOrder, from);
        before_offset = before_node
            .filter(|n| tree.is_text(*n))
            .and_then(|n| tree.length(n).checked_sub(1));
    }

    let space_at = |node: Option<NodeId>, offset: Option<usize>| -> bool {
        match (node, offset) {
            (Some(n), Some(o)) => tree.char_at(n, o) == Some(' '),
            _ => false,
        }
    };
    let after_is_space = space_at(after_node, Some(after_offset));
    let before_is_space = space_at(before_node, before_offset);
    let target = if after_is_space && range_does_start_at_block_boundary(tree, range, root) {
        after_node.map(|n| (n, after_offset))
    } else if before_is_space && (after_is_space || range_does_end_at_block_boundary(tree, range, root)) {
        before_node.zip(before_offset)
    } else {
        None
    };
    if let Some((node, offset)) = target {
        tree.replace_text(node, offset, 1, "\u{a0}")?;
    }

    *range = Range::collapsed_at(start_container, start_offset);
    Ok(frag)
}

/// Insert `node` at the range start, splitting a text node if needed. The
/// range ends up around the inserted node.
pub fn insert_node_in_range(tree: &mut Tree, range: &mut Range, node: NodeId) -> EditorResult<()> {
    let collapsed = range.is_collapsed();
    let (mut sc, mut so) = (range.start.node, range.start.offset);
    let (mut ec, mut eo) = (range.end.node, range.end.offset);

    if tree.is_text(sc) {
        let parent = tree.parent(sc).ok_or(EditorError::Detached(sc))?;
        if so == tree.length(sc) {
            so = tree.index_of(sc).unwrap_or(0) + 1;
            if collapsed {
                ec = parent;
                eo = so;
            }
        } else {
            if so > 0 {
                let after = tree.split_text(sc, so)?;
                if ec == sc {
                    eo -= so;
                    ec = after;
                } else if ec == parent {
                    eo += 1;
                }
                sc = after;
            }
            so = tree.index_of(sc).unwrap_or(0);
        }
        sc = parent;
    }

    let count = tree.child_count(sc);
    let reference = tree.child(sc, so);
    tree.insert_before(sc, node, reference)?;
    if sc == ec {
        eo += tree.child_count(sc) - count;
    }
    *range = Range::collapsed_at(sc, so);
    range.set_end(tree, ec, eo);
    Ok(())
}

/// Insert a cleaned fragment at the range, merging its first block into
/// the block at the caret and its tail into the content after it.
pub fn insert_tree_fragment_into_range(
    tree: &mut Tree,
    range: &mut Range,
    frag: NodeId,
    root: NodeId,
) -> EditorResult<()> {
    let first_in_frag_is_inline = tree.first_child(frag).is_some_and(|f| tree.is_inline(f));
    fix_container(tree, frag, root)?;
    let mut node = frag;
    while let Some(block) = tree.next_block(node, root) {
        fix_cursor(tree, block)?;
        node = block;
    }

    if !range.is_collapsed() {
        delete_contents(tree, range, root)?;
    }
    move_boundaries_down(tree, range);
    range.collapse(false);
    let stop_point = get_nearest(tree, range.end.node, root, "blockquote", &[]).unwrap_or(root);
    let mut block = start_block(tree, range, root);
    let mut contents_after_split = None;
    let first_block_in_frag = tree.next_block(frag, frag);
    let replace_block = !first_in_frag_is_inline && block.is_some_and(|b| tree.is_empty_block(b));

    if let (Some(target), Some(first_block)) = (block, first_block_in_frag) {
        if !replace_block
            && get_nearest(tree, first_block, frag, "pre", &[]).is_none()
            && get_nearest(tree, first_block, frag, "table", &[]).is_none()
        {
            move_boundaries_up(tree, range, Some(target), Some(target), root);
            range.collapse(true);
            cleanup_brs(tree, target, root, false)?;
            let mut container = range.end.node;
            let mut offset = range.end.offset.min(tree.length(container));
            if tree.is_inline(container) {
                let stop = tree.previous_block(container, root).unwrap_or(root);
                match split(tree, container, SplitAt::Offset(offset), stop, root)? {
                    Some(after) => {
                        container = tree.parent(after).ok_or(EditorError::Detached(after))?;
                        offset = tree.index_of(after).unwrap_or(0);
                    }
                    None => {
                        container = stop;
                        offset = tree.length(stop);
                    }
                }
            }
            if offset != tree.length(container) {
                let rest = tree.create_fragment();
                while let Some(child) = tree.child(container, offset) {
                    tree.append_child(rest, child)?;
                }
                contents_after_split = Some(rest);
            }
            merge_with_block(tree, container, first_block, range, root)?;
            if let (Some(parent), Some(index)) = (tree.parent(container), tree.index_of(container)) {
                range.set_end(tree, parent, index + 1);
            }
        }
    }

    if tree.length(frag) > 0 {
        if let Some(empty_block) = block.filter(|_| replace_block) {
            range.set_end_before(tree, empty_block);
            range.collapse(false);
            tree.detach(empty_block);
        }
        move_boundaries_up(tree, range, Some(stop_point), Some(stop_point), root);
        let node_after_split = split(
            tree,
            range.end.node,
            SplitAt::Offset(range.end.offset),
            stop_point,
            root,
        )?;
        let node_before_split = match node_after_split {
            Some(after) => tree.previous_sibling(after),
            None => tree.last_child(stop_point),
        };
        tree.insert_before(stop_point, frag, node_after_split)?;
        match node_after_split {
            Some(after) => range.set_end_before(tree, after),
            None => {
                let length = tree.length(stop_point);
                range.set_end(tree, stop_point, length);
            }
        }
        block = end_block(tree, range, root);
        move_boundaries_down(tree, range);
        let (container, offset) = (range.end.node, range.end.offset);
        if let Some(after) = node_after_split.filter(|n| tree.is_container(*n)) {
            merge_containers(tree, after, root)?;
        }
        let after = node_before_split.and_then(|n| tree.next_sibling(n));
        if let Some(after) = after.filter(|n| tree.is_container(*n)) {
            merge_containers(tree, after, root)?;
        }
        range.set_end(tree, container, offset);
        debug!(stop = %stop_point, "Inserted fragment");
    }

    if let (Some(rest), Some(block)) = (contents_after_split, block) {
        let mut temp = *range;
        fix_cursor(tree, rest)?;
        merge_with_block(tree, block, rest, &mut temp, root)?;
        range.set_end(tree, temp.end.node, temp.end.offset);
    }
    move_boundaries_down(tree, range);
    Ok(())
}

/// True when nothing but placeholders precedes the range start in its block.
pub fn range_does_start_at_block_boundary(tree: &Tree, range: &Range, root: NodeId) -> bool {
    let (sc, so) = (range.start.node, range.start.offset);
    let node_after_cursor = if let Some(text) = tree.text(sc) {
        if text.chars().take(so).any(|c| c != ZWS) {
            return false;
        }
        sc
    } else {
        match node_after_offset(tree, sc, so).filter(|n| tree.contains(root, *n)) {
            Some(node) => node,
            None => {
                let before = node_before_offset(tree, sc, so);
                if tree.text(before).is_some_and(|t| !t.is_empty()) {
                    return false;
                }
                before
            }
        }
    };
    let Some(block) = start_block(tree, range, root) else {
        return false;
    };
    let mut walker = TreeWalker::new(block, SHOW_ELEMENT_OR_TEXT, Box::new(|t: &Tree, n| t.is_content(n)))
        .starting_at(node_after_cursor);
    walker.previous_node(tree).is_none()
}

/// True when nothing but placeholders follows the range end in its block.
pub fn range_does_end_at_block_boundary(tree: &Tree, range: &Range, root: NodeId) -> bool {
    let (ec, eo) = (range.end.node, range.end.offset);
    let current = if let Some(text) = tree.text(ec) {
        if text.chars().skip(eo).any(|c| c != ZWS) {
            return false;
        }
        ec
    } else {
        node_before_offset(tree, ec, eo)
    };
    let Some(block) = end_block(tree, range, root) else {
        return false;
    };
    let mut walker = TreeWalker::new(block, SHOW_ELEMENT_OR_TEXT, Box::new(|t: &Tree, n| t.is_content(n)))
        .starting_at(current);
    walker.next_node(tree).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Boundary;

    fn tree_with(html: &str) -> Tree {
        let mut tree = Tree::new("div");
        let root = tree.root();
        tree.set_inner_html(root, html).unwrap();
        tree
    }

    fn text_at(tree: &Tree, path: &[usize]) -> NodeId {
        let mut node = tree.root();
        for index in path {
            node = tree.child(node, *index).unwrap();
        }
        node
    }

    #[test]
    fn test_move_boundaries_down() {
        let mut tree = tree_with("<div>ab<b>cd</b></div>");
        let root = tree.root();
        let mut range = Range::of_contents(&tree, root);
        move_boundaries_down(&mut tree, &mut range);
        assert_eq!(range.start, Boundary::new(text_at(&tree, &[0, 0]), 0));
        assert_eq!(range.end, Boundary::new(text_at(&tree, &[0, 1, 0]), 2));
    }

    #[test]
    fn test_move_boundaries_down_prefers_preceding_text() {
        let mut tree = tree_with("<div>ab<img></div>");
        let root = tree.root();
        let div = tree.first_child(root).unwrap();
        let mut range = Range::collapsed_at(div, 1);
        move_boundaries_down(&mut tree, &mut range);
        assert_eq!(range.start, Boundary::new(text_at(&tree, &[0, 0]), 2));
    }

    #[test]
    fn test_move_boundaries_up() {
        let tree = tree_with("<div><b>ab</b></div>");
        let root = tree.root();
        let div = tree.first_child(root).unwrap();
        let ab = text_at(&tree, &[0, 0, 0]);
        let mut range = Range::new(&tree, ab, 0, ab, 2);
        move_boundaries_up(&tree, &mut range, Some(div), Some(div), root);
        assert_eq!(range.start, Boundary::new(div, 0));
        assert_eq!(range.end, Boundary::new(div, 1));
    }

    #[test]
    fn test_block_lookup() {
        let tree = tree_with("<div>ab</div><div>cd</div>");
        let root = tree.root();
        let ab = text_at(&tree, &[0, 0]);
        let cd = text_at(&tree, &[1, 0]);
        let range = Range::new(&tree, ab, 1, cd, 1);
        assert_eq!(start_block(&tree, &range, root), tree.child(root, 0));
        assert_eq!(end_block(&tree, &range, root), tree.child(root, 1));

        let whole = Range::of_contents(&tree, root);
        assert_eq!(start_block(&tree, &whole, root), tree.child(root, 0));
        assert_eq!(end_block(&tree, &whole, root), tree.child(root, 1));
    }

    #[test]
    fn test_text_contents() {
        let tree = tree_with("<div>ab<br>c&nbsp;d</div><div>ef</div>");
        let root = tree.root();
        let range = Range::of_contents(&tree, root);
        assert_eq!(text_contents(&tree, &range), "ab\nc d\nef");
    }

    #[test]
    fn test_extract_within_text() {
        let mut tree = tree_with("<div>abcdef</div>");
        let root = tree.root();
        let text = text_at(&tree, &[0, 0]);
        let mut range = Range::new(&tree, text, 2, text, 4);
        let frag = extract_contents(&mut tree, &mut range, None, root).unwrap();
        assert_eq!(tree.inner_html(frag), "cd");
        assert_eq!(tree.inner_html(root), "<div>abef</div>");
        assert_eq!(range, Range::collapsed_at(text, 2));
    }

    #[test]
    fn test_delete_across_blocks_merges() {
        let mut tree = tree_with("<div>abc</div><div>def</div>");
        let root = tree.root();
        let abc = text_at(&tree, &[0, 0]);
        let def = text_at(&tree, &[1, 0]);
        let mut range = Range::new(&tree, abc, 1, def, 2);
        delete_contents(&mut tree, &mut range, root).unwrap();
        assert_eq!(tree.inner_html(root), "<div>af</div>");
        assert!(range.is_collapsed());
        assert_eq!(range.start, Boundary::new(abc, 1));
    }

    #[test]
    fn test_delete_everything_leaves_one_block() {
        let mut tree = tree_with("<div>abc</div><div>def</div>");
        let root = tree.root();
        let mut range = Range::of_contents(&tree, root);
        delete_contents(&mut tree, &mut range, root).unwrap();
        assert_eq!(tree.child_count(root), 1);
        assert_eq!(tree.inner_html(root), "<div><br></div>");
    }

    #[test]
    fn test_delete_everything_from_list_leaves_plain_block() {
        let mut tree = tree_with("<ul><li>a</li></ul><blockquote><div>b</div></blockquote><div>c</div>");
        let root = tree.root();
        let mut range = Range::of_contents(&tree, root);
        delete_contents(&mut tree, &mut range, root).unwrap();
        assert_eq!(tree.inner_html(root), "<div><br></div>");
        let block = tree.first_child(root).unwrap();
        assert_eq!(range, Range::collapsed_at(block, 0));
    }

    #[test]
    fn test_delete_within_one_item_keeps_list() {
        let mut tree = tree_with("<ul><li>abc</li></ul>");
        let root = tree.root();
        let text = text_at(&tree, &[0, 0, 0]);
        let mut range = Range::new(&tree, text, 0, text, 3);
        delete_contents(&mut tree, &mut range, root).unwrap();
        let list = tree.first_child(root).unwrap();
        assert!(tree.has_tag(list, "ul"));
        assert_eq!(tree.child_count(root), 1);
    }

    #[test]
    fn test_delete_keeps_edge_space_visible() {
        let mut tree = tree_with("<div>a bc</div>");
        let root = tree.root();
        let text = text_at(&tree, &[0, 0]);
        let mut range = Range::new(&tree, text, 2, text, 4);
        delete_contents(&mut tree, &mut range, root).unwrap();
        assert_eq!(tree.text(text), Some("a\u{a0}"));
    }

    #[test]
    fn test_insert_node_in_range_splits_text() {
        let mut tree = tree_with("<div>abcd</div>");
        let root = tree.root();
        let div = tree.first_child(root).unwrap();
        let text = tree.first_child(div).unwrap();
        let img = tree.create_element("img");
        let mut range = Range::collapsed_at(text, 2);
        insert_node_in_range(&mut tree, &mut range, img).unwrap();
        assert_eq!(tree.inner_html(root), "<div>ab<img>cd</div>");
        let cd = tree.child(div, 2).unwrap();
        assert_eq!(range.start, Boundary::new(div, 1));
        assert_eq!(range.end, Boundary::new(cd, 0));
    }

    #[test]
    fn test_insert_fragment_merges_first_block() {
        let mut tree = tree_with("<div>abcd</div>");
        let root = tree.root();
        let text = text_at(&tree, &[0, 0]);
        let frag = tree.parse_fragment("<div>XY</div>");
        let mut range = Range::collapsed_at(text, 2);
        insert_tree_fragment_into_range(&mut tree, &mut range, frag, root).unwrap();
        assert_eq!(tree.inner_html(root), "<div>abXYcd</div>");
    }

    #[test]
    fn test_insert_inline_fragment_into_empty_block() {
        let mut tree = tree_with("<div><br></div>");
        let root = tree.root();
        let div = tree.first_child(root).unwrap();
        let frag = tree.parse_fragment("<i>ok</i>");
        let mut range = Range::collapsed_at(div, 0);
        insert_tree_fragment_into_range(&mut tree, &mut range, frag, root).unwrap();
        assert_eq!(tree.inner_html(root), "<div><i>ok</i></div>");
    }

    #[test]
    fn test_insert_fragment_with_several_blocks() {
        let mut tree = tree_with("<div>abcd</div>");
        let root = tree.root();
        let text = text_at(&tree, &[0, 0]);
        let frag = tree.parse_fragment("<div>X</div><div>Y</div>");
        let mut range = Range::collapsed_at(text, 2);
        insert_tree_fragment_into_range(&mut tree, &mut range, frag, root).unwrap();
        assert_eq!(tree.inner_html(root), "<div>abX</div><div>Ycd</div>");
    }

    #[test]
    fn test_block_boundaries() {
        let tree = tree_with("<div>\u{200B}ab</div>");
        let root = tree.root();
        let text = text_at(&tree, &[0, 0]);
        assert!(range_does_start_at_block_boundary(&tree, &Range::collapsed_at(text, 1), root));
        assert!(!range_does_start_at_block_boundary(&tree, &Range::collapsed_at(text, 2), root));
        assert!(range_does_end_at_block_boundary(&tree, &Range::collapsed_at(text, 3), root));
        assert!(!range_does_end_at_block_boundary(&tree, &Range::collapsed_at(text, 2), root));
    }
}
