//! # Merge and Split
//!
//! Structural rebalancing used by every editing command.
//!
//! ## Design
//!
//! - [`split`] walks upwards without recursion, cloning each ancestor
//!   shallowly until the stop node
//! - [`merge_inlines`] tracks the caller's range in a local copy while
//!   siblings disappear, then writes it back
//! - [`fix_container`] wraps the leading and trailing inline runs of a
//!   container in default blocks

use scribe_dom::NodeId;
use tracing::debug;

use crate::errors::{EditorError, EditorResult};
use crate::node_ops::{are_alike, empty, get_nearest};
use crate::range::{Boundary, Range};
use crate::tree::Tree;
use crate::whitespace::fix_cursor;

/// Where to split: a character or child offset, or before a child node
/// (`None` meaning after the last child).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitAt {
    Offset(usize),
    Node(Option<NodeId>),
}

/// Split `node` at `at` and every ancestor up to (not including) `stop`.
/// Returns the first node after the split point among `stop`'s children.
pub fn split(
    tree: &mut Tree,
    node: NodeId,
    at: SplitAt,
    stop: NodeId,
    root: NodeId,
) -> EditorResult<Option<NodeId>> {
    let mut node = node;
    let mut at = at;
    loop {
        if tree.is_text(node) && node != stop {
            let SplitAt::Offset(offset) = at else {
                return Err(EditorError::InvalidSplitOffset(node));
            };
            let Some(parent) = tree.parent(node) else {
                return Err(EditorError::Detached(node));
            };
            let after = tree.split_text(node, offset)?;
            node = parent;
            at = SplitAt::Node(Some(after));
            continue;
        }
        let after = match at {
            SplitAt::Offset(offset) => tree.child(node, offset),
            SplitAt::Node(after) => after,
        };
        let parent = match tree.parent(node) {
            Some(parent) if node != stop && tree.is_element(node) => parent,
            _ => return Ok(after),
        };

        let clone = tree.clone_node(node, false);
        let mut next = after;
        while let Some(child) = next {
            next = tree.next_sibling(child);
            tree.append_child(clone, child)?;
        }
        if tree.has_tag(node, "ol") && get_nearest(tree, node, root, "blockquote", &[]).is_some() {
            let start = tree
                .attr(node, "start")
                .and_then(|s| s.trim().parse::<i64>().ok())
                .filter(|s| *s != 0)
                .unwrap_or(1);
            let renumbered = start + tree.child_count(node) as i64 - 1;
            tree.set_attr(clone, "start", &renumbered.to_string());
        }
        fix_cursor(tree, node)?;
        fix_cursor(tree, clone)?;
        let reference = tree.next_sibling(node);
        tree.insert_before(parent, clone, reference)?;

        node = parent;
        at = SplitAt::Node(Some(clone));
    }
}

fn merge_inlines_inner(tree: &mut Tree, node: NodeId, fake: &mut Range) -> EditorResult<()> {
    let mut frags: Vec<NodeId> = Vec::new();
    let mut l = tree.child_count(node);
    while l > 0 {
        l -= 1;
        let Some(child) = tree.child(node, l) else {
            continue;
        };
        let prev = if l > 0 { tree.child(node, l - 1) } else { None };
        match prev {
            Some(prev) if tree.is_inline(child) && are_alike(tree, child, prev) => {
                let prev_length = tree.length(prev);
                for point in [&mut fake.start, &mut fake.end] {
                    if point.node == child {
                        point.node = prev;
                        point.offset += prev_length;
                    } else if point.node == node {
                        if point.offset > l {
                            point.offset -= 1;
                        } else if point.offset == l {
                            *point = Boundary::new(prev, prev_length);
                        }
                    }
                }
                tree.detach(child);
                match tree.text(child).map(str::to_string) {
                    Some(data) => tree.append_text(prev, &data)?,
                    None => frags.push(empty(tree, child)),
                }
            }
            _ => {
                if tree.is_element(child) {
                    while let Some(frag) = frags.pop() {
                        tree.append_child(child, frag)?;
                    }
                    merge_inlines_inner(tree, child, fake)?;
                }
            }
        }
    }
    Ok(())
}

/// Merge adjacent alike inline siblings throughout `node`, keeping `range`
/// on the same characters.
pub fn merge_inlines(tree: &mut Tree, node: NodeId, range: &mut Range) -> EditorResult<()> {
    let element = if tree.is_text(node) {
        match tree.parent(node) {
            Some(parent) => parent,
            None => return Ok(()),
        }
    } else {
        node
    };
    if !tree.is_element(element) {
        return Ok(());
    }
    let mut fake = *range;
    merge_inlines_inner(tree, element, &mut fake)?;
    *range = fake;
    Ok(())
}

/// Append the contents of `next` to `block`, discarding the wrappers that
/// held only `next`, and collapse `range` at the junction.
pub fn merge_with_block(
    tree: &mut Tree,
    block: NodeId,
    next: NodeId,
    range: &mut Range,
    root: NodeId,
) -> EditorResult<()> {
    let mut container = next;
    while let Some(parent) = tree.parent(container) {
        if parent == root || !tree.is_element(parent) || tree.child_count(parent) != 1 {
            break;
        }
        container = parent;
    }
    tree.detach(container);

    let mut offset = tree.child_count(block);
    if let Some(last) = tree.last_child(block).filter(|l| tree.has_tag(*l, "br")) {
        tree.detach(last);
        offset -= 1;
    }
    let contents = empty(tree, next);
    tree.append_child(block, contents)?;
    *range = Range::collapsed_at(block, offset);
    merge_inlines(tree, block, range)
}

/// Merge `node` into an alike previous sibling, repeating for its first
/// child. A list item starting with a nested list gets a blank line first.
pub fn merge_containers(tree: &mut Tree, node: NodeId, root: NodeId) -> EditorResult<()> {
    let mut node = node;
    loop {
        let prev = tree.previous_sibling(node);
        let first = tree.first_child(node);
        let is_list_item = tree.has_tag(node, "li");
        if is_list_item && !first.is_some_and(|f| tree.has_tag(f, "ol") || tree.has_tag(f, "ul")) {
            return Ok(());
        }
        match prev {
            Some(prev) if are_alike(tree, prev, node) => {
                if !tree.is_container(prev) {
                    if !is_list_item {
                        return Ok(());
                    }
                    let contents = empty(tree, prev);
                    let block = tree.create_default_block(&[contents])?;
                    tree.append_child(prev, block)?;
                }
                tree.detach(node);
                let needs_fix = !tree.is_container(node);
                let contents = empty(tree, node);
                tree.append_child(prev, contents)?;
                if needs_fix {
                    fix_container(tree, prev, root)?;
                }
                debug!(into = %prev, "Merged containers");
                match first {
                    Some(first) => node = first,
                    None => return Ok(()),
                }
            }
            _ => {
                if is_list_item {
                    let block = tree.create_default_block(&[])?;
                    tree.insert_before(node, block, first)?;
                }
                return Ok(());
            }
        }
    }
}

/// Wrap the leading and trailing runs of inline children of a container
/// (or of the root, or a fragment) in default blocks.
pub fn fix_container(tree: &mut Tree, container: NodeId, root: NodeId) -> EditorResult<NodeId> {
    if !(tree.is_container(container) || container == root || tree.is_fragment(container)) {
        return Ok(container);
    }
    let children = tree.children(container).to_vec();
    let leading: Vec<NodeId> = children
        .iter()
        .copied()
        .take_while(|c| tree.is_inline(*c))
        .collect();
    let mut trailing: Vec<NodeId> = children[leading.len()..]
        .iter()
        .rev()
        .copied()
        .take_while(|c| tree.is_inline(*c))
        .collect();
    trailing.reverse();

    if !leading.is_empty() {
        let block = tree.create_default_block(&leading)?;
        tree.prepend_child(container, block)?;
    }
    if !trailing.is_empty() {
        let block = tree.create_default_block(&trailing)?;
        tree.append_child(container, block)?;
    }
    Ok(container)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with(html: &str) -> Tree {
        let mut tree = Tree::new("div");
        let root = tree.root();
        tree.set_inner_html(root, html).unwrap();
        tree
    }

    #[test]
    fn test_split_text_then_merge_round_trip() {
        let mut tree = tree_with("<p>abcdef</p>");
        let root = tree.root();
        let p = tree.first_child(root).unwrap();
        let text = tree.first_child(p).unwrap();
        let after = split(&mut tree, text, SplitAt::Offset(3), p, root).unwrap().unwrap();
        assert_eq!(tree.text(after), Some("def"));
        assert_eq!(tree.child_count(p), 2);

        let mut range = Range::collapsed_at(after, 0);
        merge_inlines(&mut tree, p, &mut range).unwrap();
        assert_eq!(tree.inner_html(root), "<p>abcdef</p>");
        assert_eq!(range.start, Boundary::new(text, 3));
    }

    #[test]
    fn test_split_up_to_root() {
        let mut tree = tree_with("<div>ab<b>cd</b></div>");
        let root = tree.root();
        let div = tree.first_child(root).unwrap();
        let b = tree.last_child(div).unwrap();
        let cd = tree.first_child(b).unwrap();
        let after = split(&mut tree, cd, SplitAt::Offset(1), root, root).unwrap().unwrap();
        assert_eq!(tree.inner_html(root), "<div>ab<b>c</b></div><div><b>d</b></div>");
        assert_eq!(tree.child(root, 1), Some(after));
    }

    #[test]
    fn test_split_at_end_leaves_empty_focusable_clone() {
        let mut tree = tree_with("<div>ab</div>");
        let root = tree.root();
        let div = tree.first_child(root).unwrap();
        let after = split(&mut tree, div, SplitAt::Offset(1), root, root).unwrap();
        assert_eq!(tree.inner_html(root), "<div>ab</div><div><br></div>");
        assert_eq!(after, tree.child(root, 1));
    }

    #[test]
    fn test_split_errors() {
        let mut tree = tree_with("<div>ab</div>");
        let root = tree.root();
        let text = tree.first_child(tree.first_child(root).unwrap()).unwrap();
        let err = split(&mut tree, text, SplitAt::Node(None), root, root).unwrap_err();
        assert!(matches!(err, EditorError::InvalidSplitOffset(_)));

        let loose = tree.create_text("xy");
        let err = split(&mut tree, loose, SplitAt::Offset(1), root, root).unwrap_err();
        assert!(matches!(err, EditorError::Detached(_)));
    }

    #[test]
    fn test_split_renumbers_quoted_list() {
        let mut tree = tree_with("<blockquote><ol start=\"3\"><li>a</li><li>b</li></ol></blockquote>");
        let root = tree.root();
        let quote = tree.first_child(root).unwrap();
        let ol = tree.first_child(quote).unwrap();
        split(&mut tree, ol, SplitAt::Offset(1), quote, root).unwrap();
        let clone = tree.last_child(quote).unwrap();
        assert_eq!(tree.attr(clone, "start"), Some("3"));
    }

    #[test]
    fn test_merge_inlines_moves_range() {
        let mut tree = tree_with("<div><b>ab</b><b>cd</b></div>");
        let root = tree.root();
        let div = tree.first_child(root).unwrap();
        let second = tree.last_child(div).unwrap();
        let cd = tree.first_child(second).unwrap();
        let mut range = Range::collapsed_at(cd, 1);
        merge_inlines(&mut tree, div, &mut range).unwrap();
        assert_eq!(tree.inner_html(root), "<div><b>abcd</b></div>");
        let text = tree.first_child(tree.first_child(div).unwrap()).unwrap();
        assert_eq!(range.start, Boundary::new(text, 3));
    }

    #[test]
    fn test_merge_with_block() {
        let mut tree = tree_with("<div>ab<br></div><blockquote><div>cd</div></blockquote>");
        let root = tree.root();
        let first = tree.first_child(root).unwrap();
        let next = tree.first_child(tree.last_child(root).unwrap()).unwrap();
        let mut range = Range::collapsed_at(root, 0);
        merge_with_block(&mut tree, first, next, &mut range, root).unwrap();
        assert_eq!(tree.inner_html(root), "<div>abcd</div>");
        let text = tree.first_child(first).unwrap();
        assert_eq!(range.start, Boundary::new(text, 2));
    }

    #[test]
    fn test_merge_containers() {
        let mut tree = tree_with("<ul><li>a</li></ul><ul><li>b</li></ul>");
        let root = tree.root();
        let second = tree.last_child(root).unwrap();
        merge_containers(&mut tree, second, root).unwrap();
        assert_eq!(tree.inner_html(root), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn test_fix_container_wraps_edge_runs() {
        let mut tree = tree_with("a<b>b</b><div>mid</div>c");
        let root = tree.root();
        fix_container(&mut tree, root, root).unwrap();
        assert_eq!(
            tree.inner_html(root),
            "<div>a<b>b</b></div><div>mid</div><div>c</div>"
        );
    }
}
