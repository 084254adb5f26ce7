//! # Focus Placeholders
//!
//! Keeps every editable node able to hold the caret, and decides which line
//! breaks carry meaning.
//!
//! ## Design
//!
//! - An empty inline element gets an empty text node, or U+200B where the
//!   host cannot focus empty text
//! - An empty block gets a trailing `<br>`
//! - The editable root always holds at least one default block

use scribe_dom::NodeId;

use crate::errors::EditorResult;
use crate::tree::{not_ws, Tree};
use crate::walker::{TreeWalker, SHOW_ELEMENT_OR_TEXT, SHOW_TEXT};

/// Zero-width space used as a focus placeholder.
pub const ZWS: char = '\u{200B}';

/// Make `node` focusable. Returns the node. Fragments are left as they are.
pub fn fix_cursor(tree: &mut Tree, node: NodeId) -> EditorResult<NodeId> {
    if tree.is_text(node) || tree.is_fragment(node) {
        return Ok(node);
    }
    if node == tree.root() {
        match tree.first_child(node) {
            None => {
                let block = tree.create_default_block(&[])?;
                tree.append_child(node, block)?;
            }
            Some(first) if tree.has_tag(first, "br") => {
                tree.detach(first);
                let block = tree.create_default_block(&[])?;
                tree.prepend_child(node, block)?;
            }
            Some(_) => {}
        }
        return Ok(node);
    }
    if tree.is_inline(node) {
        if tree.is_leaf(node) {
            return Ok(node);
        }
        let mut child = tree.first_child(node);
        if tree.cant_focus_empty_text_nodes {
            while let Some(c) = child.filter(|c| tree.text(*c) == Some("")) {
                tree.detach(c);
                child = tree.first_child(node);
            }
        }
        if child.is_none() {
            let fixer = if tree.cant_focus_empty_text_nodes {
                tree.create_text(ZWS.to_string())
            } else {
                tree.create_text("")
            };
            tree.append_child(node, fixer)?;
        }
    } else if tree.is_block(node)
        && tree.is_empty_block(node)
        && tree.elements_by_tag(node, "br").is_empty()
    {
        let br = tree.create_element("br");
        tree.append_child(node, br)?;
    }
    Ok(node)
}

/// Whether `br` ends a line with content after it, or, with
/// `if_empty_block`, is the only thing holding its block open.
pub fn is_line_break(tree: &Tree, br: NodeId, if_empty_block: bool) -> bool {
    let mut block = tree.parent(br).unwrap_or(br);
    while tree.is_inline(block) {
        match tree.parent(block) {
            Some(parent) => block = parent,
            None => break,
        }
    }
    let mut walker = TreeWalker::new(
        block,
        SHOW_ELEMENT_OR_TEXT,
        Box::new(|t: &Tree, n| match t.text(n) {
            Some(text) => not_ws(text),
            None => t.has_tag(n, "br"),
        }),
    )
    .starting_at(br);
    if walker.next_node(tree).is_some() {
        return true;
    }
    walker.current = br;
    if_empty_block && walker.previous_node(tree).is_none()
}

/// Strip placeholders under `root`, removing inline wrappers they leave
/// empty. Text directly inside `keep` is left alone.
pub fn remove_zws(tree: &mut Tree, root: NodeId, keep: Option<NodeId>) {
    let mut walker = TreeWalker::unfiltered(root, SHOW_TEXT);
    while let Some(text_node) = walker.next_node(tree) {
        if keep.is_some_and(|k| tree.parent(text_node) == Some(k)) {
            continue;
        }
        while let Some(index) = tree
            .text(text_node)
            .and_then(|t| t.chars().position(|c| c == ZWS))
        {
            if tree.length(text_node) > 1 {
                let _ = tree.delete_text(text_node, index, 1);
                continue;
            }
            let mut node = text_node;
            while let Some(parent) = tree.parent(node) {
                tree.detach(node);
                walker.current = parent;
                if parent == root || !tree.is_inline(parent) || tree.length(parent) > 0 {
                    break;
                }
                node = parent;
            }
            break;
        }
    }
}
