//! # Node Operations
//!
//! Small tree edits and predicates shared by the merge, split and clean
//! passes.
//!
//! ## Design
//!
//! - Detaching is [`Document::detach`]; it is a no-op on parentless nodes
//! - Likeness compares kind, tag, class and inline style; links never merge
//! - Attribute filters are ordered `(name, value)` pairs matched exactly

use scribe_dom::{Document, NodeId, NodeKind};

use crate::tree::Tree;

/// Move every child of `node` into a new fragment, in order.
pub fn empty(doc: &mut Document, node: NodeId) -> NodeId {
    let frag = doc.create_fragment();
    while let Some(child) = doc.first_child(node) {
        // The fragment is fresh and cannot be inside `child`.
        let _ = doc.append_child(frag, child);
    }
    frag
}

/// Whether two siblings may be merged into one.
pub fn are_alike(tree: &Tree, a: NodeId, b: NodeId) -> bool {
    if tree.is_leaf(a) {
        return false;
    }
    match (tree.kind(a), tree.kind(b)) {
        (NodeKind::Text(_), NodeKind::Text(_)) => true,
        (NodeKind::Fragment, NodeKind::Fragment) => true,
        (NodeKind::Element(x), NodeKind::Element(y)) => {
            x.tag == y.tag
                && x.tag != "a"
                && tree.class_name(a) == tree.class_name(b)
                && tree.style_text(a) == tree.style_text(b)
        }
        _ => false,
    }
}

pub fn has_tag_attributes(doc: &Document, node: NodeId, tag: &str, attributes: &[(String, String)]) -> bool {
    doc.has_tag(node, tag)
        && attributes
            .iter()
            .all(|(name, value)| doc.attr(node, name) == Some(value.as_str()))
}

/// Nearest of `node` and its ancestors below `root` matching the tag and attributes.
pub fn get_nearest(
    doc: &Document,
    node: NodeId,
    root: NodeId,
    tag: &str,
    attributes: &[(String, String)],
) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(n) = current {
        if n == root {
            return None;
        }
        if has_tag_attributes(doc, n, tag, attributes) {
            return Some(n);
        }
        current = doc.parent(n);
    }
    None
}

/// The node that starts at `offset` inside `node`; for an element past its
/// last child this is the next node after it in document order.
pub fn node_after_offset(doc: &Document, node: NodeId, offset: usize) -> Option<NodeId> {
    if doc.is_text(node) {
        return Some(node);
    }
    if let Some(child) = doc.child(node, offset) {
        return Some(child);
    }
    let mut current = Some(node);
    while let Some(n) = current {
        if let Some(next) = doc.next_sibling(n) {
            return Some(next);
        }
        current = doc.parent(n);
    }
    None
}

/// The deepest last node that ends at `offset` inside `node`.
pub fn node_before_offset(doc: &Document, node: NodeId, offset: usize) -> NodeId {
    let mut node = node;
    let mut offset = offset;
    while offset > 0 && !doc.is_text(node) {
        match doc.child(node, offset - 1) {
            Some(child) => {
                node = child;
                offset = doc.child_count(node);
            }
            None => break,
        }
    }
    node
}

/// New element with attributes and children appended in order.
pub fn create_element<K: AsRef<str>, V: AsRef<str>>(
    doc: &mut Document,
    tag: &str,
    attributes: &[(K, V)],
    children: &[NodeId],
) -> NodeId {
    let element = doc.create_element_with(tag, attributes);
    for child in children {
        let _ = doc.append_child(element, *child);
    }
    element
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
    fn test_empty_moves_children() {
        let mut tree = tree_with("<p>a<b>b</b></p>");
        let p = tree.first_child(tree.root()).unwrap();
        let frag = empty(&mut tree, p);
        assert_eq!(tree.child_count(p), 0);
        assert_eq!(tree.inner_html(frag), "a<b>b</b>");
    }

    #[test]
    fn test_are_alike() {
        let tree = tree_with(
            "<b class=\"x\">1</b><b class=\"x\">2</b><b>3</b><a href=\"u\">4</a><a href=\"u\">5</a><br><br>",
        );
        let c: Vec<NodeId> = tree.children(tree.root()).to_vec();
        assert!(are_alike(&tree, c[0], c[1]));
        assert!(!are_alike(&tree, c[1], c[2]));
        assert!(!are_alike(&tree, c[3], c[4]));
        assert!(!are_alike(&tree, c[5], c[6]));
        let t1 = tree.first_child(c[0]).unwrap();
        let t2 = tree.first_child(c[1]).unwrap();
        assert!(are_alike(&tree, t1, t2));
        assert!(!are_alike(&tree, t1, c[2]));
    }

    #[test]
    fn test_get_nearest_stops_at_root() {
        let tree = tree_with("<a href=\"x\"><b>t</b></a>");
        let root = tree.root();
        let a = tree.first_child(root).unwrap();
        let text = tree.first_child(tree.first_child(a).unwrap()).unwrap();
        let href = vec![("href".to_string(), "x".to_string())];
        assert_eq!(get_nearest(&tree, text, root, "a", &href), Some(a));
        assert_eq!(get_nearest(&tree, text, root, "a", &[]), Some(a));
        let other = vec![("href".to_string(), "y".to_string())];
        assert_eq!(get_nearest(&tree, text, root, "a", &other), None);
        assert_eq!(get_nearest(&tree, text, root, "div", &[]), None);
    }

    #[test]
    fn test_offset_lookups() {
        let tree = tree_with("<p>ab<i>c</i></p><p>d</p>");
        let root = tree.root();
        let p = tree.first_child(root).unwrap();
        let second = tree.last_child(root).unwrap();
        let i = tree.last_child(p).unwrap();
        assert_eq!(node_after_offset(&tree, p, 1), Some(i));
        assert_eq!(node_after_offset(&tree, p, 2), Some(second));
        assert_eq!(node_after_offset(&tree, second, 1), None);

        let c = tree.first_child(i).unwrap();
        assert_eq!(node_before_offset(&tree, p, 2), c);
        assert_eq!(node_before_offset(&tree, p, 0), p);
    }
}
