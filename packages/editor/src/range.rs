//! # Range
//!
//! A pair of boundary points over the document.
//!
//! ## Design
//!
//! - A `Range` is a plain value; it does not follow tree edits. Every
//!   algorithm that mutates the tree sets the range again afterwards
//! - Setters keep `start <= end`, collapsing the other end the way DOM
//!   ranges do
//! - Boundary order is decided on root-first ancestor chains

use std::cmp::Ordering;

use scribe_dom::{Document, NodeId};
use serde::{Deserialize, Serialize};

/// A position: before child `offset` of an element, or before character
/// `offset` of a text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    pub start: Boundary,
    pub end: Boundary,
}

fn chain(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let mut chain: Vec<NodeId> = doc.ancestors(node).collect();
    chain.reverse();
    chain.push(node);
    chain
}

/// Order of `a` relative to `b` in document order.
pub fn compare_points(doc: &Document, a: Boundary, b: Boundary) -> Ordering {
    if a.node == b.node {
        return a.offset.cmp(&b.offset);
    }
    let chain_a = chain(doc, a.node);
    let chain_b = chain(doc, b.node);
    if chain_a[0] != chain_b[0] {
        return a.node.cmp(&b.node);
    }
    let shared = chain_a
        .iter()
        .zip(chain_b.iter())
        .take_while(|(x, y)| x == y)
        .count();
    if shared == chain_a.len() {
        // a.node is an ancestor of b.node
        let index = doc.index_of(chain_b[shared]).unwrap_or(0);
        return if a.offset <= index {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }
    if shared == chain_b.len() {
        let index = doc.index_of(chain_a[shared]).unwrap_or(0);
        return if b.offset <= index {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    let ia = doc.index_of(chain_a[shared]).unwrap_or(0);
    let ib = doc.index_of(chain_b[shared]).unwrap_or(0);
    ia.cmp(&ib)
}

impl Range {
    pub fn collapsed_at(node: NodeId, offset: usize) -> Self {
        let point = Boundary::new(node, offset);
        Self {
            start: point,
            end: point,
        }
    }

    pub fn new(
        doc: &Document,
        start_container: NodeId,
        start_offset: usize,
        end_container: NodeId,
        end_offset: usize,
    ) -> Self {
        let mut range = Self::collapsed_at(start_container, start_offset);
        range.set_end(doc, end_container, end_offset);
        range
    }

    /// Range spanning all children (or characters) of `node`.
    pub fn of_contents(doc: &Document, node: NodeId) -> Self {
        Self {
            start: Boundary::new(node, 0),
            end: Boundary::new(node, doc.length(node)),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn set_start(&mut self, doc: &Document, node: NodeId, offset: usize) {
        self.start = Boundary::new(node, offset.min(doc.length(node)));
        if doc.tree_root(node) != doc.tree_root(self.end.node)
            || compare_points(doc, self.start, self.end) == Ordering::Greater
        {
            self.end = self.start;
        }
    }

    pub fn set_end(&mut self, doc: &Document, node: NodeId, offset: usize) {
        self.end = Boundary::new(node, offset.min(doc.length(node)));
        if doc.tree_root(node) != doc.tree_root(self.start.node)
            || compare_points(doc, self.start, self.end) == Ordering::Greater
        {
            self.start = self.end;
        }
    }

    pub fn set_start_before(&mut self, doc: &Document, node: NodeId) {
        if let (Some(parent), Some(index)) = (doc.parent(node), doc.index_of(node)) {
            self.set_start(doc, parent, index);
        }
    }

    pub fn set_start_after(&mut self, doc: &Document, node: NodeId) {
        if let (Some(parent), Some(index)) = (doc.parent(node), doc.index_of(node)) {
            self.set_start(doc, parent, index + 1);
        }
    }

    pub fn set_end_before(&mut self, doc: &Document, node: NodeId) {
        if let (Some(parent), Some(index)) = (doc.parent(node), doc.index_of(node)) {
            self.set_end(doc, parent, index);
        }
    }

    pub fn set_end_after(&mut self, doc: &Document, node: NodeId) {
        if let (Some(parent), Some(index)) = (doc.parent(node), doc.index_of(node)) {
            self.set_end(doc, parent, index + 1);
        }
    }

    pub fn collapse(&mut self, to_start: bool) {
        if to_start {
            self.end = self.start;
        } else {
            self.start = self.end;
        }
    }

    /// Select `node` itself; a parentless node selects its contents.
    pub fn select_node(&mut self, doc: &Document, node: NodeId) {
        *self = Self::node_extent(doc, node);
    }

    pub fn select_node_contents(&mut self, doc: &Document, node: NodeId) {
        *self = Self::of_contents(doc, node);
    }

    fn node_extent(doc: &Document, node: NodeId) -> Self {
        match (doc.parent(node), doc.index_of(node)) {
            (Some(parent), Some(index)) => Self {
                start: Boundary::new(parent, index),
                end: Boundary::new(parent, index + 1),
            },
            _ => Self::of_contents(doc, node),
        }
    }

    /// Deepest node containing both boundaries.
    pub fn common_ancestor(&self, doc: &Document) -> NodeId {
        let mut node = self.start.node;
        loop {
            if doc.contains(node, self.end.node) {
                return node;
            }
            match doc.parent(node) {
                Some(parent) => node = parent,
                None => return node,
            }
        }
    }

    /// Whether `node` lies inside the range. Exact containment needs the
    /// whole node between the boundaries; partial containment needs any
    /// overlap.
    pub fn contains_node(&self, doc: &Document, node: NodeId, partial: bool) -> bool {
        let extent = Self::node_extent(doc, node);
        if partial {
            compare_points(doc, self.start, extent.end) == Ordering::Less
                && compare_points(doc, self.end, extent.start) == Ordering::Greater
        } else {
            compare_points(doc, self.start, extent.start) != Ordering::Greater
                && compare_points(doc, self.end, extent.end) != Ordering::Less
        }
    }

    /// Concatenated character data between the boundaries.
    pub fn to_text(&self, doc: &Document) -> String {
        if self.is_collapsed() {
            return String::new();
        }
        let common = self.common_ancestor(doc);
        let mut nodes = vec![common];
        nodes.extend(doc.descendants(common));
        let mut out = String::new();
        for node in nodes {
            let Some(text) = doc.text(node) else {
                continue;
            };
            let (from, to) = self.text_span(doc, node, text.chars().count());
            if from < to {
                out.extend(text.chars().skip(from).take(to - from));
            }
        }
        out
    }

    fn text_span(&self, doc: &Document, node: NodeId, length: usize) -> (usize, usize) {
        let from = if self.start.node == node {
            self.start.offset
        } else if self.contains_node(doc, node, true) {
            0
        } else {
            length
        };
        let to = if self.end.node == node {
            self.end.offset
        } else if self.contains_node(doc, node, true) {
            length
        } else {
            0
        };
        (from.min(length), to.min(length))
    }

    /// Copy of the selected content as a new fragment; partially selected
    /// elements are cloned shallowly around their selected part.
    pub fn clone_contents(&self, doc: &mut Document) -> NodeId {
        let frag = doc.create_fragment();
        if self.is_collapsed() {
            return frag;
        }
        if self.start.node == self.end.node {
            if let Some(text) = doc.text(self.start.node) {
                let slice: String = text
                    .chars()
                    .skip(self.start.offset)
                    .take(self.end.offset - self.start.offset)
                    .collect();
                let copy = doc.create_text(slice);
                let _ = doc.append_child(frag, copy);
                return frag;
            }
        }
        let common = self.common_ancestor(doc);
        self.clone_children_into(doc, common, frag);
        frag
    }

    fn clone_children_into(&self, doc: &mut Document, node: NodeId, into: NodeId) {
        let children = doc.children(node).to_vec();
        for (index, child) in children.into_iter().enumerate() {
            let child_start = Boundary::new(node, index);
            let child_end = Boundary::new(node, index + 1);
            if compare_points(doc, self.end, child_start) != Ordering::Greater
                || compare_points(doc, self.start, child_end) != Ordering::Less
            {
                continue;
            }
            let copy = if let Some(text) = doc.text(child) {
                let length = text.chars().count();
                let from = if self.start.node == child { self.start.offset } else { 0 };
                let to = if self.end.node == child { self.end.offset } else { length };
                let slice: String = text.chars().skip(from).take(to.saturating_sub(from)).collect();
                doc.create_text(slice)
            } else if compare_points(doc, self.start, child_start) != Ordering::Greater
                && compare_points(doc, self.end, child_end) != Ordering::Less
            {
                doc.clone_node(child, true)
            } else {
                let shell = doc.clone_node(child, false);
                self.clone_children_into(doc, child, shell);
                shell
            };
            let _ = doc.append_child(into, copy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Document, NodeId) {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        doc.set_inner_html(root, "<p>abc<b>def</b></p><p>ghi</p>").unwrap();
        (doc, root)
    }

    #[test]
    fn test_compare_points() {
        let (doc, root) = fixture();
        let p = doc.first_child(root).unwrap();
        let abc = doc.first_child(p).unwrap();
        let ghi = doc.first_child(doc.last_child(root).unwrap()).unwrap();
        let at = Boundary::new;
        assert_eq!(compare_points(&doc, at(abc, 1), at(abc, 2)), Ordering::Less);
        assert_eq!(compare_points(&doc, at(p, 0), at(abc, 0)), Ordering::Less);
        assert_eq!(compare_points(&doc, at(p, 1), at(abc, 3)), Ordering::Greater);
        assert_eq!(compare_points(&doc, at(abc, 3), at(p, 1)), Ordering::Less);
        assert_eq!(compare_points(&doc, at(ghi, 0), at(abc, 3)), Ordering::Greater);
        assert_eq!(compare_points(&doc, at(root, 2), at(ghi, 3)), Ordering::Greater);
    }

    #[test]
    fn test_setters_keep_order() {
        let (doc, root) = fixture();
        let mut range = Range::collapsed_at(root, 1);
        range.set_start(&doc, root, 2);
        assert!(range.is_collapsed());
        assert_eq!(range.end, Boundary::new(root, 2));
        range.set_end(&doc, root, 0);
        assert_eq!(range.start, Boundary::new(root, 0));
    }

    #[test]
    fn test_containment() {
        let (doc, root) = fixture();
        let p = doc.first_child(root).unwrap();
        let abc = doc.first_child(p).unwrap();
        let range = Range::new(&doc, abc, 0, abc, 3);
        assert!(range.contains_node(&doc, abc, true));
        assert!(!range.contains_node(&doc, p, false));
        assert!(range.contains_node(&doc, p, true));
        assert!(!range.contains_node(&doc, doc.last_child(root).unwrap(), true));

        let whole = Range::of_contents(&doc, root);
        assert!(whole.contains_node(&doc, p, false));
    }

    #[test]
    fn test_common_ancestor() {
        let (doc, root) = fixture();
        let p = doc.first_child(root).unwrap();
        let abc = doc.first_child(p).unwrap();
        let def = doc.first_child(doc.last_child(p).unwrap()).unwrap();
        let ghi = doc.first_child(doc.last_child(root).unwrap()).unwrap();
        assert_eq!(Range::new(&doc, abc, 1, def, 1).common_ancestor(&doc), p);
        assert_eq!(Range::new(&doc, abc, 1, ghi, 1).common_ancestor(&doc), root);
        assert_eq!(Range::new(&doc, abc, 1, abc, 2).common_ancestor(&doc), abc);
    }

    #[test]
    fn test_clone_contents_and_text() {
        let (mut doc, root) = fixture();
        let p = doc.first_child(root).unwrap();
        let abc = doc.first_child(p).unwrap();
        let ghi = doc.first_child(doc.last_child(root).unwrap()).unwrap();
        let range = Range::new(&doc, abc, 1, ghi, 2);
        assert_eq!(range.to_text(&doc), "bcdefgh");
        let frag = range.clone_contents(&mut doc);
        assert_eq!(doc.inner_html(frag), "<p>bc<b>def</b></p><p>gh</p>");
        assert_eq!(doc.inner_html(root), "<p>abc<b>def</b></p><p>ghi</p>");
    }

    #[test]
    fn test_select_node() {
        let (doc, root) = fixture();
        let p = doc.last_child(root).unwrap();
        let mut range = Range::collapsed_at(root, 0);
        range.select_node(&doc, p);
        assert_eq!(range.start, Boundary::new(root, 1));
        assert_eq!(range.end, Boundary::new(root, 2));
        range.set_start_after(&doc, p);
        assert!(range.is_collapsed());
    }
}
