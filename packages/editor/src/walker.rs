//! # Tree Walker
//!
//! Filtered iteration over a subtree in pre-order, reverse pre-order and
//! reverse post-order.
//!
//! ## Design
//!
//! - The walker holds node ids only; the tree is passed to every step, so
//!   callers may mutate between steps and resume from any still-attached node
//! - A walk never leaves `root`, even when started on a node outside it
//! - Fragments are never yielded; the type mask selects elements and/or text

use scribe_dom::{NodeId, NodeKind};

use crate::tree::Tree;

pub const SHOW_ELEMENT: u32 = 1;
pub const SHOW_TEXT: u32 = 4;
pub const SHOW_ELEMENT_OR_TEXT: u32 = 5;

/// Acceptance predicate applied after the type mask.
pub type NodeFilter<'a> = Box<dyn Fn(&Tree, NodeId) -> bool + 'a>;

pub struct TreeWalker<'a> {
    root: NodeId,
    pub current: NodeId,
    show: u32,
    filter: Option<NodeFilter<'a>>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(root: NodeId, show: u32, filter: NodeFilter<'a>) -> Self {
        Self {
            root,
            current: root,
            show,
            filter: Some(filter),
        }
    }

    /// Walker accepting every node that matches the type mask.
    pub fn unfiltered(root: NodeId, show: u32) -> Self {
        Self {
            root,
            current: root,
            show,
            filter: None,
        }
    }

    pub fn starting_at(mut self, node: NodeId) -> Self {
        self.current = node;
        self
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn accepts(&self, tree: &Tree, node: NodeId) -> bool {
        let kind = match tree.kind(node) {
            NodeKind::Element(_) => SHOW_ELEMENT,
            NodeKind::Text(_) => SHOW_TEXT,
            NodeKind::Fragment => 0,
        };
        kind & self.show != 0 && self.filter.as_ref().map_or(true, |f| f(tree, node))
    }

    /// Next accepted node in document order.
    pub fn next_node(&mut self, tree: &Tree) -> Option<NodeId> {
        let mut current = self.current;
        loop {
            let mut node = tree.first_child(current);
            while node.is_none() {
                if current == self.root {
                    break;
                }
                node = tree.next_sibling(current);
                if node.is_none() {
                    match tree.parent(current) {
                        Some(parent) => current = parent,
                        None => break,
                    }
                }
            }
            let node = node?;
            if self.accepts(tree, node) {
                self.current = node;
                return Some(node);
            }
            current = node;
        }
    }

    /// Previous accepted node in document order.
    pub fn previous_node(&mut self, tree: &Tree) -> Option<NodeId> {
        let mut current = self.current;
        loop {
            if current == self.root {
                return None;
            }
            let node = match tree.previous_sibling(current) {
                Some(mut node) => {
                    while let Some(last) = tree.last_child(node) {
                        node = last;
                    }
                    node
                }
                None => tree.parent(current)?,
            };
            if self.accepts(tree, node) {
                self.current = node;
                return Some(node);
            }
            current = node;
        }
    }

    /// Previous accepted node in post-order: children are visited, last
    /// first, before the preceding siblings of their parent.
    pub fn previous_post_order(&mut self, tree: &Tree) -> Option<NodeId> {
        let mut current = self.current;
        loop {
            let mut node = tree.last_child(current);
            while node.is_none() {
                if current == self.root {
                    break;
                }
                node = tree.previous_sibling(current);
                if node.is_none() {
                    match tree.parent(current) {
                        Some(parent) => current = parent,
                        None => break,
                    }
                }
            }
            let node = node?;
            if self.accepts(tree, node) {
                self.current = node;
                return Some(node);
            }
            current = node;
        }
    }
}
