//! # Editable Tree
//!
//! [`Tree`] pairs the [`Document`] with the editable root and the node
//! classifier every algorithm consults.
//!
//! ## Design
//!
//! - Classification is memoized per node in [`NodeClassifier`]
//! - The cache is dropped in bulk whenever the document's structure version
//!   moves, and can be reset explicitly
//! - `Tree` derefs to `Document`, so primitive edits read the same as queries

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use scribe_dom::{Document, NodeId, NodeKind};
use serde::Serialize;

use crate::errors::EditorResult;
use crate::walker::{TreeWalker, SHOW_ELEMENT};
use crate::whitespace::fix_cursor;

pub const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "b", "bdi", "bdo", "br", "cite", "code", "data", "del", "dfn", "em",
    "font", "hr", "i", "iframe", "img", "input", "ins", "kbd", "q", "rp", "rt", "ruby", "s",
    "samp", "small", "span", "strike", "strong", "sub", "sup", "time", "u", "var", "wbr",
];

/// Void elements that never merge and never hold the caret.
pub const LEAF_TAGS: &[&str] = &["br", "hr", "iframe", "img", "input"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeCategory {
    Unknown,
    Inline,
    Block,
    Container,
}

/// Memoized node categories.
#[derive(Debug, Default)]
pub struct NodeClassifier {
    cache: RefCell<HashMap<NodeId, NodeCategory>>,
    version: Cell<u64>,
}

impl NodeClassifier {
    pub fn classify(&self, doc: &Document, node: NodeId) -> NodeCategory {
        match doc.kind(node) {
            NodeKind::Text(_) => return NodeCategory::Inline,
            NodeKind::Element(_) | NodeKind::Fragment => {}
        }
        if self.version.get() != doc.structure_version() {
            self.reset();
            self.version.set(doc.structure_version());
        }
        if let Some(category) = self.cache.borrow().get(&node) {
            return *category;
        }
        let category = if !doc
            .children(node)
            .iter()
            .all(|c| self.classify(doc, *c) == NodeCategory::Inline)
        {
            NodeCategory::Container
        } else if doc.tag(node).is_some_and(|t| INLINE_TAGS.contains(&t)) {
            NodeCategory::Inline
        } else {
            NodeCategory::Block
        };
        self.cache.borrow_mut().insert(node, category);
        category
    }

    pub fn reset(&self) {
        self.cache.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }
}

/// The document, its editable root and the paragraph defaults.
#[derive(Debug)]
pub struct Tree {
    doc: Document,
    root: NodeId,
    classifier: NodeClassifier,
    pub block_tag: String,
    pub block_attributes: Vec<(String, String)>,
    pub cant_focus_empty_text_nodes: bool,
}

impl Deref for Tree {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.doc
    }
}

impl DerefMut for Tree {
    fn deref_mut(&mut self) -> &mut Document {
        &mut self.doc
    }
}

impl Tree {
    /// Create a document with an empty `div` root.
    pub fn new(block_tag: &str) -> Self {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        Self {
            doc,
            root,
            classifier: NodeClassifier::default(),
            block_tag: block_tag.to_ascii_lowercase(),
            block_attributes: Vec::new(),
            cant_focus_empty_text_nodes: false,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn classifier(&self) -> &NodeClassifier {
        &self.classifier
    }

    pub fn category(&self, node: NodeId) -> NodeCategory {
        self.classifier.classify(&self.doc, node)
    }

    pub fn reset_cache(&self) {
        self.classifier.reset();
    }

    pub fn is_inline(&self, node: NodeId) -> bool {
        self.category(node) == NodeCategory::Inline
    }

    pub fn is_block(&self, node: NodeId) -> bool {
        self.category(node) == NodeCategory::Block
    }

    pub fn is_container(&self, node: NodeId) -> bool {
        self.category(node) == NodeCategory::Container
    }

    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.tag(node).is_some_and(|t| LEAF_TAGS.contains(&t))
    }

    /// Visible content: non-whitespace text or an image.
    pub fn is_content(&self, node: NodeId) -> bool {
        match self.text(node) {
            Some(text) => not_ws(text),
            None => self.has_tag(node, "img"),
        }
    }

    pub fn is_empty_block(&self, block: NodeId) -> bool {
        self.text_content(block).is_empty() && self.elements_by_tag(block, "img").is_empty()
    }

    /// Walker over the block-level elements under `root`, positioned at `node`.
    pub fn block_walker(&self, node: NodeId, root: NodeId) -> TreeWalker<'static> {
        let mut walker = TreeWalker::new(root, SHOW_ELEMENT, Box::new(|t: &Tree, n| t.is_block(n)));
        walker.current = node;
        walker
    }

    pub fn next_block(&self, node: NodeId, root: NodeId) -> Option<NodeId> {
        self.block_walker(node, root)
            .next_node(self)
            .filter(|b| *b != root)
    }

    pub fn previous_block(&self, node: NodeId, root: NodeId) -> Option<NodeId> {
        self.block_walker(node, root)
            .previous_node(self)
            .filter(|b| *b != root)
    }

    /// New paragraph element holding `children`, made focusable.
    pub fn create_default_block(&mut self, children: &[NodeId]) -> EditorResult<NodeId> {
        let tag = self.block_tag.clone();
        let attributes = self.block_attributes.clone();
        let block = self.doc.create_element_with(&tag, &attributes);
        for child in children {
            self.doc.append_child(block, *child)?;
        }
        fix_cursor(self, block)
    }

    pub fn is_block_tag(&self, node: NodeId) -> bool {
        self.has_tag(node, &self.block_tag)
    }
}

/// True when `text` holds anything other than tab, space, CR or LF.
pub fn not_ws(text: &str) -> bool {
    text.chars().any(|c| !matches!(c, ' ' | '\t' | '\r' | '\n'))
}
