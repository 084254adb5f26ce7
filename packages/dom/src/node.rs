//! # Document Tree
//!
//! Ordered, mutable tree of text, element and fragment nodes.
//!
//! ## Design
//!
//! - Nodes live in an arena owned by [`Document`] and are addressed by [`NodeId`]
//! - A parent link is a back-reference only; detaching keeps the node alive so it
//!   can be grafted elsewhere
//! - [`Document::release`] frees a subtree; its slots are reused and the
//!   generation in every old [`NodeId`] stops matching
//! - Text offsets count `char`s, not bytes
//! - Every child-list edit bumps [`Document::structure_version`]
//! - Edits inside the observed subtree are recorded as [`ChangeKind`]s
//!
//! Ids are only meaningful for the document that issued them; passing an id from
//! another document is a logic error and panics on lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomError, DomResult};
use crate::{parser, serializer, style};

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Tag name and attributes of an element node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementData {
    /// Lower-case tag name
    pub tag: String,
    /// Attributes in insertion order, keys unique
    pub attributes: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn set(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    fn remove(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|(n, _)| n != name);
        before != self.attributes.len()
    }
}

/// Discriminant of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Text(String),
    Element(ElementData),
    Fragment,
}

/// Coarse classification of a tree edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    ChildList,
    Attributes,
    CharacterData,
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    generation: u32,
}

/// Arena holding every node created for one editing surface.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<NodeData>,
    free: Vec<usize>,
    structure_version: u64,
    observed: Option<NodeId>,
    records: Vec<ChangeKind>,
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index]
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.nodes[index];
            slot.kind = kind;
            slot.parent = None;
            slot.children.clear();
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.nodes.len();
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            generation: 0,
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Whether `id` still names a node that has not been released.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.index)
            .is_some_and(|slot| slot.generation == id.generation)
    }

    /// Detach a node and free it together with its subtree. Released slots are
    /// handed out again by later creations; stale ids are ignored.
    pub fn release(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let slot = &mut self.nodes[node.index];
            stack.append(&mut slot.children);
            slot.parent = None;
            slot.kind = NodeKind::Fragment;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node.index);
        }
        if self.observed.is_some_and(|root| !self.is_alive(root)) {
            self.observed = None;
        }
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData::new(tag)))
    }

    /// Create an element with attributes; later duplicates of a key win.
    pub fn create_element_with<K, V>(&mut self, tag: &str, attributes: &[(K, V)]) -> NodeId
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut data = ElementData::new(tag);
        for (name, value) in attributes {
            data.set(&name.as_ref().to_ascii_lowercase(), value.as_ref());
        }
        self.push(NodeKind::Element(data))
    }

    pub fn create_text(&mut self, data: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(data.into()))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.push(NodeKind::Fragment)
    }

    /// Copy a node. A deep clone copies the whole subtree; the copy is parentless.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> NodeId {
        let kind = self.data(id).kind.clone();
        let copy = self.push(kind);
        if deep {
            let children = self.data(id).children.clone();
            for child in children {
                let child_copy = self.clone_node(child, true);
                self.data_mut(child_copy).parent = Some(copy);
                self.data_mut(copy).children.push(child_copy);
            }
        }
        copy
    }

    // ------------------------------------------------------------------
    // Kind queries
    // ------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.data(id).kind
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.data(id).kind, NodeKind::Text(_))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id).kind, NodeKind::Element(_))
    }

    pub fn is_fragment(&self, id: NodeId) -> bool {
        matches!(self.data(id).kind, NodeKind::Fragment)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.data(id).kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Lower-case tag name of an element.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id).is_some_and(|t| t.eq_ignore_ascii_case(tag))
    }

    /// DOM-style node name: `#text`, `#document-fragment` or the tag.
    pub fn node_name(&self, id: NodeId) -> &str {
        match &self.data(id).kind {
            NodeKind::Text(_) => "#text",
            NodeKind::Fragment => "#document-fragment",
            NodeKind::Element(data) => &data.tag,
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.data(id).children.get(index).copied()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.data(id).children.len()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).children.last().copied()
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).iter().copied().find(|c| self.is_element(*c))
    }

    pub fn last_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).iter().rev().copied().find(|c| self.is_element(*c))
    }

    /// Position of a node among its parent's children.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.data(id).parent?;
        self.data(parent).children.iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.data(id).parent?;
        let index = self.index_of(id)?;
        self.child(parent, index + 1)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.data(id).parent?;
        let index = self.index_of(id)?;
        index.checked_sub(1).and_then(|i| self.child(parent, i))
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut node = self.next_sibling(id);
        while let Some(n) = node {
            if self.is_element(n) {
                return Some(n);
            }
            node = self.next_sibling(n);
        }
        None
    }

    /// Boundary length: characters for text, children otherwise.
    pub fn length(&self, id: NodeId) -> usize {
        match &self.data(id).kind {
            NodeKind::Text(text) => text.chars().count(),
            _ => self.data(id).children.len(),
        }
    }

    /// Inclusive ancestry test.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.data(n).parent;
        }
        false
    }

    /// Ancestors from the parent upwards.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.data(id).parent,
        }
    }

    /// Topmost ancestor (the node itself when parentless).
    pub fn tree_root(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Descendants in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Descendant elements with the given tag, in document order.
    pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|n| self.has_tag(*n, tag))
            .collect()
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        match &self.data(id).kind {
            NodeKind::Text(text) => text.clone(),
            _ => self
                .descendants(id)
                .into_iter()
                .filter_map(|n| self.text(n))
                .collect(),
        }
    }

    // ------------------------------------------------------------------
    // Child list edits
    // ------------------------------------------------------------------

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let first = self.first_child(parent);
        self.insert_before(parent, child, first)
    }

    /// Insert `child` before `reference` (or at the end). Inserting a fragment
    /// moves its children and leaves it empty.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        if self.is_text(parent) {
            return Err(DomError::hierarchy(parent, child, "text nodes have no children"));
        }
        if let Some(r) = reference {
            if self.data(r).parent != Some(parent) {
                return Err(DomError::not_a_child(parent, r));
            }
        }
        if self.is_fragment(child) {
            if reference.is_some_and(|r| self.contains(child, r)) {
                return Err(DomError::hierarchy(parent, child, "reference is inside the fragment"));
            }
            let moved = self.data(child).children.clone();
            for node in moved {
                self.insert_before(parent, node, reference)?;
            }
            return Ok(());
        }
        if self.contains(child, parent) {
            return Err(DomError::hierarchy(parent, child, "node would contain itself"));
        }
        let reference = if reference == Some(child) {
            self.next_sibling(child)
        } else {
            reference
        };
        self.detach(child);
        let index = match reference {
            Some(r) => self.index_of(r).unwrap_or(self.child_count(parent)),
            None => self.child_count(parent),
        };
        self.data_mut(parent).children.insert(index, child);
        self.data_mut(child).parent = Some(parent);
        self.structure_version += 1;
        self.record(parent, ChangeKind::ChildList);
        Ok(())
    }

    /// Append a freshly created, parentless node. Used by the parser, which
    /// never produces cycles.
    pub(crate) fn push_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.data(child).parent.is_none());
        self.data_mut(parent).children.push(child);
        self.data_mut(child).parent = Some(parent);
        self.structure_version += 1;
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        if self.data(child).parent != Some(parent) {
            return Err(DomError::not_a_child(parent, child));
        }
        Ok(self.detach(child))
    }

    /// Remove a node from its parent; no-op when already parentless.
    pub fn detach(&mut self, id: NodeId) -> NodeId {
        if let Some(parent) = self.data(id).parent {
            self.data_mut(parent).children.retain(|c| *c != id);
            self.data_mut(id).parent = None;
            self.structure_version += 1;
            self.record(parent, ChangeKind::ChildList);
        }
        id
    }

    pub fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> DomResult<()> {
        if self.data(old).parent != Some(parent) {
            return Err(DomError::not_a_child(parent, old));
        }
        if new == old {
            return Ok(());
        }
        let next = self.next_sibling(old);
        self.detach(old);
        self.insert_before(parent, new, next)
    }

    /// Put `new` where `old` is; no-op when `old` has no parent.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) -> DomResult<()> {
        match self.data(old).parent {
            Some(parent) => self.replace_child(parent, new, old),
            None => Ok(()),
        }
    }

    /// Remove every child of a node.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = self.data(id).children.clone();
        for child in children {
            self.detach(child);
        }
    }

    /// Merge adjacent text nodes and drop empty ones throughout a subtree.
    pub fn normalize(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let mut index = 0;
            while let Some(child) = self.child(node, index) {
                if let Some(text) = self.text(child) {
                    if text.is_empty() {
                        self.detach(child);
                        continue;
                    }
                    while let Some(next) = self.next_sibling(child) {
                        let Some(more) = self.text(next).map(str::to_string) else {
                            break;
                        };
                        self.detach(next);
                        if let NodeKind::Text(data) = &mut self.data_mut(child).kind {
                            data.push_str(&more);
                        }
                        self.record(child, ChangeKind::CharacterData);
                    }
                } else {
                    stack.push(child);
                }
                index += 1;
            }
        }
    }

    // ------------------------------------------------------------------
    // Character data
    // ------------------------------------------------------------------

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.data(id).kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn char_at(&self, id: NodeId, offset: usize) -> Option<char> {
        self.text(id).and_then(|t| t.chars().nth(offset))
    }

    fn text_mut(&mut self, id: NodeId) -> DomResult<&mut String> {
        match &mut self.data_mut(id).kind {
            NodeKind::Text(text) => Ok(text),
            _ => Err(DomError::NotText(id)),
        }
    }

    pub fn set_text(&mut self, id: NodeId, data: &str) -> DomResult<()> {
        *self.text_mut(id)? = data.to_string();
        self.record(id, ChangeKind::CharacterData);
        Ok(())
    }

    pub fn append_text(&mut self, id: NodeId, data: &str) -> DomResult<()> {
        self.text_mut(id)?.push_str(data);
        self.record(id, ChangeKind::CharacterData);
        Ok(())
    }

    pub fn insert_text(&mut self, id: NodeId, offset: usize, data: &str) -> DomResult<()> {
        self.replace_text(id, offset, 0, data)
    }

    pub fn delete_text(&mut self, id: NodeId, offset: usize, count: usize) -> DomResult<()> {
        self.replace_text(id, offset, count, "")
    }

    /// Replace `count` characters at `offset`; `count` is clamped to the end.
    pub fn replace_text(
        &mut self,
        id: NodeId,
        offset: usize,
        count: usize,
        data: &str,
    ) -> DomResult<()> {
        let text = self.text_mut(id)?;
        let length = text.chars().count();
        if offset > length {
            return Err(DomError::index_size(id, offset, length));
        }
        let start = byte_offset(text, offset);
        let end = byte_offset(text, offset + count.min(length - offset));
        text.replace_range(start..end, data);
        self.record(id, ChangeKind::CharacterData);
        Ok(())
    }

    /// Split a text node at `offset`; the tail becomes the next sibling.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> DomResult<NodeId> {
        let text = self.text_mut(id)?;
        let length = text.chars().count();
        if offset > length {
            return Err(DomError::index_size(id, offset, length));
        }
        let tail = text.split_off(byte_offset(text, offset));
        self.record(id, ChangeKind::CharacterData);
        let new = self.create_text(tail);
        if let Some(parent) = self.parent(id) {
            let next = self.next_sibling(id);
            self.insert_before(parent, new, next)?;
        }
        Ok(new)
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.get(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        self.element(id).map(|e| e.attributes.as_slice()).unwrap_or(&[])
    }

    /// Set an attribute; ignored on non-elements.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        if let NodeKind::Element(data) = &mut self.data_mut(id).kind {
            data.set(&name, value);
            self.record(id, ChangeKind::Attributes);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeKind::Element(data) = &mut self.data_mut(id).kind {
            if data.remove(name) {
                self.record(id, ChangeKind::Attributes);
            }
        }
    }

    pub fn class_name(&self, id: NodeId) -> &str {
        self.attr(id, "class").unwrap_or("")
    }

    /// Whitespace separated entries of the `class` attribute.
    pub fn class_list(&self, id: NodeId) -> Vec<&str> {
        self.class_name(id).split_ascii_whitespace().collect()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.class_name(id).split_ascii_whitespace().any(|c| c == class)
    }

    /// Set the class attribute, removing it when empty.
    pub fn set_class_name(&mut self, id: NodeId, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.remove_attr(id, "class");
        } else {
            self.set_attr(id, "class", value);
        }
    }

    pub fn style_text(&self, id: NodeId) -> &str {
        self.attr(id, "style").unwrap_or("")
    }

    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        style::parse_declarations(self.style_text(id))
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(property))
            .map(|(_, value)| value)
    }

    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: &str) {
        let mut declarations = style::parse_declarations(self.style_text(id));
        let property = property.to_ascii_lowercase();
        match declarations.iter_mut().find(|(name, _)| *name == property) {
            Some(entry) => entry.1 = value.trim().to_string(),
            None => declarations.push((property, value.trim().to_string())),
        }
        self.write_style(id, &declarations);
    }

    pub fn remove_style_property(&mut self, id: NodeId, property: &str) {
        let mut declarations = style::parse_declarations(self.style_text(id));
        let before = declarations.len();
        declarations.retain(|(name, _)| !name.eq_ignore_ascii_case(property));
        if declarations.len() != before {
            self.write_style(id, &declarations);
        }
    }

    fn write_style(&mut self, id: NodeId, declarations: &[(String, String)]) {
        if declarations.is_empty() {
            self.remove_attr(id, "style");
        } else {
            let text = style::serialize_declarations(declarations);
            self.set_attr(id, "style", &text);
        }
    }

    // ------------------------------------------------------------------
    // HTML
    // ------------------------------------------------------------------

    /// Parse markup into a new detached fragment.
    pub fn parse_fragment(&mut self, html: &str) -> NodeId {
        parser::parse_fragment(self, html)
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        serializer::serialize_children(self, id)
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        serializer::serialize_node(self, id)
    }

    /// Replace all children of `id` with the parsed markup. The old children
    /// are released.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> DomResult<()> {
        let fragment = self.parse_fragment(html);
        for child in self.children(id).to_vec() {
            self.release(child);
        }
        self.append_child(id, fragment)?;
        self.release(fragment);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Change tracking
    // ------------------------------------------------------------------

    /// Counter bumped on every child-list change anywhere in the arena.
    pub fn structure_version(&self) -> u64 {
        self.structure_version
    }

    /// Record changes made inside `root` from now on.
    pub fn observe(&mut self, root: NodeId) {
        self.observed = Some(root);
        self.records.clear();
    }

    pub fn disconnect(&mut self) {
        self.observed = None;
        self.records.clear();
    }

    pub fn has_records(&self) -> bool {
        !self.records.is_empty()
    }

    /// Drain pending change records.
    pub fn take_records(&mut self) -> Vec<ChangeKind> {
        std::mem::take(&mut self.records)
    }

    fn record(&mut self, target: NodeId, kind: ChangeKind) {
        let Some(root) = self.observed else {
            return;
        };
        if !self.records.contains(&kind) && self.contains(root, target) {
            self.records.push(kind);
        }
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }
}

/// Iterator over a node's ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn div_with_text(doc: &mut Document, text: &str) -> (NodeId, NodeId) {
        let div = doc.create_element("DIV");
        let t = doc.create_text(text);
        doc.append_child(div, t).unwrap();
        (div, t)
    }

    #[test]
    fn test_tags_are_lower_case() {
        let mut doc = Document::new();
        let el = doc.create_element("BLOCKQUOTE");
        assert_eq!(doc.tag(el), Some("blockquote"));
        assert!(doc.has_tag(el, "BLOCKQUOTE"));
    }

    #[test]
    fn test_append_moves_node() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let t = doc.create_text("x");
        doc.append_child(a, t).unwrap();
        doc.append_child(b, t).unwrap();
        assert_eq!(doc.child_count(a), 0);
        assert_eq!(doc.parent(t), Some(b));
    }

    #[test]
    fn test_fragment_insertion_moves_children() {
        let mut doc = Document::new();
        let frag = doc.create_fragment();
        let one = doc.create_text("1");
        let two = doc.create_text("2");
        doc.append_child(frag, one).unwrap();
        doc.append_child(frag, two).unwrap();
        let (div, existing) = div_with_text(&mut doc, "0");
        doc.insert_before(div, frag, Some(existing)).unwrap();
        assert_eq!(doc.children(div), &[one, two, existing]);
        assert_eq!(doc.child_count(frag), 0);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner).unwrap();
        let err = doc.append_child(inner, outer).unwrap_err();
        assert!(matches!(err, DomError::HierarchyRequest { .. }));
    }

    #[test]
    fn test_split_text_counts_chars() {
        let mut doc = Document::new();
        let (div, t) = div_with_text(&mut doc, "héllo");
        let tail = doc.split_text(t, 2).unwrap();
        assert_eq!(doc.text(t), Some("hé"));
        assert_eq!(doc.text(tail), Some("llo"));
        assert_eq!(doc.children(div), &[t, tail]);
        assert!(doc.split_text(t, 9).is_err());
    }

    #[test]
    fn test_replace_text_clamps_count() {
        let mut doc = Document::new();
        let t = doc.create_text("abc");
        doc.replace_text(t, 1, 10, "Z").unwrap();
        assert_eq!(doc.text(t), Some("aZ"));
    }

    #[test]
    fn test_style_properties() {
        let mut doc = Document::new();
        let span = doc.create_element("span");
        doc.set_style_property(span, "color", "red");
        doc.set_style_property(span, "font-size", "12px");
        assert_eq!(doc.style_text(span), "color: red; font-size: 12px;");
        doc.remove_style_property(span, "color");
        doc.remove_style_property(span, "font-size");
        assert!(!doc.has_attr(span, "style"));
    }

    #[test]
    fn test_normalize_merges_text() {
        let mut doc = Document::new();
        let (div, first) = div_with_text(&mut doc, "a");
        let empty = doc.create_text("");
        let second = doc.create_text("b");
        doc.append_child(div, empty).unwrap();
        doc.append_child(div, second).unwrap();
        doc.normalize(div);
        assert_eq!(doc.children(div), &[first]);
        assert_eq!(doc.text(first), Some("ab"));
    }

    #[test]
    fn test_records_only_inside_observed_root() {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        doc.observe(root);
        let loose = doc.create_element("p");
        let t = doc.create_text("x");
        doc.append_child(loose, t).unwrap();
        assert!(!doc.has_records());
        doc.append_child(root, loose).unwrap();
        doc.set_text(t, "y").unwrap();
        assert_eq!(
            doc.take_records(),
            vec![ChangeKind::ChildList, ChangeKind::CharacterData]
        );
        assert!(!doc.has_records());
    }

    #[test]
    fn test_release_reuses_slots() {
        let mut doc = Document::new();
        let (div, t) = div_with_text(&mut doc, "a");
        assert_eq!(doc.node_count(), 2);
        doc.release(div);
        assert_eq!(doc.node_count(), 0);
        assert!(!doc.is_alive(div));
        assert!(!doc.is_alive(t));
        let fresh = doc.create_element("p");
        assert!(doc.is_alive(fresh));
        assert_ne!(fresh, div);
        assert_ne!(fresh, t);
        assert_eq!(doc.node_count(), 1);
        doc.release(t);
        assert_eq!(doc.node_count(), 1);
    }

    #[test]
    fn test_set_inner_html_releases_old_children() {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        doc.set_inner_html(root, "<p>one</p><p>two</p>").unwrap();
        let count = doc.node_count();
        let old = doc.first_child(root).unwrap();
        for _ in 0..100 {
            doc.set_inner_html(root, "<p>one</p><p>two</p>").unwrap();
        }
        assert_eq!(doc.node_count(), count);
        assert!(!doc.is_alive(old));
        assert_eq!(doc.inner_html(root), "<p>one</p><p>two</p>");
    }

    #[test]
    fn test_structure_version_ignores_text_edits() {
        let mut doc = Document::new();
        let (_, t) = div_with_text(&mut doc, "a");
        let version = doc.structure_version();
        doc.append_text(t, "b").unwrap();
        assert_eq!(doc.structure_version(), version);
        doc.detach(t);
        assert!(doc.structure_version() > version);
    }
}
