//! # Clipboard
//!
//! Serializes a selection for cut and copy, and decides what a paste or
//! drop carries.
//!
//! ## Design
//!
//! - [`ClipboardData`] is the host's transfer object, reduced to ordered
//!   `(mime type, data)` items
//! - Copied markup is wrapped in shallow clones of the ancestors between the
//!   selection and its block, so inline formatting survives the trip
//! - A copy that is a single text run is written as plain text only
//! - Paste routing prefers images, then HTML, then plain text; holding
//!   Shift asks for plain text

use scribe_dom::NodeId;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::Hooks;
use crate::errors::{EditorError, EditorResult};
use crate::range::Range;
use crate::range_ops::{delete_contents, end_block, move_boundaries_down, move_boundaries_up, start_block, text_contents};
use crate::tree::Tree;

pub const TEXT_HTML: &str = "text/html";
pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_URI_LIST: &str = "text/uri-list";
pub const TEXT_RTF: &str = "text/rtf";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardItem {
    pub mime_type: String,
    pub data: String,
}

impl ClipboardItem {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardData {
    pub items: Vec<ClipboardItem>,
}

impl ClipboardData {
    pub fn new(items: Vec<ClipboardItem>) -> Self {
        Self { items }
    }

    /// Store `data` under `mime_type`, replacing any earlier value.
    pub fn set_data(&mut self, mime_type: &str, data: impl Into<String>) {
        let data = data.into();
        match self.items.iter_mut().find(|i| i.mime_type == mime_type) {
            Some(item) => item.data = data,
            None => self.items.push(ClipboardItem::new(mime_type, data)),
        }
    }

    pub fn get_data(&self, mime_type: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|i| i.mime_type == mime_type)
            .map(|i| i.data.as_str())
    }

    pub fn types(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.mime_type.as_str()).collect()
    }

    pub fn has_type(&self, mime_type: &str) -> bool {
        self.items.iter().any(|i| i.mime_type == mime_type)
    }
}

/// Write the selection to `clipboard`, optionally removing it from the
/// document. Returns `false` when there is no clipboard to write to.
#[instrument(skip_all, fields(remove = remove))]
pub fn extract_range_to_clipboard(
    tree: &mut Tree,
    clipboard: Option<&mut ClipboardData>,
    range: &mut Range,
    root: NodeId,
    remove: bool,
    hooks: &Hooks,
    is_win: bool,
) -> EditorResult<bool> {
    let Some(clipboard) = clipboard else {
        return Ok(false);
    };
    let mut text = if hooks.to_plain_text.is_some() {
        String::new()
    } else {
        text_contents(tree, range)
    };

    let start = start_block(tree, range, root);
    let end = end_block(tree, range, root);
    let common = range.common_ancestor(tree);
    let copy_root = match (start, end) {
        (Some(s), Some(e)) if s == e && tree.contains(s, common) => s,
        _ => root,
    };

    let (mut contents, working) = if remove {
        let frag = delete_contents(tree, range, root)?;
        (frag, *range)
    } else {
        let mut copy = *range;
        move_boundaries_down(tree, &mut copy);
        move_boundaries_up(tree, &mut copy, Some(copy_root), Some(copy_root), root);
        (copy.clone_contents(tree), copy)
    };

    let mut parent = Some(working.common_ancestor(tree));
    if let Some(p) = parent.filter(|p| tree.is_text(*p)) {
        parent = tree.parent(p);
    }
    while let Some(p) = parent.filter(|p| *p != copy_root) {
        let wrapper = tree.clone_node(p, false);
        tree.append_child(wrapper, contents)?;
        contents = wrapper;
        parent = tree.parent(p);
    }

    let single_text = tree.child_count(contents) == 1
        && tree.first_child(contents).is_some_and(|c| tree.is_text(c));
    let mut html = None;
    if single_text {
        let only = tree.first_child(contents).ok_or(EditorError::invariant("copied text vanished"))?;
        text = tree.text(only).unwrap_or_default().replace('\u{a0}', " ");
    } else {
        let holder = tree.create_element("div");
        tree.append_child(holder, contents)?;
        let mut markup = tree.inner_html(holder);
        if let Some(clean) = &hooks.will_cut_copy {
            markup = clean(&markup);
        }
        html = Some(markup);
    }
    if let (Some(to_plain), Some(markup)) = (&hooks.to_plain_text, &html) {
        text = to_plain(markup);
    }
    if is_win {
        text = text.replace("\r\n", "\n").replace('\n', "\r\n");
    }

    if let Some(markup) = html.filter(|m| !m.is_empty() && *m != text) {
        clipboard.set_data(TEXT_HTML, markup);
    }
    clipboard.set_data(TEXT_PLAIN, text);
    debug!(types = ?clipboard.types(), "Wrote selection to clipboard");
    Ok(true)
}

/// What a paste inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteRoute {
    /// Handed to `pasteImage` listeners
    Image(Vec<ClipboardItem>),
    Html(String),
    Text(String),
    Nothing,
}

/// Pick the item a paste should insert. Among several items of one kind
/// the first wins.
pub fn route_paste(data: &ClipboardData, choose_plain: bool) -> PasteRoute {
    let mut html = None;
    let mut plain = None;
    let mut has_rtf = false;
    let mut has_image = false;
    for item in &data.items {
        match item.mime_type.as_str() {
            TEXT_HTML => {
                html.get_or_insert(item);
            }
            TEXT_PLAIN | TEXT_URI_LIST => {
                plain.get_or_insert(item);
            }
            TEXT_RTF => has_rtf = true,
            _ if item.is_image() => has_image = true,
            _ => {}
        }
    }
    if has_image && !(has_rtf && html.is_some()) {
        let images = data.items.iter().filter(|i| i.is_image()).cloned().collect();
        return PasteRoute::Image(images);
    }
    match (html, plain) {
        (Some(html), plain) if !choose_plain || plain.is_none() => PasteRoute::Html(html.data.clone()),
        (_, Some(plain)) => PasteRoute::Text(plain.data.clone()),
        _ => PasteRoute::Nothing,
    }
}

/// Whether a drop carrying `types` should snapshot the document first.
/// Drops of anything but markup or plain text are left to the host.
pub fn drop_needs_snapshot(types: &[&str]) -> bool {
    types.iter().all(|t| *t == TEXT_HTML || *t == TEXT_PLAIN)
        && types.iter().any(|t| *t == TEXT_HTML || *t == TEXT_PLAIN)
}
