//! # Link Detection
//!
//! Finds URLs and e-mail addresses in plain text and wraps them in `<a>`.
//! Offsets handed to the tree are in characters; the regex reports bytes.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use scribe_dom::NodeId;
use tracing::debug;

use crate::errors::EditorResult;
use crate::node_ops::get_nearest;
use crate::tree::Tree;
use crate::walker::{TreeWalker, SHOW_TEXT};

/// Group 1 is a URL, group 2 an e-mail address.
pub static LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(?:((?:(?:ht|f)tps?://|www\d{0,3}[.]|[a-z0-9][a-z0-9.\-]*[.][a-z]{2,}/)(?:[^\s()<>]+|\([^\s()<>]+\))+(?:[^\s?&`!()\[\]{};:'".,<>«»“”‘’]|\([^\s()<>]+\)))|([\w\-.%+]+@(?:[\w\-]+\.)+[a-z]{2,}\b(?:[?][^&?\s]+=[^\s?&`!()\[\]{};:'".,<>«»“”‘’]+(?:&[^&?\s]+=[^\s?&`!()\[\]{};:'".,<>«»“”‘’]+)*)?))"#,
    )
    .unwrap()
});

static HAS_SCHEME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(?:ht|f)tps?:").unwrap());

/// A detected link, in character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMatch {
    pub start: usize,
    pub end: usize,
    pub href: String,
}

fn href_for(caps: &Captures<'_>) -> String {
    match caps.get(1) {
        Some(url) if HAS_SCHEME.is_match(url.as_str()) => url.as_str().to_string(),
        Some(url) => format!("http://{}", url.as_str()),
        None => format!("mailto:{}", &caps[0]),
    }
}

/// First link in `text`.
pub fn find_link(text: &str) -> Option<LinkMatch> {
    let caps = LINK_REGEX.captures(text)?;
    let whole = caps.get(0)?;
    let start = text[..whole.start()].chars().count();
    Some(LinkMatch {
        start,
        end: start + whole.as_str().chars().count(),
        href: href_for(&caps),
    })
}

/// Whether the whole of `text` is one link.
pub fn is_link(text: &str) -> bool {
    LINK_REGEX
        .find(text)
        .is_some_and(|m| m.start() == 0 && m.end() == text.len())
}

fn make_link(tree: &mut Tree, text: &str, href: &str, attributes: &[(String, String)]) -> EditorResult<NodeId> {
    let mut pairs = vec![("href".to_string(), href.to_string())];
    pairs.extend(attributes.iter().filter(|(name, _)| name != "href").cloned());
    let link = tree.create_element_with("a", &pairs);
    let label = tree.create_text(text);
    tree.append_child(link, label)?;
    Ok(link)
}

/// Wrap every link in the text under `search_in` that is not already
/// inside an `<a>`.
pub fn add_detected_links(
    tree: &mut Tree,
    search_in: NodeId,
    root: NodeId,
    attributes: &[(String, String)],
) -> EditorResult<()> {
    let mut walker = TreeWalker::new(
        search_in,
        SHOW_TEXT,
        Box::new(move |t: &Tree, n| get_nearest(t, n, root, "a", &[]).is_none()),
    );
    let mut count = 0usize;
    while let Some(node) = walker.next_node(tree) {
        let Some(parent) = tree.parent(node) else {
            continue;
        };
        let mut data = tree.text(node).unwrap_or_default().to_string();
        while let Some(found) = find_link(&data) {
            let chars: Vec<char> = data.chars().collect();
            if found.start > 0 {
                let before: String = chars[..found.start].iter().collect();
                let before = tree.create_text(before);
                tree.insert_before(parent, before, Some(node))?;
            }
            let label: String = chars[found.start..found.end].iter().collect();
            let link = make_link(tree, &label, &found.href, attributes)?;
            tree.insert_before(parent, link, Some(node))?;
            data = chars[found.end..].iter().collect();
            tree.set_text(node, &data)?;
            count += 1;
        }
    }
    if count > 0 {
        debug!(count, "Linked detected URLs");
    }
    Ok(())
}

/// Link the word that ends at `offset` in `text_node`, as done after typing
/// a space. Returns the index where the remaining text started, so a caret
/// in `text_node` can be shifted back by it.
pub fn linkify_text(
    tree: &mut Tree,
    text_node: NodeId,
    offset: usize,
    root: NodeId,
    attributes: &[(String, String)],
) -> EditorResult<Option<usize>> {
    if get_nearest(tree, text_node, root, "a", &[]).is_some() {
        return Ok(None);
    }
    let Some(parent) = tree.parent(text_node) else {
        return Ok(None);
    };
    let chars: Vec<char> = tree.text(text_node).unwrap_or_default().chars().collect();
    let offset = offset.min(chars.len());
    let search_from = chars[..offset]
        .iter()
        .rposition(|c| *c == ' ' || *c == '\u{a0}')
        .map_or(0, |i| i + 1);
    let search_text: String = chars[search_from..offset].iter().collect();
    let Some(found) = find_link(&search_text) else {
        return Ok(None);
    };
    let start = search_from + found.start;
    let end = search_from + found.end;
    if start > 0 {
        let before: String = chars[..start].iter().collect();
        let before = tree.create_text(before);
        tree.insert_before(parent, before, Some(text_node))?;
    }
    let label: String = chars[start..end].iter().collect();
    let link = make_link(tree, &label, &found.href, attributes)?;
    tree.insert_before(parent, link, Some(text_node))?;
    let rest: String = chars[end..].iter().collect();
    tree.set_text(text_node, &rest)?;
    Ok(Some(end))
}
