//! # Markup Sanitizer
//!
//! Turns untrusted HTML into a detached fragment that is safe to insert.
//!
//! ## Design
//!
//! - The host may inject its own [`Sanitizer`] through the config hooks
//! - [`DefaultSanitizer`] works on a denylist: forbidden elements go with
//!   their content unless `keep_content` is set
//! - Document wrappers (`html`, `body`) are unwrapped and `head` is dropped,
//!   so pasting a whole page yields its body
//! - Event-handler attributes and script URLs are removed from what remains

use scribe_dom::{Document, DomResult, NodeId};
use tracing::{debug, instrument};

const DEFAULT_FORBIDDEN: &[&str] = &[
    "area", "audio", "body", "dialog", "dir", "font", "frameset", "fencedframe", "head", "html",
    "iframe", "map", "marque", "meta", "object", "portal", "slot", "source", "template", "track",
    "video", "xmp", "script", "style", "noscript",
];

const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction", "xlink:href"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// Unwrap forbidden elements instead of dropping their content
    pub keep_content: bool,
    /// Lower-case tag names that may not appear in the output
    pub forbidden_tags: Vec<String>,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            keep_content: false,
            forbidden_tags: DEFAULT_FORBIDDEN.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl SanitizeOptions {
    pub fn forbids(&self, tag: &str) -> bool {
        self.forbidden_tags.iter().any(|t| t == tag)
    }
}

/// Parses and scrubs HTML into a parentless fragment owned by `doc`.
pub trait Sanitizer {
    fn sanitize(&self, doc: &mut Document, html: &str, options: &SanitizeOptions) -> DomResult<NodeId>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSanitizer;

impl Sanitizer for DefaultSanitizer {
    #[instrument(skip_all, fields(bytes = html.len()))]
    fn sanitize(&self, doc: &mut Document, html: &str, options: &SanitizeOptions) -> DomResult<NodeId> {
        let frag = doc.parse_fragment(html);
        let mut stack: Vec<NodeId> = doc.children(frag).iter().rev().copied().collect();
        let mut dropped = 0usize;
        while let Some(node) = stack.pop() {
            let Some(tag) = doc.tag(node).map(str::to_string) else {
                continue;
            };
            match tag.as_str() {
                "html" | "body" => {
                    stack.extend(doc.children(node).iter().rev().copied());
                    unwrap(doc, node)?;
                }
                "head" => {
                    doc.detach(node);
                    dropped += 1;
                }
                _ if options.forbids(&tag) => {
                    dropped += 1;
                    if options.keep_content {
                        stack.extend(doc.children(node).iter().rev().copied());
                        unwrap(doc, node)?;
                    } else {
                        doc.detach(node);
                    }
                }
                _ => {
                    scrub_attributes(doc, node);
                    stack.extend(doc.children(node).iter().rev().copied());
                }
            }
        }
        if dropped > 0 {
            debug!(dropped, "Removed forbidden elements");
        }
        Ok(frag)
    }
}

/// Replace `node` by its children.
fn unwrap(doc: &mut Document, node: NodeId) -> DomResult<()> {
    let Some(parent) = doc.parent(node) else {
        return Ok(());
    };
    for child in doc.children(node).to_vec() {
        doc.insert_before(parent, child, Some(node))?;
    }
    doc.detach(node);
    Ok(())
}

fn is_script_url(tag: &str, name: &str, value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    if compact.starts_with("javascript:") || compact.starts_with("vbscript:") {
        return true;
    }
    compact.starts_with("data:") && !(tag == "img" && name == "src" && compact.starts_with("data:image/"))
}

fn scrub_attributes(doc: &mut Document, node: NodeId) {
    let tag = doc.tag(node).unwrap_or_default().to_string();
    let unsafe_names: Vec<String> = doc
        .attributes(node)
        .iter()
        .filter(|(name, value)| {
            name.starts_with("on")
                || (URL_ATTRIBUTES.contains(&name.as_str()) && is_script_url(&tag, name, value))
        })
        .map(|(name, _)| name.clone())
        .collect();
    for name in unsafe_names {
        doc.remove_attr(node, &name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(html: &str, options: &SanitizeOptions) -> String {
        let mut doc = Document::new();
        let frag = DefaultSanitizer.sanitize(&mut doc, html, options).unwrap();
        doc.inner_html(frag)
    }

    #[test]
    fn test_whole_page_yields_body() {
        let html = "<html><head><title>t</title></head><body><p>hi</p></body></html>";
        assert_eq!(sanitize(html, &SanitizeOptions::default()), "<p>hi</p>");
    }

    #[test]
    fn test_forbidden_elements_dropped_with_content() {
        let html = "<p>a<script>alert(1)</script><font color=\"red\">b</font>c</p>";
        assert_eq!(sanitize(html, &SanitizeOptions::default()), "<p>ac</p>");
    }

    #[test]
    fn test_keep_content_unwraps() {
        let options = SanitizeOptions {
            keep_content: true,
            ..SanitizeOptions::default()
        };
        assert_eq!(sanitize("<p>a<font>b</font>c</p>", &options), "<p>abc</p>");
    }

    #[test]
    fn test_event_handlers_and_script_urls_removed() {
        let html = "<a href=\" JavaScript:go()\" onclick=\"x()\" title=\"t\">l</a><img src=\"data:image/png;base64,AA\" onerror=\"y()\">";
        assert_eq!(
            sanitize(html, &SanitizeOptions::default()),
            "<a title=\"t\">l</a><img src=\"data:image/png;base64,AA\">"
        );
    }
}
