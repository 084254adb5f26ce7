//! # HTML Fragment Parser
//!
//! Builds a detached fragment from markup, with the subset of HTML tree
//! construction rules that editing content relies on.
//!
//! ## Design
//!
//! - Tokens come from [`HtmlToken`]; tags are split by [`scan_tag`]
//! - Void elements never take children
//! - Block starts implicitly close an open `p`; `li`, `dd`/`dt`, `tr` and
//!   `td`/`th` close their open siblings
//! - Raw text elements (`script`, `style`, ...) swallow everything up to their
//!   end tag
//! - Unmatched end tags are ignored; comments and doctypes are dropped
//! - Adjacent text is merged into one node

use logos::Logos;

use crate::entities;
use crate::lexer::{end_tag_name, scan_tag, HtmlToken, TagToken};
use crate::node::{Document, NodeId};

pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title", "xmp"];

const CLOSES_P: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "hr",
    "li", "dd", "dt", "main", "menu", "nav", "ol", "p", "pre", "section", "table", "ul",
];

const SCOPE_BOUNDARIES: &[&str] = &["table", "td", "th", "caption", "button", "object", "template"];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

struct TreeBuilder<'doc> {
    doc: &'doc mut Document,
    /// Open elements; the fragment is always at the bottom
    stack: Vec<NodeId>,
}

impl TreeBuilder<'_> {
    fn current(&self) -> NodeId {
        // The fragment is never popped.
        self.stack[self.stack.len() - 1]
    }

    fn text(&mut self, data: &str) {
        if data.is_empty() {
            return;
        }
        let parent = self.current();
        if let Some(last) = self.doc.last_child(parent) {
            if self.doc.is_text(last) {
                // `last` is a text node, so this cannot fail.
                let _ = self.doc.append_text(last, data);
                return;
            }
        }
        let node = self.doc.create_text(data);
        self.doc.push_child(parent, node);
    }

    /// Pop up to and including the nearest open element named in `targets`,
    /// unless one of `boundaries` is reached first.
    fn close_open(&mut self, targets: &[&str], boundaries: &[&str]) {
        for depth in (1..self.stack.len()).rev() {
            let tag = self.doc.tag(self.stack[depth]).unwrap_or("");
            if targets.contains(&tag) {
                self.stack.truncate(depth);
                return;
            }
            if boundaries.contains(&tag) {
                return;
            }
        }
    }

    fn start(&mut self, tag: &TagToken) {
        let name = tag.name.as_str();
        if CLOSES_P.contains(&name) {
            self.close_open(&["p"], SCOPE_BOUNDARIES);
        }
        match name {
            "li" => self.close_open(&["li"], &["ul", "ol", "table", "td", "th"]),
            "dd" | "dt" => self.close_open(&["dd", "dt"], &["dl", "table", "td", "th"]),
            "tr" => self.close_open(&["tr"], &["table", "tbody", "thead", "tfoot"]),
            "td" | "th" => self.close_open(&["td", "th"], &["tr", "table"]),
            "tbody" | "thead" | "tfoot" => {
                self.close_open(&["tbody", "thead", "tfoot"], &["table"])
            }
            _ => {}
        }

        let attributes: Vec<(String, String)> = tag
            .attributes
            .iter()
            .map(|(n, v)| (n.clone(), entities::decode(v).into_owned()))
            .collect();
        let element = self.doc.create_element_with(name, &attributes);
        let parent = self.current();
        self.doc.push_child(parent, element);
        if !is_void(name) {
            self.stack.push(element);
        }
    }

    fn end(&mut self, name: &str) {
        for depth in (1..self.stack.len()).rev() {
            if self.doc.has_tag(self.stack[depth], name) {
                self.stack.truncate(depth);
                return;
            }
        }
    }
}

/// Parse `html` into a new parentless fragment owned by `doc`.
pub fn parse_fragment(doc: &mut Document, html: &str) -> NodeId {
    let fragment = doc.create_fragment();
    let mut builder = TreeBuilder {
        doc,
        stack: vec![fragment],
    };
    let mut lexer = HtmlToken::lexer(html);

    while let Some(token) = lexer.next() {
        match token {
            Ok(HtmlToken::Text(text)) => builder.text(&entities::decode(text)),
            Ok(HtmlToken::Lt) => builder.text("<"),
            Ok(HtmlToken::Comment(_))
            | Ok(HtmlToken::Doctype)
            | Ok(HtmlToken::ProcessingInstruction) => {}
            Ok(HtmlToken::StartTag(raw)) => {
                let tag = scan_tag(raw);
                builder.start(&tag);
                if is_raw_text(&tag.name) {
                    let rest = lexer.remainder();
                    let close = format!("</{}", tag.name);
                    let end = rest
                        .to_ascii_lowercase()
                        .find(&close)
                        .unwrap_or(rest.len());
                    let body = &rest[..end];
                    if matches!(tag.name.as_str(), "textarea" | "title") {
                        builder.text(&entities::decode(body));
                    } else {
                        builder.text(body);
                    }
                    lexer.bump(end);
                }
            }
            Ok(HtmlToken::EndTag(raw)) => builder.end(&end_tag_name(raw)),
            Err(()) => builder.text(lexer.slice()),
        }
    }

    fragment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> String {
        let mut doc = Document::new();
        let frag = parse_fragment(&mut doc, html);
        doc.inner_html(frag)
    }

    #[test]
    fn test_nested_inline() {
        assert_eq!(parse("<div>a<b>b<i>c</i></b></div>"), "<div>a<b>b<i>c</i></b></div>");
    }

    #[test]
    fn test_void_elements() {
        assert_eq!(parse("<div>a<br>b<img src=x></div>"), "<div>a<br>b<img src=\"x\"></div>");
    }

    #[test]
    fn test_implied_paragraph_close() {
        assert_eq!(parse("<p>one<p>two<div>x</div>"), "<p>one</p><p>two</p><div>x</div>");
    }

    #[test]
    fn test_implied_list_item_close() {
        assert_eq!(
            parse("<ul><li>a<li>b<ul><li>c</ul></ul>"),
            "<ul><li>a</li><li>b<ul><li>c</li></ul></li></ul>"
        );
    }

    #[test]
    fn test_unmatched_end_tag_is_ignored() {
        assert_eq!(parse("a</b>c"), "ac");
    }

    #[test]
    fn test_comments_and_doctype_dropped() {
        assert_eq!(parse("<!DOCTYPE html><!-- x -->text"), "text");
    }

    #[test]
    fn test_raw_text_element() {
        assert_eq!(
            parse("<style>b > i { color: red }</style>x"),
            "<style>b > i { color: red }</style>x"
        );
    }

    #[test]
    fn test_entities_decoded() {
        let mut doc = Document::new();
        let frag = parse_fragment(&mut doc, "a&nbsp;&amp;b");
        let text = doc.first_child(frag).unwrap();
        assert_eq!(doc.text(text), Some("a\u{a0}&b"));
    }
}
