//! HTML tokenizer using logos
//!
//! Tags are matched as whole tokens; attribute scanning happens afterwards in
//! [`scan_tag`] so quoted `>` characters never end a tag early.

use logos::{Lexer, Logos};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlToken<'src> {
    #[token("<!--", lex_comment)]
    Comment(&'src str),

    #[regex(r"<![a-zA-Z\[][^>]*>")]
    Doctype,

    #[regex(r"<\?[^>]*>")]
    ProcessingInstruction,

    #[regex(r#"<[a-zA-Z][^\t\n\x0C\r />]*([^>"']|"[^"]*"|'[^']*')*>"#, |lex| lex.slice())]
    StartTag(&'src str),

    #[regex(r"</[a-zA-Z][^>]*>", |lex| lex.slice())]
    EndTag(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),

    /// A `<` that does not open a tag
    #[token("<")]
    Lt,
}

/// Consume everything up to and including `-->`, or the rest of the input.
fn lex_comment<'src>(lex: &mut Lexer<'src, HtmlToken<'src>>) -> &'src str {
    let rest = lex.remainder();
    match rest.find("-->") {
        Some(end) => {
            lex.bump(end + 3);
            &rest[..end]
        }
        None => {
            lex.bump(rest.len());
            rest
        }
    }
}

/// A parsed start or end tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagToken {
    /// Lower-case tag name
    pub name: String,
    /// Attributes in source order; the first occurrence of a name wins
    pub attributes: Vec<(String, String)>,
    pub self_closing: bool,
}

/// Split the raw text of a start tag (`<a href="x">`) into name and attributes.
/// Attribute values are returned undecoded.
pub fn scan_tag(raw: &str) -> TagToken {
    let body = raw.strip_prefix('<').unwrap_or(raw).trim_start_matches('/');
    let inner = body.strip_suffix('>').unwrap_or(body);
    let mut chars = inner.char_indices().peekable();

    let name_end = inner
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_ascii_lowercase();
    while chars.peek().is_some_and(|(i, _)| *i < name_end) {
        chars.next();
    }

    let mut attributes: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        while chars.peek().is_some_and(|(_, c)| c.is_ascii_whitespace()) {
            chars.next();
        }
        let Some(&(start, c)) = chars.peek() else {
            break;
        };
        if c == '/' {
            chars.next();
            self_closing = chars.peek().is_none();
            continue;
        }

        let mut end = start;
        while let Some(&(i, c)) = chars.peek() {
            if c.is_ascii_whitespace() || c == '=' || c == '/' && i > start {
                break;
            }
            end = i + c.len_utf8();
            chars.next();
        }
        let attr_name = inner[start..end].to_ascii_lowercase();

        while chars.peek().is_some_and(|(_, c)| c.is_ascii_whitespace()) {
            chars.next();
        }
        let mut value = String::new();
        if chars.peek().is_some_and(|(_, c)| *c == '=') {
            chars.next();
            while chars.peek().is_some_and(|(_, c)| c.is_ascii_whitespace()) {
                chars.next();
            }
            match chars.peek().copied() {
                Some((_, q @ ('"' | '\''))) => {
                    chars.next();
                    for (_, c) in chars.by_ref() {
                        if c == q {
                            break;
                        }
                        value.push(c);
                    }
                }
                Some(_) => {
                    while let Some(&(_, c)) = chars.peek() {
                        if c.is_ascii_whitespace() {
                            break;
                        }
                        value.push(c);
                        chars.next();
                    }
                }
                None => {}
            }
        }

        if !attr_name.is_empty() && !attributes.iter().any(|(n, _)| *n == attr_name) {
            attributes.push((attr_name, value));
        }
    }

    TagToken {
        name,
        attributes,
        self_closing,
    }
}

/// Lower-case name of an end tag (`</B >` gives `b`).
pub fn end_tag_name(raw: &str) -> String {
    let inner = raw.trim_start_matches("</").trim_end_matches('>');
    let end = inner
        .find(|c: char| c.is_ascii_whitespace() || c == '/')
        .unwrap_or(inner.len());
    inner[..end].to_ascii_lowercase()
}
