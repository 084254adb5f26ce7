//! # Content Cleaning
//!
//! Rewrites external markup into the editor's canonical shape.
//!
//! ## Design
//!
//! - Presentational tags become semantic tags or classed spans
//! - Metadata elements are dropped with their content; unknown block-level
//!   elements are unwrapped in place
//! - Whitespace outside `pre` collapses the way CSS renders it: inner runs
//!   become one space, edge runs survive only next to inline content
//! - Sectioning wrappers are flattened with an explicit worklist, so deeply
//!   nested paste input cannot exhaust the stack

use std::sync::LazyLock;

use regex::Regex;
use scribe_dom::NodeId;
use tracing::debug;

use crate::config::ClassNames;
use crate::errors::EditorResult;
use crate::merge_split::fix_container;
use crate::node_ops::empty;
use crate::tree::{not_ws, Tree};
use crate::walker::{TreeWalker, SHOW_ELEMENT_OR_TEXT};
use crate::whitespace::is_line_break;

static WS_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\n]+").unwrap());

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^#?([\dA-F]{3}){1,2}$").unwrap());

const ALLOWED_BLOCKS: &[&str] = &[
    "address", "article", "aside", "audio", "blockquote", "caption", "col", "colgroup", "dd", "div",
    "dl", "dt", "figcaption", "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "label", "legend", "li", "ol", "output", "p", "pre", "section", "table", "tbody", "td",
    "tfoot", "th", "thead", "tr", "ul",
];

const BLACKLIST: &[&str] = &["head", "meta", "style"];

const SEMANTIC_WRAPPERS: &[&str] = &[
    "address", "article", "aside", "div", "footer", "header", "hgroup", "main", "nav", "section",
];

/// Legacy `<font size>` values in pixels.
fn font_size_px(size: &str) -> Option<&'static str> {
    match size.trim() {
        "1" => Some("10"),
        "2" => Some("13"),
        "3" => Some("16"),
        "4" => Some("18"),
        "5" => Some("24"),
        "6" => Some("32"),
        "7" => Some("48"),
        _ => None,
    }
}

fn replace_with_tag(tree: &mut Tree, node: NodeId, parent: NodeId, tag: &str) -> EditorResult<NodeId> {
    let attributes = tree.attributes(node).to_vec();
    let element = tree.create_element_with(tag, &attributes);
    tree.replace_child(parent, element, node)?;
    let contents = empty(tree, node);
    tree.append_child(element, contents)?;
    Ok(element)
}

/// Chain `element` below the current bottom of a replacement tree.
fn push_level(
    tree: &mut Tree,
    top: &mut Option<NodeId>,
    bottom: &mut Option<NodeId>,
    element: NodeId,
) -> EditorResult<()> {
    if top.is_none() {
        *top = Some(element);
    }
    if let Some(b) = *bottom {
        tree.append_child(b, element)?;
    }
    *bottom = Some(element);
    Ok(())
}

/// Turn inline styles on a span into semantic wrappers.
fn replace_styles(tree: &mut Tree, node: NodeId, class_names: &ClassNames) -> EditorResult<NodeId> {
    let mut top = None;
    let mut bottom = None;
    for property in ["font-weight", "font-style", "font-family", "font-size", "text-decoration"] {
        let Some(css) = tree.style_property(node, property).filter(|c| !c.is_empty()) else {
            continue;
        };
        let lower = css.to_ascii_lowercase();
        let replacement: Option<(&str, Option<(&str, String)>)> = match property {
            "font-weight" if lower.starts_with("bold") || lower.starts_with("700") => Some(("b", None)),
            "font-style" if lower.starts_with("italic") => Some(("i", None)),
            "text-decoration" if lower.starts_with("underline") => Some(("u", None)),
            "font-family" if not_ws(&css) => Some((
                "span",
                Some((class_names.font_family.as_str(), format!("font-family:{css}"))),
            )),
            "font-size" if not_ws(&css) => Some((
                "span",
                Some((class_names.font_size.as_str(), format!("font-size:{css}"))),
            )),
            _ => None,
        };
        let Some((tag, classed)) = replacement else {
            continue;
        };
        let class = classed.as_ref().map_or("", |(c, _)| *c);
        if tree.has_tag(node, tag) && tree.class_name(node) == class {
            continue;
        }
        let element = match &classed {
            Some((class, style)) => {
                tree.create_element_with(tag, &[("class", *class), ("style", style.as_str())])
            }
            None => tree.create_element(tag),
        };
        push_level(tree, &mut top, &mut bottom, element)?;
        tree.remove_style_property(node, property);
    }

    let (Some(top), Some(bottom)) = (top, bottom) else {
        return Ok(node);
    };
    let contents = empty(tree, node);
    tree.append_child(bottom, contents)?;
    if tree.style_text(node).is_empty() {
        tree.replace_with(node, top)?;
    } else {
        tree.append_child(node, top)?;
    }
    Ok(bottom)
}

fn replace_font(tree: &mut Tree, node: NodeId, parent: NodeId, class_names: &ClassNames) -> EditorResult<NodeId> {
    let mut top = None;
    let mut bottom = None;
    if let Some(face) = tree.attr(node, "face").filter(|f| !f.is_empty()).map(str::to_string) {
        let style = format!("font-family:{face}");
        let span = tree.create_element_with(
            "span",
            &[("class", class_names.font_family.as_str()), ("style", style.as_str())],
        );
        push_level(tree, &mut top, &mut bottom, span)?;
    }
    if let Some(px) = tree.attr(node, "size").and_then(font_size_px) {
        let style = format!("font-size:{px}px");
        let span = tree.create_element_with(
            "span",
            &[("class", class_names.font_size.as_str()), ("style", style.as_str())],
        );
        push_level(tree, &mut top, &mut bottom, span)?;
    }
    if let Some(color) = tree
        .attr(node, "color")
        .filter(|c| HEX_COLOR.is_match(c))
        .map(str::to_string)
    {
        let color = if color.starts_with('#') { color } else { format!("#{color}") };
        let style = format!("color:{color}");
        let span = tree.create_element_with(
            "span",
            &[("class", class_names.color.as_str()), ("style", style.as_str())],
        );
        push_level(tree, &mut top, &mut bottom, span)?;
    }
    let (top, bottom) = match (top, bottom) {
        (Some(top), Some(bottom)) => (top, bottom),
        _ => {
            let span = tree.create_element("span");
            (span, span)
        }
    };
    tree.replace_child(parent, top, node)?;
    let contents = empty(tree, node);
    tree.append_child(bottom, contents)?;
    Ok(bottom)
}

fn replace_tt(tree: &mut Tree, node: NodeId, parent: NodeId, class_names: &ClassNames) -> EditorResult<NodeId> {
    let span = tree.create_element_with(
        "span",
        &[
            ("class", class_names.font_family.as_str()),
            ("style", "font-family:menlo,consolas,\"courier new\",monospace"),
        ],
    );
    tree.replace_child(parent, span, node)?;
    let contents = empty(tree, node);
    tree.append_child(span, contents)?;
    Ok(span)
}

/// Apply the rewriter for `tag`, if there is one.
fn rewrite(
    tree: &mut Tree,
    node: NodeId,
    parent: NodeId,
    tag: &str,
    class_names: &ClassNames,
) -> EditorResult<Option<NodeId>> {
    let rewritten = match tag {
        "strong" => replace_with_tag(tree, node, parent, "b")?,
        "em" => replace_with_tag(tree, node, parent, "i")?,
        "ins" => replace_with_tag(tree, node, parent, "u")?,
        "strike" => replace_with_tag(tree, node, parent, "s")?,
        "span" => replace_styles(tree, node, class_names)?,
        "font" => replace_font(tree, node, parent, class_names)?,
        "tt" => replace_tt(tree, node, parent, class_names)?,
        _ => return Ok(None),
    };
    Ok(Some(rewritten))
}

/// Whether a sibling with visible inline content lies in `direction` from
/// `node` before any block edge.
fn has_inline_neighbour(tree: &Tree, scope: NodeId, node: NodeId, forward: bool) -> bool {
    let mut walker = TreeWalker::unfiltered(scope, SHOW_ELEMENT_OR_TEXT).starting_at(node);
    loop {
        let sibling = if forward {
            walker.next_node(tree)
        } else {
            walker.previous_post_order(tree)
        };
        let Some(sibling) = sibling else {
            return false;
        };
        if tree.has_tag(sibling, "img") || tree.text(sibling).is_some_and(not_ws) {
            return true;
        }
        if !tree.is_inline(sibling) {
            return false;
        }
    }
}

fn is_ws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Canonicalize the subtree under `node` in place.
pub fn clean_tree(
    tree: &mut Tree,
    node: NodeId,
    class_names: &ClassNames,
    preserve_ws: bool,
) -> EditorResult<NodeId> {
    let mut scope = node;
    while tree.is_inline(scope) {
        match tree.parent(scope) {
            Some(parent) => scope = parent,
            None => break,
        }
    }

    let mut i = 0;
    while let Some(mut child) = tree.child(node, i) {
        if let Some(tag) = tree.tag(child).map(str::to_string) {
            let child_length = tree.child_count(child);
            if let Some(rewritten) = rewrite(tree, child, node, &tag, class_names)? {
                child = rewritten;
            } else if BLACKLIST.contains(&tag.as_str()) {
                tree.detach(child);
                continue;
            } else if !ALLOWED_BLOCKS.contains(&tag.as_str()) && !tree.is_inline(child) {
                let contents = empty(tree, child);
                tree.replace_child(node, contents, child)?;
                continue;
            }
            if child_length > 0 {
                clean_tree(tree, child, class_names, preserve_ws || tag == "pre")?;
            }
            i += 1;
            continue;
        }

        let Some(data) = tree.text(child).map(str::to_string) else {
            tree.detach(child);
            continue;
        };
        if preserve_ws {
            i += 1;
            continue;
        }
        let starts_with_ws = data.chars().next().map_or(true, is_ws);
        let ends_with_ws = data.chars().last().map_or(true, is_ws);
        let mut cleaned = WS_RUN.replace_all(&data, " ").into_owned();
        if starts_with_ws {
            let lead = if has_inline_neighbour(tree, scope, child, false) { " " } else { "" };
            cleaned = format!("{lead}{}", cleaned.trim_start_matches(is_ws));
        }
        if ends_with_ws {
            let trail = if has_inline_neighbour(tree, scope, child, true) { " " } else { "" };
            cleaned = format!("{}{trail}", cleaned.trim_end_matches(is_ws));
        }
        if cleaned.is_empty() {
            tree.detach(child);
            continue;
        }
        if cleaned != data {
            tree.set_text(child, &cleaned)?;
        }
        i += 1;
    }
    Ok(node)
}

/// Remove `<br>`s that neither end a line nor (with `keep_for_blank_line`)
/// hold an empty block open.
pub fn cleanup_brs(tree: &mut Tree, node: NodeId, root: NodeId, keep_for_blank_line: bool) -> EditorResult<()> {
    let brs = tree.elements_by_tag(node, "br");
    let breaks_line: Vec<bool> = brs
        .iter()
        .map(|br| is_line_break(tree, *br, keep_for_blank_line))
        .collect();
    for (br, breaks) in brs.into_iter().zip(breaks_line).rev() {
        let Some(parent) = tree.parent(br) else {
            continue;
        };
        if !breaks {
            tree.detach(br);
        } else if !tree.is_inline(parent) {
            fix_container(tree, parent, root)?;
        }
    }
    Ok(())
}

/// Drop empty inline elements and empty text, innermost first.
pub fn remove_empty_inlines(tree: &mut Tree, node: NodeId) {
    let mut l = tree.child_count(node);
    while l > 0 {
        l -= 1;
        let Some(child) = tree.child(node, l) else {
            continue;
        };
        if tree.is_element(child) && !tree.is_leaf(child) {
            remove_empty_inlines(tree, child);
            if tree.is_inline(child) && tree.first_child(child).is_none() {
                tree.detach(child);
            }
        } else if tree.text(child) == Some("") {
            tree.detach(child);
        }
    }
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn is_semantic(tree: &Tree, node: NodeId) -> bool {
    match tree.tag(node) {
        Some("div") => tree.block_tag != "div",
        Some(tag) => SEMANTIC_WRAPPERS.contains(&tag),
        None => false,
    }
}

/// Flatten sectioning wrappers: those holding blocks are unwrapped, those
/// holding only inline content become paragraphs (or merge into an
/// enclosing paragraph).
pub fn strip_semantic(tree: &mut Tree, frag: NodeId) -> EditorResult<()> {
    let mut stack: Vec<NodeId> = tree.children(frag).iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        let Some(parent) = tree.parent(node) else {
            continue;
        };
        if !is_semantic(tree, node) {
            stack.extend(tree.children(node).iter().rev().copied());
            continue;
        }
        let children = tree.children(node).to_vec();
        if tree.is_container(node) || tree.has_tag(parent, "p") {
            let contents = empty(tree, node);
            tree.replace_child(parent, contents, node)?;
            stack.extend(children.into_iter().rev());
        } else {
            debug!(tag = tree.node_name(node), "Wrapper became a paragraph");
            let contents = empty(tree, node);
            let p = tree.create_element("p");
            tree.append_child(p, contents)?;
            tree.replace_child(parent, p, node)?;
            stack.extend(children.into_iter().rev());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(html: &str) -> String {
        let mut tree = Tree::new("div");
        let root = tree.root();
        tree.set_inner_html(root, html).unwrap();
        clean_tree(&mut tree, root, &ClassNames::default(), false).unwrap();
        tree.inner_html(root)
    }

    #[test]
    fn test_whitespace_collapse() {
        assert_eq!(clean("<div>  hello   world  </div>"), "<div>hello world</div>");
    }

    #[test]
    fn test_edge_space_kept_next_to_inline_content() {
        assert_eq!(clean("<div><b>a</b>  b  <i>c</i></div>"), "<div><b>a</b> b <i>c</i></div>");
        assert_eq!(clean("<div>\n  </div><div>x</div>"), "<div></div><div>x</div>");
    }

    #[test]
    fn test_preformatted_whitespace_kept() {
        assert_eq!(clean("<pre>  a\n  b  </pre>"), "<pre>  a\n  b  </pre>");
    }

    #[test]
    fn test_legacy_tags_rewritten() {
        assert_eq!(
            clean("<div><strong class=\"x\">a</strong><em>b</em><strike>c</strike><ins>d</ins></div>"),
            "<div><b class=\"x\">a</b><i>b</i><s>c</s><u>d</u></div>"
        );
        assert_eq!(
            clean("<div><tt>x</tt></div>"),
            "<div><span class=\"font\" style=\"font-family:menlo,consolas,&quot;courier new&quot;,monospace\">x</span></div>"
        );
    }

    #[test]
    fn test_font_element_decomposed() {
        assert_eq!(
            clean("<div><font face=\"arial\" size=\"3\" color=\"f00\">x</font></div>"),
            "<div><span class=\"font\" style=\"font-family:arial\"><span class=\"size\" style=\"font-size:16px\"><span class=\"color\" style=\"color:#f00\">x</span></span></span></div>"
        );
        assert_eq!(clean("<div><font color=\"red\">x</font></div>"), "<div><span>x</span></div>");
    }

    #[test]
    fn test_span_styles_become_semantic() {
        assert_eq!(
            clean("<div><span style=\"font-weight: bold; font-style: italic\">x</span></div>"),
            "<div><b><i>x</i></b></div>"
        );
        assert_eq!(
            clean("<div><span style=\"font-weight: 700; color: red\">x</span></div>"),
            "<div><span style=\"color: red;\"><b>x</b></span></div>"
        );
    }

    #[test]
    fn test_blacklist_and_unknown_blocks() {
        assert_eq!(clean("<div>a<meta name=\"x\"></div>"), "<div>a</div>");
        assert_eq!(clean("<center><div>a</div></center>"), "<div>a</div>");
    }

    #[test]
    fn test_cleanup_brs() {
        let mut tree = Tree::new("div");
        let root = tree.root();
        tree.set_inner_html(root, "<div>a<br></div><div>b<br>c</div><div><br></div>").unwrap();
        cleanup_brs(&mut tree, root, root, true).unwrap();
        assert_eq!(tree.inner_html(root), "<div>a</div><div>b<br>c</div><div><br></div>");
    }

    #[test]
    fn test_remove_empty_inlines() {
        let mut tree = Tree::new("div");
        let root = tree.root();
        tree.set_inner_html(root, "<div>a<b><i></i></b><img></div>").unwrap();
        remove_empty_inlines(&mut tree, root);
        assert_eq!(tree.inner_html(root), "<div>a<img></div>");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&amp;</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;amp;&lt;/a&gt;");
    }

    #[test]
    fn test_strip_semantic() {
        let mut tree = Tree::new("div");
        let frag = tree.parse_fragment(
            "<section><article>one</article><div>two</div></section><p><span>x</span></p>",
        );
        let p = tree.last_child(frag).unwrap();
        let y = tree.create_text("y");
        let aside = tree.create_element("aside");
        tree.append_child(aside, y).unwrap();
        tree.append_child(p, aside).unwrap();
        strip_semantic(&mut tree, frag).unwrap();
        assert_eq!(tree.inner_html(frag), "<p>one</p><div>two</div><p><span>x</span>y</p>");
    }
}
