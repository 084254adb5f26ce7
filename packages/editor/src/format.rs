//! # Inline Formatting
//!
//! Adding and removing inline format elements over a range, and the
//! formatting commands built on them.
//!
//! ## Design
//!
//! - A format is a tag plus exact attributes; `<strong>` is not `<b>`
//! - [`remove_format`] unwraps every matching element touching the range and
//!   re-wraps the parts that lie outside it in shallow clones
//! - Ranges are plain values, so both passes carry the boundaries through
//!   every split and unwrap themselves
//! - On a collapsed range a placeholder text node holds the caret, so the
//!   next character typed lands inside (or outside) the format

use scribe_dom::NodeId;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::editor::Editor;
use crate::errors::EditorResult;
use crate::merge_split::{merge_inlines, split, SplitAt};
use crate::node_ops::{empty, get_nearest, has_tag_attributes};
use crate::range::{Boundary, Range};
use crate::range_ops::{
    end_block, expand_to_block_boundaries, insert_node_in_range, move_boundaries_down, move_boundaries_up,
    start_block,
};
use crate::tree::Tree;
use crate::walker::{TreeWalker, SHOW_ELEMENT_OR_TEXT, SHOW_TEXT};
use crate::whitespace::{fix_cursor, is_line_break, remove_zws, ZWS};

/// An inline format: a tag and the attributes it must carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    pub tag: String,
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
}

impl Format {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attributes(tag: &str, attributes: Vec<(String, String)>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes,
        }
    }

    fn classed_span(class: &str, style: Option<String>) -> Self {
        let mut attributes = vec![("class".to_string(), class.to_string())];
        if let Some(style) = style {
            attributes.push(("style".to_string(), style));
        }
        Self::with_attributes("span", attributes)
    }
}

/// Set or append each pair of `extra` on `base`, keeping first-seen order.
pub(crate) fn merge_attributes(base: &mut Vec<(String, String)>, extra: &[(String, String)]) {
    for (name, value) in extra {
        match base.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value.clone(),
            None => base.push((name.clone(), value.clone())),
        }
    }
}

fn first_non_inline_ancestor(tree: &Tree, node: NodeId) -> NodeId {
    let mut node = node;
    while tree.is_inline(node) {
        match tree.parent(node) {
            Some(parent) => node = parent,
            None => break,
        }
    }
    node
}

/// Wrap the content of `range` in `tag` elements. Returns the range over
/// the formatted content, or the caret inside a new empty element.
pub fn add_format(
    tree: &mut Tree,
    tag: &str,
    attributes: &[(String, String)],
    range: Range,
    root: NodeId,
) -> EditorResult<Range> {
    let mut range = range;
    if range.is_collapsed() {
        let element = tree.create_element_with(tag, attributes);
        fix_cursor(tree, element)?;
        insert_node_in_range(tree, &mut range, element)?;
        let focus = tree.first_child(element).unwrap_or(element);
        let offset = if tree.is_text(focus) { tree.length(focus) } else { 0 };
        let block = first_non_inline_ancestor(tree, element);
        remove_zws(tree, block, Some(element));
        let offset = offset.min(tree.length(focus));
        return Ok(Range::collapsed_at(focus, offset));
    }

    let common = range.common_ancestor(tree);
    let probe = range;
    let mut walker = TreeWalker::new(
        common,
        SHOW_ELEMENT_OR_TEXT,
        Box::new(move |t: &Tree, n| {
            (t.is_text(n) || t.has_tag(n, "br") || t.has_tag(n, "img")) && probe.contains_node(t, n, true)
        }),
    );
    let (mut sc, mut so) = (range.start.node, range.start.offset);
    let (mut ec, mut eo) = (range.end.node, range.end.offset);

    // Collected up front; wrapping re-parents nodes under the walk.
    let mut nodes = Vec::new();
    walker.current = sc;
    if walker.accepts(tree, sc) {
        nodes.push(sc);
    } else {
        match walker.next_node(tree) {
            Some(next) => {
                sc = next;
                so = 0;
                nodes.push(next);
            }
            None => return Ok(range),
        }
    }
    while let Some(next) = walker.next_node(tree) {
        nodes.push(next);
    }

    for node in nodes {
        let mut node = node;
        if get_nearest(tree, node, root, tag, attributes).is_some() {
            continue;
        }
        if tree.is_text(node) {
            let from = if node == sc { so } else { 0 };
            let to = if node == ec { eo } else { tree.length(node) };
            if from >= to {
                continue;
            }
        }
        if node == ec && tree.is_text(node) && tree.length(node) > eo {
            tree.split_text(node, eo)?;
        }
        if node == sc && so > 0 && tree.is_text(node) {
            let after = tree.split_text(node, so)?;
            if ec == sc {
                ec = after;
                eo -= so;
            } else if Some(ec) == tree.parent(sc) {
                eo += 1;
            }
            sc = after;
            so = 0;
            node = after;
        }
        let element = tree.create_element_with(tag, attributes);
        tree.replace_with(node, element)?;
        tree.append_child(element, node)?;
    }

    range = Range::new(tree, sc, so, ec, eo);
    Ok(range)
}

/// Collect the parts of `node` lying outside `range` that must keep the
/// format of `exemplar`, splitting text at the boundaries.
fn examine_node(
    tree: &mut Tree,
    range: &mut Range,
    node: NodeId,
    exemplar: NodeId,
    to_wrap: &mut Vec<(NodeId, NodeId)>,
) -> EditorResult<()> {
    if range.contains_node(tree, node, false) {
        return Ok(());
    }
    if !range.contains_node(tree, node, true) {
        let keep = match tree.text(node) {
            Some(text) => !text.is_empty(),
            None => !tree.has_tag(node, "input"),
        };
        if keep {
            to_wrap.push((exemplar, node));
        }
        return Ok(());
    }
    if tree.is_text(node) {
        if node == range.end.node && range.end.offset != tree.length(node) {
            let after = split_text_tracking(tree, node, range.end.offset, range)?;
            to_wrap.push((exemplar, after));
        }
        if node == range.start.node && range.start.offset > 0 {
            split_text_tracking(tree, node, range.start.offset, range)?;
            to_wrap.push((exemplar, node));
        }
    } else {
        let children = tree.children(node).to_vec();
        for child in children {
            examine_node(tree, range, child, exemplar, to_wrap)?;
        }
    }
    Ok(())
}

/// Split a text node, moving boundaries of `range` past the split point
/// into the new node.
fn split_text_tracking(tree: &mut Tree, node: NodeId, offset: usize, range: &mut Range) -> EditorResult<NodeId> {
    let parent = tree.parent(node);
    let index = tree.index_of(node).unwrap_or(0);
    let after = tree.split_text(node, offset)?;
    for point in [&mut range.start, &mut range.end] {
        if point.node == node && point.offset > offset {
            *point = Boundary::new(after, point.offset - offset);
        } else if Some(point.node) == parent && point.offset > index {
            point.offset += 1;
        }
    }
    Ok(after)
}

/// Replace `element` by its children, keeping `range` on the same content.
fn unwrap_keeping(tree: &mut Tree, element: NodeId, range: &mut Range) -> EditorResult<()> {
    let (Some(parent), Some(index)) = (tree.parent(element), tree.index_of(element)) else {
        return Ok(());
    };
    let count = tree.child_count(element);
    for point in [&mut range.start, &mut range.end] {
        if point.node == element {
            *point = Boundary::new(parent, index + point.offset);
        } else if point.node == parent && point.offset > index {
            point.offset = point.offset + count - 1;
        }
    }
    let contents = empty(tree, element);
    tree.replace_child(parent, contents, element)?;
    Ok(())
}

/// Remove the `tag` format from the content of `range`. With `partial`,
/// matching elements that only overlap the range are unwrapped whole.
pub fn remove_format(
    tree: &mut Tree,
    tag: &str,
    attributes: &[(String, String)],
    range: Range,
    root: NodeId,
    partial: bool,
) -> EditorResult<Range> {
    let mut range = range;
    let mut fixer = None;
    if range.is_collapsed() {
        let placeholder = if tree.cant_focus_empty_text_nodes { ZWS.to_string() } else { String::new() };
        let node = tree.create_text(placeholder);
        insert_node_in_range(tree, &mut range, node)?;
        fixer = Some(node);
    }

    let scope = first_non_inline_ancestor(tree, range.common_ancestor(tree));
    let format_tags: Vec<NodeId> = tree
        .elements_by_tag(scope, tag)
        .into_iter()
        .filter(|el| range.contains_node(tree, *el, true) && has_tag_attributes(tree, *el, tag, attributes))
        .collect();

    let mut to_wrap = Vec::new();
    if !partial {
        for element in &format_tags {
            examine_node(tree, &mut range, *element, *element, &mut to_wrap)?;
        }
    }
    for (exemplar, node) in to_wrap {
        let clone = tree.clone_node(exemplar, false);
        tree.replace_with(node, clone)?;
        tree.append_child(clone, node)?;
    }
    for element in &format_tags {
        unwrap_keeping(tree, *element, &mut range)?;
    }
    debug!(tag, removed = format_tags.len(), "Removed format");

    if let Some(fixer) = fixer {
        if tree.cant_focus_empty_text_nodes {
            if let Some(parent) = tree.parent(fixer) {
                let block = first_non_inline_ancestor(tree, parent);
                remove_zws(tree, block, Some(parent));
            }
        }
        if tree.parent(fixer).is_some() {
            range = Range::collapsed_at(fixer, tree.length(fixer));
        } else {
            range.collapse(false);
        }
    }
    merge_inlines(tree, scope, &mut range)?;
    Ok(range)
}

/// Move the formatting-free content of `node` into `clean`: text, `<br>`
/// and images are kept, blocks become default blocks.
fn strip_formatting(tree: &mut Tree, node: NodeId, clean: NodeId) -> EditorResult<NodeId> {
    let mut child = tree.first_child(node);
    while let Some(current) = child {
        child = tree.next_sibling(current);
        if tree.is_inline(current) {
            if tree.is_text(current) || tree.has_tag(current, "br") || tree.has_tag(current, "img") {
                tree.append_child(clean, current)?;
                continue;
            }
        } else if tree.is_block(current) {
            let inner = tree.create_fragment();
            let inner = strip_formatting(tree, current, inner)?;
            let block = tree.create_default_block(&[inner])?;
            tree.append_child(clean, block)?;
            continue;
        }
        strip_formatting(tree, current, clean)?;
    }
    Ok(clean)
}

/// Merge the blocks of `frag` into one `<pre>`, turning line breaks into
/// newlines and unwrapping inline code.
pub(crate) fn blocks_to_pre(
    tree: &mut Tree,
    frag: NodeId,
    root: NodeId,
    attributes: &[(String, String)],
) -> EditorResult<NodeId> {
    let output = tree.create_fragment();
    let mut walker = tree.block_walker(frag, root);
    while let Some(block) = walker.next_node(tree) {
        let brs = tree.elements_by_tag(block, "br");
        let breaks_line: Vec<bool> = brs.iter().map(|br| is_line_break(tree, *br, false)).collect();
        for (br, breaks) in brs.into_iter().zip(breaks_line).rev() {
            if breaks {
                let newline = tree.create_text("\n");
                tree.replace_with(br, newline)?;
            } else {
                tree.detach(br);
            }
        }
        for code in tree.elements_by_tag(block, "code").into_iter().rev() {
            let contents = empty(tree, code);
            tree.replace_with(code, contents)?;
        }
        if tree.first_child(output).is_some() {
            let newline = tree.create_text("\n");
            tree.append_child(output, newline)?;
        }
        let contents = empty(tree, block);
        tree.append_child(output, contents)?;
        walker.current = block;
    }

    let mut texts = TreeWalker::unfiltered(output, SHOW_TEXT);
    while let Some(text) = texts.next_node(tree) {
        let data = tree.text(text).unwrap_or_default().replace('\u{a0}', " ");
        tree.set_text(text, &data)?;
    }
    tree.normalize(output);
    let pre = tree.create_element_with("pre", attributes);
    tree.append_child(pre, output)?;
    fix_cursor(tree, pre)
}

/// Undo [`blocks_to_pre`] for every `<pre>` in `frag`: each line becomes
/// a default block.
pub(crate) fn pre_to_blocks(tree: &mut Tree, frag: NodeId, _root: NodeId) -> EditorResult<NodeId> {
    for pre in tree.elements_by_tag(frag, "pre").into_iter().rev() {
        let texts: Vec<NodeId> = tree
            .descendants(pre)
            .into_iter()
            .filter(|n| tree.is_text(*n))
            .collect();
        for text in texts {
            let Some(parent) = tree.parent(text) else {
                continue;
            };
            let value = nbsp_runs(tree.text(text).unwrap_or_default());
            let mut lines: Vec<&str> = value.split('\n').collect();
            let last = lines.pop().unwrap_or_default().to_string();
            for line in lines {
                let part = tree.create_text(line);
                tree.insert_before(parent, part, Some(text))?;
                let br = tree.create_element("br");
                tree.insert_before(parent, br, Some(text))?;
            }
            tree.set_text(text, &last)?;
        }
        lines_to_blocks(tree, pre)?;
        let contents = empty(tree, pre);
        tree.replace_with(pre, contents)?;
    }
    Ok(frag)
}

/// Regroup the children of `container` into default blocks, one per run
/// of inline content between `<br>`s.
fn lines_to_blocks(tree: &mut Tree, container: NodeId) -> EditorResult<()> {
    let children = tree.children(container).to_vec();
    let mut line: Vec<NodeId> = Vec::new();
    for child in children {
        if tree.has_tag(child, "br") {
            let block = tree.create_default_block(&line)?;
            tree.replace_with(child, block)?;
            line.clear();
        } else if tree.is_inline(child) {
            line.push(child);
        } else if !line.is_empty() {
            let block = tree.create_default_block(&line)?;
            tree.insert_before(container, block, Some(child))?;
            line.clear();
        }
    }
    if !line.is_empty() {
        let block = tree.create_default_block(&line)?;
        tree.append_child(container, block)?;
    }
    Ok(())
}

/// A space followed by another space becomes a non-breaking space.
fn nbsp_runs(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if *c == ' ' && chars.get(i + 1) == Some(&' ') {
                '\u{a0}'
            } else {
                *c
            }
        })
        .collect()
}

fn classed_style(prefix: &str, value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(|v| format!("{prefix}{v}"))
}

impl Editor {
    /// Whether all text in the range (or selection) is inside `tag` with
    /// `attributes`.
    pub fn has_format(&mut self, tag: &str, attributes: &[(String, String)], range: Option<Range>) -> bool {
        let tag = tag.to_ascii_lowercase();
        let mut range = range.unwrap_or_else(|| self.get_selection());
        let tree = &self.tree;
        let root = tree.root();
        if !range.is_collapsed() && tree.is_text(range.start.node) && range.start.offset == tree.length(range.start.node) {
            if let Some(next) = tree.next_sibling(range.start.node) {
                range.set_start_before(tree, next);
            }
        }
        if !range.is_collapsed() && tree.is_text(range.end.node) && range.end.offset == 0 {
            if let Some(prev) = tree.previous_sibling(range.end.node) {
                range.set_end_after(tree, prev);
            }
        }
        let common = range.common_ancestor(tree);
        if get_nearest(tree, common, root, &tag, attributes).is_some() {
            return true;
        }
        if tree.is_text(common) {
            return false;
        }
        let probe = range;
        let mut walker = TreeWalker::new(common, SHOW_TEXT, Box::new(move |t: &Tree, n| probe.contains_node(t, n, true)));
        let mut seen = false;
        while let Some(node) = walker.next_node(tree) {
            if get_nearest(tree, node, root, &tag, attributes).is_none() {
                return false;
            }
            seen = true;
        }
        seen
    }

    /// Remove `remove` from the range (or selection), then apply `add`.
    #[instrument(skip(self))]
    pub fn change_format(
        &mut self,
        add: Option<&Format>,
        remove: Option<&Format>,
        range: Option<Range>,
        partial: bool,
    ) -> &mut Self {
        self.run(|editor| {
            let range = range.unwrap_or_else(|| editor.get_selection());
            editor.apply_format(range, add, remove, partial)
        })
    }

    pub(crate) fn apply_format(
        &mut self,
        range: Range,
        add: Option<&Format>,
        remove: Option<&Format>,
        partial: bool,
    ) -> EditorResult<()> {
        self.save_undo_state_at(&range);
        let root = self.tree.root();
        let mut range = range;
        if let Some(format) = remove {
            range = remove_format(&mut self.tree, &format.tag, &format.attributes, range, root, partial)?;
        }
        if let Some(format) = add {
            range = add_format(&mut self.tree, &format.tag, &format.attributes, range, root)?;
        }
        self.finish(range);
        Ok(())
    }

    fn add_tag(&mut self, tag: &str) -> &mut Self {
        self.change_format(Some(&Format::new(tag)), None, None, false)
    }

    fn remove_tag(&mut self, tag: &str) -> &mut Self {
        self.change_format(None, Some(&Format::new(tag)), None, false)
    }

    /// Remove `tag` if the selection already has it, else add it (removing
    /// `exclusive` first).
    pub fn toggle_format(&mut self, tag: &str, exclusive: Option<&str>) -> &mut Self {
        let range = self.get_selection();
        if self.has_format(tag, &[], Some(range)) {
            self.change_format(None, Some(&Format::new(tag)), Some(range), false)
        } else {
            let remove = exclusive.map(Format::new);
            self.change_format(Some(&Format::new(tag)), remove.as_ref(), Some(range), false)
        }
    }

    pub fn bold(&mut self) -> &mut Self {
        self.add_tag("b")
    }

    pub fn italic(&mut self) -> &mut Self {
        self.add_tag("i")
    }

    pub fn underline(&mut self) -> &mut Self {
        self.add_tag("u")
    }

    pub fn strikethrough(&mut self) -> &mut Self {
        self.add_tag("s")
    }

    pub fn subscript(&mut self) -> &mut Self {
        self.change_format(Some(&Format::new("sub")), Some(&Format::new("sup")), None, false)
    }

    pub fn superscript(&mut self) -> &mut Self {
        self.change_format(Some(&Format::new("sup")), Some(&Format::new("sub")), None, false)
    }

    pub fn remove_bold(&mut self) -> &mut Self {
        self.remove_tag("b")
    }

    pub fn remove_italic(&mut self) -> &mut Self {
        self.remove_tag("i")
    }

    pub fn remove_underline(&mut self) -> &mut Self {
        self.remove_tag("u")
    }

    pub fn remove_strikethrough(&mut self) -> &mut Self {
        self.remove_tag("s")
    }

    pub fn remove_subscript(&mut self) -> &mut Self {
        self.remove_tag("sub")
    }

    pub fn remove_superscript(&mut self) -> &mut Self {
        self.remove_tag("sup")
    }

    /// Link the selection to `url`. A collapsed selection first gets the
    /// url itself, without its scheme, as the link text.
    #[instrument(skip(self, attributes))]
    pub fn make_link(&mut self, url: &str, attributes: &[(String, String)]) -> &mut Self {
        self.run(|editor| {
            let mut range = editor.get_selection();
            if range.is_collapsed() {
                let mut label_start = url.find(':').map_or(0, |i| i + 1);
                if label_start > 0 {
                    label_start += url[label_start..].len() - url[label_start..].trim_start_matches('/').len();
                }
                let label = editor.tree.create_text(&url[label_start..]);
                insert_node_in_range(&mut editor.tree, &mut range, label)?;
            }
            let mut pairs = vec![("href".to_string(), url.to_string())];
            merge_attributes(&mut pairs, &editor.config.attributes_for("a"));
            merge_attributes(&mut pairs, attributes);
            let add = Format::with_attributes("a", pairs);
            editor.apply_format(range, Some(&add), Some(&Format::new("a")), false)
        })
    }

    pub fn remove_link(&mut self) -> &mut Self {
        self.change_format(None, Some(&Format::new("a")), None, true)
    }

    fn set_classed_span(&mut self, class: String, style: Option<String>) -> &mut Self {
        let add = style.map(|s| Format::classed_span(&class, Some(s)));
        let remove = Format::classed_span(&class, None);
        self.change_format(add.as_ref(), Some(&remove), None, false)
    }

    /// Set the font family of the selection; `None` removes it.
    pub fn set_font_face(&mut self, name: Option<&str>) -> &mut Self {
        let class = self.config.class_names.font_family.clone();
        let style = name
            .filter(|n| !n.is_empty())
            .map(|n| format!("font-family: {n}, sans-serif;"));
        self.set_classed_span(class, style)
    }

    /// Set the font size of the selection. A bare number means pixels.
    pub fn set_font_size(&mut self, size: Option<&str>) -> &mut Self {
        let class = self.config.class_names.font_size.clone();
        let style = size.filter(|s| !s.is_empty()).map(|s| {
            if s.parse::<f64>().is_ok() {
                format!("font-size: {s}px")
            } else {
                format!("font-size: {s}")
            }
        });
        self.set_classed_span(class, style)
    }

    pub fn set_text_color(&mut self, color: Option<&str>) -> &mut Self {
        let class = self.config.class_names.color.clone();
        self.set_classed_span(class, classed_style("color:", color))
    }

    pub fn set_highlight_color(&mut self, color: Option<&str>) -> &mut Self {
        let class = self.config.class_names.highlight.clone();
        self.set_classed_span(class, classed_style("background-color:", color))
    }

    /// Strip every inline format from the range (or selection), turning
    /// the blocks it touches into default blocks.
    #[instrument(skip(self))]
    pub fn remove_all_formatting(&mut self, range: Option<Range>) -> &mut Self {
        self.run(|editor| {
            let range = range.unwrap_or_else(|| editor.get_selection());
            editor.try_remove_all_formatting(range)
        })
    }

    fn try_remove_all_formatting(&mut self, range: Range) -> EditorResult<()> {
        let mut range = range;
        if range.is_collapsed() {
            return Ok(());
        }
        let root = self.tree.root();
        let mut stop = Some(range.common_ancestor(&self.tree));
        while let Some(node) = stop.filter(|n| !self.tree.is_block(*n)) {
            stop = self.tree.parent(node);
        }
        let stop = match stop {
            Some(stop) => stop,
            None => {
                expand_to_block_boundaries(&self.tree, &mut range, root);
                root
            }
        };
        if self.tree.is_text(stop) {
            return Ok(());
        }
        self.save_undo_state_at(&range);
        move_boundaries_up(&self.tree, &mut range, Some(stop), Some(stop), root);

        let tree = &mut self.tree;
        let (start_container, start_offset) = (range.start.node, range.start.offset);
        let node_after_split = split(tree, range.end.node, SplitAt::Offset(range.end.offset), stop, root)?;
        let mut node_in_split = split(tree, start_container, SplitAt::Offset(start_offset), stop, root)?;
        let formatted = tree.create_fragment();
        while let Some(node) = node_in_split.filter(|n| Some(*n) != node_after_split) {
            node_in_split = tree.next_sibling(node);
            tree.append_child(formatted, node)?;
        }
        let clean = tree.create_fragment();
        strip_formatting(tree, formatted, clean)?;
        tree.normalize(clean);

        let (mut start, mut end) = (range.start.offset, range.end.offset);
        if let Some(first) = tree.first_child(clean) {
            let last = tree.last_child(clean);
            tree.insert_before(stop, clean, node_after_split)?;
            start = tree.index_of(first).unwrap_or(0);
            end = last.and_then(|l| tree.index_of(l)).map_or(0, |i| i + 1);
        } else if let Some(after) = node_after_split {
            start = tree.index_of(after).unwrap_or(0);
            end = start;
        }
        let mut range = Range::new(tree, stop, start, stop, end);
        merge_inlines(tree, stop, &mut range)?;
        move_boundaries_down(tree, &mut range);
        self.finish(range);
        Ok(())
    }

    /// Format the selection as code: inline `<code>` inside a block, or a
    /// `<pre>` block for a caret or a selection spanning blocks.
    #[instrument(skip(self))]
    pub fn code(&mut self) -> &mut Self {
        self.run(|editor| {
            let range = editor.get_selection();
            let common = range.common_ancestor(&editor.tree);
            if range.is_collapsed() || editor.tree.is_container(common) {
                let attributes = editor.config.attributes_for("pre");
                editor.modify_blocks_at(range, move |tree, frag, root| blocks_to_pre(tree, frag, root, &attributes))
            } else {
                let add = Format::with_attributes("code", editor.config.attributes_for("code"));
                editor.apply_format(range, Some(&add), None, false)
            }
        })
    }

    pub fn remove_code(&mut self) -> &mut Self {
        self.run(|editor| {
            let range = editor.get_selection();
            let root = editor.tree.root();
            let common = range.common_ancestor(&editor.tree);
            if get_nearest(&editor.tree, common, root, "pre", &[]).is_some() {
                editor.modify_blocks_at(range, pre_to_blocks)
            } else {
                editor.apply_format(range, None, Some(&Format::new("code")), false)
            }
        })
    }

    pub fn toggle_code(&mut self) -> &mut Self {
        if self.has_format("pre", &[], None) || self.has_format("code", &[], None) {
            self.remove_code()
        } else {
            self.code()
        }
    }

    /// Call `f` on each block of the range (or selection) until it returns
    /// `true`. With `mutates`, the calls form one undoable change.
    pub fn for_each_block<F>(&mut self, mut f: F, mutates: bool, range: Option<Range>) -> &mut Self
    where
        F: FnMut(&mut Tree, NodeId) -> bool,
    {
        self.run(|editor| {
            let range = range.unwrap_or_else(|| editor.get_selection());
            if mutates {
                editor.save_undo_state_at(&range);
            }
            let root = editor.tree.root();
            let start = start_block(&editor.tree, &range, root);
            let end = end_block(&editor.tree, &range, root);
            if let (Some(mut block), Some(end)) = (start, end) {
                loop {
                    if f(&mut editor.tree, block) || block == end {
                        break;
                    }
                    match editor.tree.next_block(block, root) {
                        Some(next) => block = next,
                        None => break,
                    }
                }
            }
            if mutates {
                editor.finish(range);
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;

    fn tree_with(html: &str) -> Tree {
        let mut tree = Tree::new("div");
        let root = tree.root();
        tree.set_inner_html(root, html).unwrap();
        tree
    }

    fn text_at(tree: &Tree, path: &[usize]) -> NodeId {
        let mut node = tree.root();
        for index in path {
            node = tree.child(node, *index).unwrap();
        }
        node
    }

    fn editor_with(html: &str) -> Editor {
        let mut editor = Editor::new(EditorConfig::default());
        editor.set_html(html);
        editor
    }

    #[test]
    fn test_add_format_wraps_text_runs() {
        let mut tree = tree_with("<div>abc<i>de</i>f</div>");
        let root = tree.root();
        let start = text_at(&tree, &[0, 0]);
        let end = text_at(&tree, &[0, 2]);
        let range = Range::new(&tree, start, 1, end, 0);
        let range = add_format(&mut tree, "b", &[], range, root).unwrap();
        assert_eq!(tree.inner_html(root), "<div>a<b>bc</b><i><b>de</b></i>f</div>");
        assert_eq!(range.to_text(&tree), "bcde");
    }

    #[test]
    fn test_add_format_inside_one_text_node() {
        let mut tree = tree_with("<div>abcd</div>");
        let root = tree.root();
        let text = text_at(&tree, &[0, 0]);
        let range = Range::new(&tree, text, 1, text, 3);
        let range = add_format(&mut tree, "u", &[], range, root).unwrap();
        assert_eq!(tree.inner_html(root), "<div>a<u>bc</u>d</div>");
        assert_eq!(range.to_text(&tree), "bc");
    }

    #[test]
    fn test_add_format_collapsed_inserts_focusable_element() {
        let mut tree = tree_with("<div>ab</div>");
        let root = tree.root();
        let text = text_at(&tree, &[0, 0]);
        let range = add_format(&mut tree, "b", &[], Range::collapsed_at(text, 1), root).unwrap();
        assert_eq!(tree.inner_html(root), "<div>a<b></b>b</div>");
        let b = text_at(&tree, &[0, 1]);
        assert_eq!(tree.parent(range.start.node), Some(b));
    }

    #[test]
    fn test_remove_format_rewraps_outside_parts() {
        let mut tree = tree_with("<div><b>abcd</b></div>");
        let root = tree.root();
        let text = text_at(&tree, &[0, 0, 0]);
        let range = Range::new(&tree, text, 1, text, 3);
        let range = remove_format(&mut tree, "b", &[], range, root, false).unwrap();
        assert_eq!(tree.inner_html(root), "<div><b>a</b>bc<b>d</b></div>");
        assert_eq!(range.to_text(&tree), "bc");
    }

    #[test]
    fn test_remove_format_partial_unwraps_whole_element() {
        let mut tree = tree_with("<div><a href=\"/\">abcd</a></div>");
        let root = tree.root();
        let text = text_at(&tree, &[0, 0, 0]);
        let range = Range::new(&tree, text, 1, text, 2);
        remove_format(&mut tree, "a", &[], range, root, true).unwrap();
        assert_eq!(tree.inner_html(root), "<div>abcd</div>");
    }

    #[test]
    fn test_remove_format_collapsed_leaves_caret_outside() {
        let mut tree = tree_with("<div>Hello <b>world</b></div>");
        let root = tree.root();
        let world = text_at(&tree, &[0, 1, 0]);
        let range = remove_format(&mut tree, "b", &[], Range::collapsed_at(world, 5), root, false).unwrap();
        assert!(range.is_collapsed());
        assert!(get_nearest(&tree, range.start.node, root, "b", &[]).is_none());
        assert_eq!(tree.inner_html(root), "<div>Hello <b>world</b></div>");
    }

    #[test]
    fn test_has_format() {
        let mut editor = editor_with("<div><b>ab</b>e</div>");
        let root = editor.root();
        let block = editor.tree().first_child(root).unwrap();
        let ab = editor.tree().first_child(editor.tree().child(block, 0).unwrap()).unwrap();
        let e = editor.tree().child(block, 1).unwrap();
        let range = Range::new(editor.tree(), ab, 0, ab, 2);
        assert!(editor.has_format("B", &[], Some(range)));
        let range = Range::new(editor.tree(), ab, 0, e, 1);
        assert!(!editor.has_format("b", &[], Some(range)));
        // ending at the start of the plain text only covers the bold run
        let range = Range::new(editor.tree(), ab, 0, e, 0);
        assert!(editor.has_format("b", &[], Some(range)));
    }

    #[test]
    fn test_bold_and_remove_bold_round_trip() {
        let mut editor = editor_with("<div>abc</div>");
        let root = editor.root();
        let text = editor.tree().first_child(editor.tree().first_child(root).unwrap()).unwrap();
        editor.set_selection(Range::new(editor.tree(), text, 0, text, 3));
        editor.bold();
        assert_eq!(editor.get_html(), "<div><b>abc</b></div>");
        editor.remove_bold();
        assert_eq!(editor.get_html(), "<div>abc</div>");
        assert!(editor.undo_state().can_undo);
    }

    #[test]
    fn test_toggle_format_uses_current_state() {
        let mut editor = editor_with("<div>abc</div>");
        let root = editor.root();
        let text = editor.tree().first_child(editor.tree().first_child(root).unwrap()).unwrap();
        editor.set_selection(Range::new(editor.tree(), text, 0, text, 3));
        editor.toggle_format("i", None);
        assert_eq!(editor.get_html(), "<div><i>abc</i></div>");
        editor.toggle_format("i", None);
        assert_eq!(editor.get_html(), "<div>abc</div>");
    }

    #[test]
    fn test_font_spans_use_class_names() {
        let mut editor = editor_with("<div>abc</div>");
        let root = editor.root();
        let text = editor.tree().first_child(editor.tree().first_child(root).unwrap()).unwrap();
        editor.set_selection(Range::new(editor.tree(), text, 0, text, 3));
        editor.set_font_size(Some("14"));
        assert_eq!(
            editor.get_html(),
            "<div><span class=\"size\" style=\"font-size: 14px\">abc</span></div>"
        );
        editor.set_font_size(None);
        assert_eq!(editor.get_html(), "<div>abc</div>");
    }

    #[test]
    fn test_make_link_on_caret_inserts_label() {
        let mut editor = editor_with("<div>ab</div>");
        editor.move_cursor_to_end();
        editor.make_link("https://example.com", &[]);
        assert_eq!(
            editor.get_html(),
            "<div>ab<a href=\"https://example.com\">example.com</a></div>"
        );
        editor.remove_link();
        assert_eq!(editor.get_html(), "<div>abexample.com</div>");
    }

    #[test]
    fn test_remove_all_formatting() {
        let mut editor = editor_with("<div><b>ab</b><i>cd</i></div>");
        let root = editor.root();
        let block = editor.tree().first_child(root).unwrap();
        let ab = editor.tree().first_child(editor.tree().child(block, 0).unwrap()).unwrap();
        let cd = editor.tree().first_child(editor.tree().child(block, 1).unwrap()).unwrap();
        editor.set_selection(Range::new(editor.tree(), ab, 0, cd, 2));
        editor.remove_all_formatting(None);
        assert_eq!(editor.get_html(), "<div>abcd</div>");
    }

    #[test]
    fn test_code_on_caret_makes_pre_and_back() {
        let mut editor = editor_with("<div>a  b</div><div>c</div>");
        editor.move_cursor_to_start();
        editor.code();
        assert_eq!(editor.get_html(), "<pre>a b</pre><div>c</div>");
        editor.remove_code();
        assert_eq!(editor.get_html(), "<div>a b</div><div>c</div>");
    }

    #[test]
    fn test_for_each_block_sets_alignment_style() {
        let mut editor = editor_with("<div>a</div><div>b</div>");
        let root = editor.root();
        let range = Range::of_contents(editor.tree(), root);
        editor.for_each_block(
            |tree, block| {
                tree.set_style_property(block, "text-align", "right");
                false
            },
            true,
            Some(range),
        );
        assert_eq!(
            editor.get_html(),
            "<div style=\"text-align: right;\">a</div><div style=\"text-align: right;\">b</div>"
        );
    }

    #[test]
    fn test_nbsp_runs() {
        assert_eq!(nbsp_runs("a  b "), "a\u{a0} b ");
    }
}
