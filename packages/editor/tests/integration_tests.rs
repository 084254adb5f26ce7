//! Integration tests for the editor crate

use std::cell::RefCell;
use std::rc::Rc;

use scribe_editor::clean::clean_tree;
use scribe_editor::merge_split::{merge_with_block, split, SplitAt};
use scribe_editor::range_ops::delete_contents;
use scribe_editor::whitespace::fix_cursor;
use scribe_editor::{
    ClassNames, ClipboardData, ClipboardItem, Editor, EditorConfig, EditorEvent, EventType, KeyEvent, KeyOutcome,
    NodeCategory, NodeId, PastePayload, Range, Tree, UndoState,
};

fn tree_with(html: &str) -> Tree {
    let mut tree = Tree::new("div");
    let root = tree.root();
    tree.set_inner_html(root, html).unwrap();
    tree
}

fn editor_with(html: &str) -> Editor {
    let mut editor = Editor::new(EditorConfig::default());
    editor.set_html(html);
    editor
}

fn node_at(editor: &Editor, path: &[usize]) -> NodeId {
    let mut node = editor.root();
    for index in path {
        node = editor.tree().child(node, *index).unwrap();
    }
    node
}

#[test]
fn test_every_node_has_one_category() {
    let tree = tree_with("<div>a<b>b<i>c</i></b><ul><li>x</li></ul></div><blockquote><p>q</p></blockquote><img>");
    let root = tree.root();
    for node in tree.descendants(root) {
        let category = tree.category(node);
        assert_ne!(category, NodeCategory::Unknown, "node {node} unclassified");
        let flags = [tree.is_inline(node), tree.is_block(node), tree.is_container(node)];
        assert_eq!(flags.iter().filter(|f| **f).count(), 1, "node {node} in several categories");
    }
}

#[test]
fn test_split_then_merge_restores_block() {
    let mut tree = tree_with("<div>ab<b>cd</b>ef</div>");
    let root = tree.root();
    let before = tree.inner_html(root);
    let block = tree.first_child(root).unwrap();
    let cd = tree.first_child(tree.child(block, 1).unwrap()).unwrap();

    let after = split(&mut tree, cd, SplitAt::Offset(1), root, root).unwrap().unwrap();
    assert_eq!(tree.inner_html(root), "<div>ab<b>c</b></div><div><b>d</b>ef</div>");

    let mut range = Range::collapsed_at(after, 0);
    merge_with_block(&mut tree, block, after, &mut range, root).unwrap();
    assert_eq!(tree.inner_html(root), before);
}

#[test]
fn test_fix_cursor_is_idempotent_on_whole_documents() {
    let mut tree = tree_with("<div></div><ul><li></li></ul><div><b></b></div>");
    let root = tree.root();
    let settle = |tree: &mut Tree| {
        for node in tree.descendants(root) {
            if tree.parent(node).is_some() {
                fix_cursor(tree, node).unwrap();
            }
        }
        tree.inner_html(root)
    };
    let once = settle(&mut tree);
    let twice = settle(&mut tree);
    assert_eq!(once, twice);
}

#[test]
fn test_clean_collapses_whitespace_but_not_in_pre() {
    let mut tree = tree_with("<div>  hello \n  world  </div><pre>  x  </pre>");
    let root = tree.root();
    clean_tree(&mut tree, root, &ClassNames::default(), false).unwrap();
    assert_eq!(tree.inner_html(root), "<div>hello world</div><pre>  x  </pre>");
}

#[test]
fn test_deleting_everything_leaves_one_focusable_block() {
    let mut tree = tree_with("<ul><li>a</li></ul><blockquote><div>b</div></blockquote><div>c</div>");
    let root = tree.root();
    let mut range = Range::of_contents(&tree, root);
    delete_contents(&mut tree, &mut range, root).unwrap();
    assert_eq!(tree.child_count(root), 1);
    let block = tree.first_child(root).unwrap();
    assert!(tree.is_block(block));
    assert!(!tree.elements_by_tag(block, "br").is_empty());
}

#[test]
fn test_range_containment_is_precise() {
    let tree = tree_with("<div>abc</div><div>def</div>");
    let root = tree.root();
    let first = tree.first_child(root).unwrap();
    let second = tree.last_child(root).unwrap();
    let abc = tree.first_child(first).unwrap();
    let range = Range::new(&tree, abc, 1, abc, 3);
    assert!(range.contains_node(&tree, abc, true));
    assert!(!range.contains_node(&tree, abc, false));
    assert!(!range.contains_node(&tree, second, true));

    let whole = Range::new(&tree, root, 0, root, 1);
    assert!(whole.contains_node(&tree, first, false));
    assert!(!whole.contains_node(&tree, second, true));
}

#[test]
fn test_editing_scenario() {
    let mut editor = editor_with("<div>Hello <b>world</b></div>");
    editor.move_cursor_to_end().remove_bold().type_text(" ");
    assert_eq!(editor.get_html(), "<div>Hello <b>world</b> </div>");

    editor.type_text("again");
    assert_eq!(editor.get_html(), "<div>Hello <b>world</b> again</div>");

    editor.key_down(&KeyEvent::new("Enter"));
    editor.type_text("next");
    let html = editor.get_html();
    assert!(html.starts_with("<div>Hello <b>world</b> again</div><div>next"), "{html}");
    assert_eq!(editor.get_path(), "DIV");
}

#[test]
fn test_undo_history_discipline() {
    let mut editor = editor_with("<div>a</div>");
    assert_eq!(editor.undo_state(), UndoState { can_undo: false, can_redo: false });

    editor.move_cursor_to_end().type_text("b");
    editor.save_undo_state();
    editor.type_text("c");
    assert_eq!(editor.get_html(), "<div>abc</div>");

    editor.undo();
    assert_eq!(editor.get_html(), "<div>ab</div>");
    editor.undo();
    assert_eq!(editor.get_html(), "<div>a</div>");
    assert_eq!(editor.undo_state(), UndoState { can_undo: false, can_redo: true });

    editor.redo();
    assert_eq!(editor.get_html(), "<div>ab</div>");

    // A new edit drops the redo branch.
    editor.move_cursor_to_end().type_text("x");
    assert_eq!(editor.undo_state(), UndoState { can_undo: true, can_redo: false });
    editor.redo();
    assert_eq!(editor.get_html(), "<div>abx</div>");
}

#[test]
fn test_input_fires_once_per_operation() {
    let mut editor = editor_with("<div>a</div><div>b</div>");
    let inputs = Rc::new(RefCell::new(0));
    let sink = inputs.clone();
    editor.on(EventType::Input, move |_| {
        *sink.borrow_mut() += 1;
        Ok(())
    });
    let range = Range::of_contents(editor.tree(), editor.root());
    editor.set_selection(range).make_unordered_list();
    assert_eq!(*inputs.borrow(), 1);
}

#[test]
fn test_vetoed_paste_changes_nothing() {
    let mut editor = editor_with("<div>keep</div>");
    editor.on_will_paste(|event| {
        if matches!(event.payload, PastePayload::Html(_)) {
            event.prevent_default();
        }
        Ok(())
    });
    let text = node_at(&editor, &[0, 0]);
    let selection = Range::new(editor.tree(), text, 1, text, 3);
    editor.set_selection(selection);

    let clipboard = ClipboardData::new(vec![
        ClipboardItem::new("text/html", "<p>other</p>"),
        ClipboardItem::new("text/plain", "other"),
    ]);
    editor.paste(&clipboard);
    assert_eq!(editor.get_html(), "<div>keep</div>");
    assert_eq!(editor.get_selection(), selection);
}

#[test]
fn test_shift_paste_prefers_plain_text() {
    let mut editor = editor_with("<div><br></div>");
    editor.move_cursor_to_start();
    let clipboard = ClipboardData::new(vec![
        ClipboardItem::new("text/html", "<b>bold</b>"),
        ClipboardItem::new("text/plain", "plain"),
    ]);
    editor.key_down(&KeyEvent::new("Shift").shift());
    editor.paste(&clipboard);
    assert_eq!(editor.get_html(), "<div>plain</div>");
}

#[test]
fn test_pasted_markup_is_cleaned() {
    let mut editor = editor_with("<div><br></div>");
    editor.move_cursor_to_start();
    let clipboard = ClipboardData::new(vec![ClipboardItem::new(
        "text/html",
        "<section><p>one <span style=\"font-weight: bold\">two</span></p></section><script>x()</script>",
    )]);
    editor.paste(&clipboard);
    assert_eq!(editor.get_html(), "<p>one <b>two</b></p><div><br></div>");
}

#[test]
fn test_star_space_makes_list_and_undo_restores_marker() {
    let mut editor = editor_with("<div>*</div>");
    editor.move_cursor_to_end();
    assert_eq!(editor.key_down(&KeyEvent::new(" ")), KeyOutcome::Handled);
    assert_eq!(editor.get_html(), "<ul><li><br></li></ul>");
    editor.type_text("item");
    assert_eq!(editor.get_html(), "<ul><li>item</li></ul>");
}

#[test]
fn test_cut_then_paste_moves_content() {
    let mut editor = editor_with("<div>one two</div>");
    let text = node_at(&editor, &[0, 0]);
    editor.set_selection(Range::new(editor.tree(), text, 0, text, 4));
    let mut clipboard = ClipboardData::default();
    assert!(editor.cut(&mut clipboard));
    editor.run_deferred();
    assert_eq!(editor.get_html(), "<div>two</div>");

    editor.move_cursor_to_end().paste(&clipboard);
    let html = editor.get_html();
    assert!(html.starts_with("<div>two"), "{html}");
    assert!(html.contains("one"), "{html}");
}

#[test]
fn test_path_changes_are_reported() {
    let mut editor = editor_with("<div>a<b>b</b></div>");
    let paths = Rc::new(RefCell::new(Vec::new()));
    let sink = paths.clone();
    editor.on(EventType::PathChange, move |event| {
        if let EditorEvent::PathChange { path } = event {
            sink.borrow_mut().push(path.clone());
        }
        Ok(())
    });
    let b = node_at(&editor, &[0, 1, 0]);
    editor.set_selection(Range::collapsed_at(b, 1));
    let a = node_at(&editor, &[0, 0]);
    editor.set_selection(Range::new(editor.tree(), a, 0, b, 1));
    assert_eq!(*paths.borrow(), vec!["DIV>B".to_string(), "(selection)".to_string()]);
}
