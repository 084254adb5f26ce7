//! # Input Events
//!
//! Maps host `beforeinput` events onto editing operations. Input types the
//! editor does not handle are left to the host.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::editor::Editor;
use crate::keyboard::KeyOutcome;

/// A `beforeinput` event: the input type and its optional payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputEvent {
    pub input_type: String,
    #[serde(default)]
    pub data: Option<String>,
}

impl InputEvent {
    pub fn new(input_type: impl Into<String>, data: Option<&str>) -> Self {
        Self {
            input_type: input_type.into(),
            data: data.map(str::to_string),
        }
    }
}

impl Editor {
    pub fn before_input(&mut self, event: &InputEvent) -> KeyOutcome {
        let data = event.data.as_deref();
        match event.input_type.as_str() {
            "insertText" => {
                self.type_text(data.unwrap_or_default());
            }
            "insertLineBreak" => {
                self.split_block(true, None);
            }
            "insertParagraph" => {
                self.split_block(false, None);
            }
            "insertOrderedList" => {
                self.make_ordered_list();
            }
            "insertUnorderedList" => {
                self.make_unordered_list();
            }
            "historyUndo" => {
                self.undo();
            }
            "historyRedo" => {
                self.redo();
            }
            "formatBold" => {
                self.bold();
            }
            "formatItalic" => {
                self.italic();
            }
            "formatUnderline" => {
                self.underline();
            }
            "formatStrikeThrough" => {
                self.strikethrough();
            }
            "formatSuperscript" => {
                self.superscript();
            }
            "formatSubscript" => {
                self.subscript();
            }
            justify @ ("formatJustifyFull" | "formatJustifyCenter" | "formatJustifyRight" | "formatJustifyLeft") => {
                let alignment = match &justify["formatJustify".len()..] {
                    "Full" => "justify".to_string(),
                    other => other.to_ascii_lowercase(),
                };
                self.set_text_alignment(Some(&alignment));
            }
            "formatRemove" => {
                self.remove_all_formatting(None);
            }
            "formatSetBlockTextDirection" => {
                self.set_text_direction(data.filter(|d| *d != "null"));
            }
            "formatBackColor" => {
                self.set_highlight_color(data);
            }
            "formatFontColor" => {
                self.set_text_color(data);
            }
            "formatFontName" => {
                self.set_font_face(data);
            }
            other => {
                debug!(input_type = other, "Input left to host");
                return KeyOutcome::Default;
            }
        }
        KeyOutcome::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::range::Range;

    fn editor_with(html: &str) -> Editor {
        let mut editor = Editor::new(EditorConfig::default());
        editor.set_html(html);
        editor
    }

    #[test]
    fn test_insert_text_types_at_caret() {
        let mut editor = editor_with("<div>a</div>");
        editor.move_cursor_to_end();
        let outcome = editor.before_input(&InputEvent::new("insertText", Some("bc")));
        assert_eq!(outcome, KeyOutcome::Handled);
        assert_eq!(editor.get_html(), "<div>abc</div>");
    }

    #[test]
    fn test_insert_paragraph_splits_block() {
        let mut editor = editor_with("<div>ab</div>");
        let text = editor.tree().first_child(editor.tree().first_child(editor.root()).unwrap()).unwrap();
        editor.set_selection(Range::collapsed_at(text, 1));
        editor.before_input(&InputEvent::new("insertParagraph", None));
        assert_eq!(editor.get_html(), "<div>a</div><div>b</div>");
    }

    #[test]
    fn test_justify_full_means_justify() {
        let mut editor = editor_with("<div>a</div>");
        editor.move_cursor_to_start();
        editor.before_input(&InputEvent::new("formatJustifyFull", None));
        assert_eq!(
            editor.get_html(),
            "<div class=\"align-justify\" style=\"text-align: justify;\">a</div>"
        );
    }

    #[test]
    fn test_unknown_input_is_left_to_host() {
        let mut editor = editor_with("<div>a</div>");
        let outcome = editor.before_input(&InputEvent::new("deleteByDrag", None));
        assert_eq!(outcome, KeyOutcome::Default);
        assert_eq!(editor.get_html(), "<div>a</div>");
    }

    #[test]
    fn test_input_event_from_json() {
        let event: InputEvent =
            serde_json::from_str(r#"{"inputType":"formatSetBlockTextDirection","data":"rtl"}"#).unwrap();
        assert_eq!(event, InputEvent::new("formatSetBlockTextDirection", Some("rtl")));
    }
}
