//! Editor configuration
//!
//! Plain settings deserialize from camelCase JSON; injected callables live in
//! [`Hooks`] and are never serialized.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::{EditorError, EditorResult};
use crate::sanitize::{DefaultSanitizer, Sanitizer};

/// Attribute name to value, in a stable order.
pub type AttributeMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Tag used for new paragraphs
    #[serde(default = "default_block_tag")]
    pub block_tag: String,

    /// Attributes put on every new paragraph
    #[serde(default)]
    pub block_attributes: AttributeMap,

    /// Default attributes per tag (`a`, `li`, `ol`, `ul`, `blockquote`, `pre`, `code`)
    #[serde(default)]
    pub tag_attributes: BTreeMap<String, AttributeMap>,

    #[serde(default)]
    pub class_names: ClassNames,

    #[serde(default)]
    pub undo: UndoConfig,

    /// Turn typed or pasted URLs and e-mail addresses into links
    #[serde(default = "default_true")]
    pub add_links: bool,

    #[serde(default)]
    pub platform: PlatformConfig,

    #[serde(skip)]
    pub hooks: Hooks,
}

fn default_block_tag() -> String {
    "div".to_string()
}

fn default_true() -> bool {
    true
}

/// Class names that mark semantic spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassNames {
    #[serde(default = "default_color_class")]
    pub color: String,
    #[serde(default = "default_font_family_class")]
    pub font_family: String,
    #[serde(default = "default_font_size_class")]
    pub font_size: String,
    #[serde(default = "default_highlight_class")]
    pub highlight: String,
}

fn default_color_class() -> String {
    "color".to_string()
}

fn default_font_family_class() -> String {
    "font".to_string()
}

fn default_font_size_class() -> String {
    "size".to_string()
}

fn default_highlight_class() -> String {
    "highlight".to_string()
}

impl Default for ClassNames {
    fn default() -> Self {
        Self {
            color: default_color_class(),
            font_family: default_font_family_class(),
            font_size: default_font_size_class(),
            highlight: default_highlight_class(),
        }
    }
}

/// Undo history limits; `-1` disables a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoConfig {
    #[serde(default = "unlimited")]
    pub document_size_threshold: i64,
    #[serde(default = "unlimited")]
    pub undo_limit: i64,
}

fn unlimited() -> i64 {
    -1
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            document_size_threshold: unlimited(),
            undo_limit: unlimited(),
        }
    }
}

/// Host platform quirks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    /// The caret cannot rest in an empty text node, so placeholders use U+200B
    #[serde(default)]
    pub cant_focus_empty_text_nodes: bool,
    #[serde(default)]
    pub is_mac: bool,
    #[serde(default)]
    pub is_win: bool,
}

pub type ErrorHook = Rc<dyn Fn(&EditorError)>;
pub type TextTransform = Rc<dyn Fn(&str) -> String>;

/// Callables injected by the host.
#[derive(Clone)]
pub struct Hooks {
    pub sanitizer: Rc<dyn Sanitizer>,
    /// Receives every error caught at an operation boundary
    pub did_error: ErrorHook,
    /// Rewrites copied HTML before it reaches the clipboard
    pub will_cut_copy: Option<TextTransform>,
    /// Derives the plain-text clipboard item from copied HTML
    pub to_plain_text: Option<TextTransform>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            sanitizer: Rc::new(DefaultSanitizer::default()),
            did_error: Rc::new(|err: &EditorError| error!(error = %err, "Editor operation failed")),
            will_cut_copy: None,
            to_plain_text: None,
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("will_cut_copy", &self.will_cut_copy.is_some())
            .field("to_plain_text", &self.to_plain_text.is_some())
            .finish_non_exhaustive()
    }
}

impl EditorConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> EditorResult<Self> {
        let mut config: EditorConfig = serde_json::from_str(json)?;
        config.block_tag = config.block_tag.to_ascii_lowercase();
        Ok(config)
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Modifier prefix of the platform's command key.
    pub fn ctrl_key(&self) -> &'static str {
        if self.platform.is_mac {
            "Meta-"
        } else {
            "Ctrl-"
        }
    }

    /// Default attributes for `tag`, as an ordered list.
    pub fn attributes_for(&self, tag: &str) -> Vec<(String, String)> {
        self.tag_attributes
            .get(tag)
            .map(to_pairs)
            .unwrap_or_default()
    }

    pub fn block_attribute_pairs(&self) -> Vec<(String, String)> {
        to_pairs(&self.block_attributes)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            block_tag: default_block_tag(),
            block_attributes: AttributeMap::new(),
            tag_attributes: BTreeMap::new(),
            class_names: ClassNames::default(),
            undo: UndoConfig::default(),
            add_links: true,
            platform: PlatformConfig::default(),
            hooks: Hooks::default(),
        }
    }
}

pub fn to_pairs(map: &AttributeMap) -> Vec<(String, String)> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "blockTag": "P",
            "blockAttributes": { "class": "para" },
            "tagAttributes": { "a": { "target": "_blank" } },
            "classNames": { "color": "colour" },
            "undo": { "undoLimit": 20 },
            "addLinks": false,
            "platform": { "isMac": true }
        }"#;

        let config = EditorConfig::from_json(json).unwrap();
        assert_eq!(config.block_tag, "p");
        assert_eq!(config.block_attribute_pairs(), vec![("class".to_string(), "para".to_string())]);
        assert_eq!(config.attributes_for("a"), vec![("target".to_string(), "_blank".to_string())]);
        assert_eq!(config.class_names.color, "colour");
        assert_eq!(config.class_names.font_size, "size");
        assert_eq!(config.undo.undo_limit, 20);
        assert_eq!(config.undo.document_size_threshold, -1);
        assert!(!config.add_links);
        assert_eq!(config.ctrl_key(), "Meta-");
    }

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.block_tag, "div");
        assert!(config.add_links);
        assert!(!config.platform.cant_focus_empty_text_nodes);
        assert_eq!(config.ctrl_key(), "Ctrl-");
        assert!(config.attributes_for("li").is_empty());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let err = EditorConfig::from_json("{ \"addLinks\": 3 }").unwrap_err();
        assert!(matches!(err, EditorError::Config(_)));
    }
}
