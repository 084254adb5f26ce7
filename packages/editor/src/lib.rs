//! # Scribe Editor
//!
//! Rich-text editing engine over a [`scribe_dom`] tree: range algebra,
//! tree normalization, paste cleaning, block and inline formatting, and
//! snapshot undo.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ host events: keyboard, input, clipboard     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: public operations                   │
//! │  - Selection and path tracking              │
//! │  - Undo snapshots and change notifications  │
//! │  - Deferred tasks for the host's next tick  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ range_ops / merge_split / clean             │
//! │  - Narrow, extract and insert ranges        │
//! │  - Split and merge inlines, blocks, lists   │
//! │  - Sanitize and normalize pasted markup     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ tree: scribe-dom + node classification      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Every block stays focusable**: empty blocks get a `<br>`, empty
//!    inlines a placeholder text node
//! 2. **Ranges are values**: operations return the range they leave
//!    behind instead of relying on live updates
//! 3. **Operations never fail outward**: errors go to the `did_error` hook
//! 4. **One change per operation**: undo state and `input` fire once
//!
//! ## Usage
//!
//! ```rust
//! use scribe_editor::{Editor, EditorConfig};
//!
//! let mut editor = Editor::new(EditorConfig::default());
//! editor.set_html("<div>Hello <b>world</b></div>");
//! editor.move_cursor_to_end().remove_bold().type_text(" ");
//! assert_eq!(editor.get_html(), "<div>Hello <b>world</b> </div>");
//! ```

pub mod blocks;
pub mod clean;
pub mod clipboard;
pub mod config;
pub mod content;
pub mod editor;
pub mod errors;
pub mod events;
pub mod format;
pub mod input;
pub mod keyboard;
pub mod links;
pub mod merge_split;
pub mod node_ops;
pub mod range;
pub mod range_ops;
pub mod sanitize;
pub mod tree;
pub mod undo_stack;
pub mod walker;
pub mod whitespace;

pub use clipboard::{ClipboardData, ClipboardItem, PasteRoute};
pub use config::{ClassNames, EditorConfig, Hooks, PlatformConfig, UndoConfig};
pub use editor::{DeferredTask, Editor, FontInfo};
pub use errors::{EditorError, EditorResult};
pub use events::{EditorEvent, EventType, ListenerId, PastePayload, WillPasteEvent};
pub use format::Format;
pub use input::InputEvent;
pub use keyboard::{KeyAction, KeyEvent, KeyHandler, KeyOutcome};
pub use range::{Boundary, Range};
pub use sanitize::{DefaultSanitizer, SanitizeOptions, Sanitizer};
pub use tree::{NodeCategory, Tree};
pub use undo_stack::{UndoStack, UndoState};

pub use scribe_dom::NodeId;
