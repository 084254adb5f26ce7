//! # Scribe DOM
//!
//! Mutable document tree used by the Scribe editing engine.
//!
//! ## Design
//!
//! - [`Document`] is an arena; nodes are addressed by copyable [`NodeId`]s
//! - HTML is tokenized with logos ([`lexer`]) and built into fragments by [`parser`]
//! - [`serializer`] writes markup back out with minimal escaping
//! - Changes under an observed root are recorded so callers can react once per
//!   operation instead of per edit
//!
//! ```rust
//! use scribe_dom::Document;
//!
//! let mut doc = Document::new();
//! let root = doc.create_element("div");
//! doc.set_inner_html(root, "<p>Hello <b>world</b></p>").unwrap();
//! assert_eq!(doc.text_content(root), "Hello world");
//! ```

pub mod error;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod serializer;
pub mod style;

mod entities;

pub use entities::decode as decode_entities;
pub use error::{DomError, DomResult};
pub use node::{ChangeKind, Document, ElementData, NodeId, NodeKind};
