//! The tokenizer/scanner foundation shared by all format readers.
//!
//! This module provides the low-level byte access ([TextSource],
//! [InMemoryTextSource]), the parsing primitives ([TextParser]), and the
//! label escaping utilities the format-specific scanners are built on.

pub mod text_parser;
pub mod text_source;
pub mod utils;

pub use text_parser::TextParser;
pub use text_source::{InMemoryTextSource, TextSource};
