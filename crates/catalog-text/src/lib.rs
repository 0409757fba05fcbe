//! catalog-text
//!
//! Tantivy-backed lexical lookup: case-insensitive substring matching over
//! product names and short descriptions.
pub mod tantivy_utils;
pub mod index;

pub use index::TantivyLexicalIndex;
