//! Tokenised, field-scoped full-text index with incremental update and
//! batch rebuild (spec.md §4.C3), backed by SQLite FTS5.

pub mod index;
pub mod tokenizer;

pub use index::{DocumentFields, InvertedIndex, SearchFilter, SearchHit};
pub use tokenizer::{sanitize_fts5_query, tokenize};
