//! Dual narrative/legislative HNSW vector stores (spec.md §4.C2),
//! adapted from `vestige-core::search::vector`.

pub mod encoder;
pub mod index;
pub mod store;

pub use encoder::{HashingEncoder, SentenceEncoder, EMBEDDING_DIMENSIONS};
pub use index::HnswIndex;
pub use store::{Meta, StoreKind, VectorHit, VectorStore};
