//! Retrieval Agent (spec.md §4.C6): the unified read API over rules,
//! READMEs, technical documentation, vector memory (with context swap
//! and intent boost), chronological history, verbatim search,
//! project-file introspection, and the inverted index.

pub mod agent;
pub mod history;
pub mod index_search;
pub mod maintenance;
pub mod project_files;
pub mod readmes;
pub mod rules;
pub mod tokens;
pub mod vector_memory;
pub mod verbatim;

pub use agent::RetrievalAgent;
pub use maintenance::{classification_counts, rebuild_index, update_index_file, ClassificationCounts};
pub use vector_memory::{find_consolidated_summary, retrieve_vector_context};
