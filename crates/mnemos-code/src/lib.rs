//! Code subsystem (spec.md §4.C10): tree-sitter Python static analysis,
//! a code-chunk vector index, and a RAG adapter exposing code-aware
//! retrieval plus a file-watch-driven re-indexing worker.

pub mod analyzer;
pub mod chunks;
pub mod rag;
pub mod skeleton;
pub mod watcher;

pub use analyzer::{analyze_module, build_project_architecture, discover_python_files};
pub use chunks::{build_pending_chunks, embedding_text, meta_to_context, rebuild_code_vector_store, PendingChunk};
pub use rag::CodeSubsystem;
pub use skeleton::{full_skeleton, skeleton_for};
pub use watcher::watch_and_reindex;
