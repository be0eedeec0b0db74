//! HTTP completion clients for the large (generation) and small
//! (classification/judging) local inference servers (spec.md §4.C1).

pub mod client;
pub mod small_model;

pub use client::{CompletionClient, HttpCompletionClient, TokenStream};
pub use small_model::{SerializedClient, SharedSmallModel};
