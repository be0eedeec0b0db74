//! Serializes calls to the small model (classification + judging) behind a
//! process-wide mutex, per spec.md §4.C1: "a classification and a judge
//! call cannot race on the shared backend."

use crate::client::{CompletionClient, TokenStream};
use async_trait::async_trait;
use mnemos_core::MnemosError;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Wraps any `CompletionClient` with a mutex so concurrent callers queue
/// rather than interleave requests against the same backend process.
pub struct SerializedClient<C: CompletionClient> {
    inner: C,
    lock: Mutex<()>,
}

impl<C: CompletionClient> SerializedClient<C> {
    #[must_use]
    pub fn new(inner: C) -> Self {
        Self { inner, lock: Mutex::new(()) }
    }
}

#[async_trait]
impl<C: CompletionClient> CompletionClient for SerializedClient<C> {
    async fn generate(&self, prompt: &str) -> Result<String, MnemosError> {
        let _guard = self.lock.lock().await;
        self.inner.generate(prompt).await
    }

    async fn stream(&self, prompt: &str) -> Result<TokenStream, MnemosError> {
        let _guard = self.lock.lock().await;
        self.inner.stream(prompt).await
    }

    async fn health_check(&self) -> Result<(), MnemosError> {
        self.inner.health_check().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Shared handle to the small model, held by both the Judge and the
/// intent classifier (spec.md §4.C7, §4.C11).
pub type SharedSmallModel = Arc<dyn CompletionClient>;
