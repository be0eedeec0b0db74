//! HTTP completion client (spec.md §4.C1), grounded on
//! `llmspell-providers::abstraction::ProviderInstance` /
//! `local::ollama_provider::OllamaProvider`: a small trait with
//! `complete`/`complete_streaming`/`validate`/`name`, implemented by a
//! struct that owns an HTTP client and delegates.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use mnemos_config::GenerationConfig;
use mnemos_core::MnemosError;
use serde::Deserialize;
use std::time::Duration;

/// A stream of generated token fragments; ends on `[DONE]`, an HTTP
/// error, or a locally-observed stop token.
pub type TokenStream = BoxStream<'static, Result<String, MnemosError>>;

/// Trait implemented by both the large (generation) and small
/// (classification/judging) completion clients (spec.md §4.C1).
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Non-streaming completion. Trims any trailing stop token.
    async fn generate(&self, prompt: &str) -> Result<String, MnemosError>;

    /// Streaming completion; yields content fragments as they arrive.
    async fn stream(&self, prompt: &str) -> Result<TokenStream, MnemosError>;

    /// `/health` probe, used at boot (spec.md §4.C11 "Background boot").
    async fn health_check(&self) -> Result<(), MnemosError>;

    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    stream: bool,
    n_predict: u32,
    temperature: f64,
    top_p: f64,
    stop: &'a [String],
    cache_prompt: bool,
    do_sample: bool,
}

/// Talks to one local inference server over HTTP (spec.md §4.C1: "two
/// HTTP completion clients to local inference servers").
pub struct HttpCompletionClient {
    http: reqwest::Client,
    server_url: String,
    generation: GenerationConfig,
    name: String,
}

impl HttpCompletionClient {
    #[must_use]
    pub fn new(name: impl Into<String>, server_url: impl Into<String>, generation: GenerationConfig) -> Self {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(120)).build().unwrap_or_default();
        Self { http, server_url: server_url.into(), generation, name: name.into() }
    }

    fn request_body<'a>(&'a self, prompt: &'a str, stream: bool) -> CompletionRequest<'a> {
        CompletionRequest {
            prompt,
            stream,
            n_predict: self.generation.max_tokens,
            temperature: self.generation.temperature,
            top_p: self.generation.top_p,
            stop: &self.generation.stop_tokens,
            cache_prompt: self.generation.cache_prompt,
            do_sample: self.generation.do_sample,
        }
    }

    /// Trims the first stop token found at the tail of `text` — backend
    /// control tokens never leak into agent output.
    fn trim_stop_tokens(&self, mut text: String) -> String {
        for stop in &self.generation.stop_tokens {
            if !stop.is_empty() {
                if let Some(stripped) = text.strip_suffix(stop.as_str()) {
                    text = stripped.to_string();
                }
            }
        }
        text
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn generate(&self, prompt: &str) -> Result<String, MnemosError> {
        tracing::debug!(client = %self.name, "generate: delegating to inference server");
        let url = format!("{}/completion", self.server_url.trim_end_matches('/'));
        let body = self.request_body(prompt, false);

        let resp = self.http.post(&url).json(&body).send().await.map_err(|e| {
            tracing::warn!(client = %self.name, error = %e, "completion request failed");
            MnemosError::provider(format!("{}: {e}", self.name))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(MnemosError::provider(format!("{} returned HTTP {status}", self.name)));
        }

        let parsed: CompletionResponse = resp.json().await.map_err(|e| MnemosError::provider(format!("{}: malformed response: {e}", self.name)))?;

        if let Some(error) = parsed.error {
            return Err(MnemosError::provider(format!("{}: {error}", self.name)));
        }
        let text = parsed.content.or(parsed.response).unwrap_or_default();
        Ok(self.trim_stop_tokens(text))
    }

    async fn stream(&self, prompt: &str) -> Result<TokenStream, MnemosError> {
        tracing::debug!(client = %self.name, "stream: delegating to inference server");
        let url = format!("{}/completion", self.server_url.trim_end_matches('/'));
        let body = self.request_body(prompt, true);

        let resp = self.http.post(&url).json(&body).send().await.map_err(|e| MnemosError::provider(format!("{}: {e}", self.name)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(MnemosError::provider(format!("{} returned HTTP {status}", self.name)));
        }

        let stop_tokens = self.generation.stop_tokens.clone();
        let client_name = self.name.clone();
        let byte_stream = resp.bytes_stream();

        let token_stream = async_stream::stream! {
            let mut buffer = String::new();
            futures::pin_mut!(byte_stream);
            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(MnemosError::provider(format!("{client_name}: stream error: {e}")));
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(newline_pos) = buffer.find('\n') {
                    let line = buffer[..newline_pos].trim().to_string();
                    buffer.drain(..=newline_pos);
                    let Some(payload) = line.strip_prefix("data:") else { continue };
                    let payload = payload.trim();
                    if payload == "[DONE]" {
                        return;
                    }
                    let Ok(parsed) = serde_json::from_str::<CompletionResponse>(payload) else { continue };
                    if let Some(error) = parsed.error {
                        yield Err(MnemosError::provider(format!("{client_name}: {error}")));
                        return;
                    }
                    let mut content = parsed.content.or(parsed.response).unwrap_or_default();
                    // Belt-and-braces local stop-token guard (spec.md §4.C1):
                    // cut the stream even if the server fails to honour `stop`.
                    let mut hit_stop = false;
                    for stop in &stop_tokens {
                        if !stop.is_empty() {
                            if let Some(idx) = content.find(stop.as_str()) {
                                content.truncate(idx);
                                hit_stop = true;
                                break;
                            }
                        }
                    }
                    if !content.is_empty() {
                        yield Ok(content);
                    }
                    if hit_stop {
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(token_stream))
    }

    async fn health_check(&self) -> Result<(), MnemosError> {
        let url = format!("{}/health", self.server_url.trim_end_matches('/'));
        let resp = self.http.get(&url).send().await.map_err(|e| MnemosError::provider(format!("{}: health check failed: {e}", self.name)))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(MnemosError::provider(format!("{} health check returned HTTP {}", self.name, resp.status())))
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn generate_trims_trailing_stop_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/completion"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"content": "hello</s>"})))
            .mount(&server)
            .await;

        let mut generation = GenerationConfig::default();
        generation.stop_tokens = vec!["</s>".to_string()];
        let client = HttpCompletionClient::new("large", server.uri(), generation);
        let text = client.generate("hi").await.unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn generate_surfaces_server_error_as_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/completion"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "out of memory"})))
            .mount(&server)
            .await;

        let client = HttpCompletionClient::new("large", server.uri(), GenerationConfig::default());
        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, MnemosError::Provider { .. }));
    }

    #[tokio::test]
    async fn health_check_reports_non_2xx_as_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).and(path("/health")).respond_with(ResponseTemplate::new(503)).mount(&server).await;

        let client = HttpCompletionClient::new("large", server.uri(), GenerationConfig::default());
        assert!(client.health_check().await.is_err());
    }
}
