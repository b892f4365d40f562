//! Generative model completion client.
//!
//! The workflow treats completion as an opaque async collaborator: one prompt
//! in, raw text out. There are no retries here; a failed call surfaces as
//! [`ModelError`] and the step fails with it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("model returned an empty completion")]
    EmptyCompletion,
}

/// A text completion collaborator.
pub trait ModelClient: Send + Sync {
    /// Complete a prompt, returning the raw model text.
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>>;
}

/// Gemini REST implementation of [`ModelClient`].
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the API base URL (tests point this at a local server).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl ModelClient for GeminiClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!(
                "{}/v1beta/models/{}:generateContent",
                self.endpoint, self.model
            );
            let body = json!({
                "contents": [{"parts": [{"text": prompt}]}]
            });

            tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "requesting completion");

            let response = self
                .client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&body)
                .timeout(self.timeout)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                tracing::warn!(status = status.as_u16(), "completion API error");
                return Err(ModelError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: GenerateResponse = response.json().await?;
            let text = parsed
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .map(|c| {
                    c.parts
                        .into_iter()
                        .map(|p| p.text)
                        .collect::<Vec<_>>()
                        .join("")
                })
                .unwrap_or_default();

            let text = text.trim().to_string();
            if text.is_empty() {
                return Err(ModelError::EmptyCompletion);
            }
            Ok(text)
        })
    }
}

/// A scripted completion for [`MockModel`].
#[derive(Clone, Debug)]
pub enum MockCompletion {
    /// Return this text.
    Text(String),
    /// Fail with an API error carrying this message.
    Error(String),
}

/// A hand-rolled mock implementing [`ModelClient`] for tests.
///
/// Returns completions in order, repeating the last one when the sequence is
/// exhausted, and counts calls.
pub struct MockModel {
    /// Each call pops the next completion (last is repeated if exhausted).
    responses: Mutex<Vec<MockCompletion>>,
    fallback: MockCompletion,
    call_count: AtomicUsize,
}

impl MockModel {
    /// Create a mock that always returns `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_sequence(vec![MockCompletion::Text(text.into())])
    }

    /// Create a mock that always fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_sequence(vec![MockCompletion::Error(message.into())])
    }

    /// Create a mock that returns completions in order, repeating the last.
    pub fn with_sequence(mut responses: Vec<MockCompletion>) -> Self {
        assert!(
            !responses.is_empty(),
            "sequence must have at least one completion"
        );
        // Reverse so we can pop() from the front cheaply.
        responses.reverse();
        let fallback = responses.first().cloned().unwrap();
        Self {
            responses: Mutex::new(responses),
            fallback,
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `complete()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> MockCompletion {
        let mut seq = self.responses.lock().unwrap();
        seq.pop().unwrap_or_else(|| self.fallback.clone())
    }
}

impl ModelClient for MockModel {
    fn complete<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let response = self.next_response();
        Box::pin(async move {
            match response {
                MockCompletion::Text(text) => Ok(text),
                MockCompletion::Error(message) => Err(ModelError::Api {
                    status: 500,
                    message,
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_repeats_last_completion() {
        let model = MockModel::with_sequence(vec![
            MockCompletion::Text("first".into()),
            MockCompletion::Text("second".into()),
        ]);
        assert_eq!(model.complete("p").await.unwrap(), "first");
        assert_eq!(model.complete("p").await.unwrap(), "second");
        assert_eq!(model.complete("p").await.unwrap(), "second");
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn mock_error_surfaces_as_api_error() {
        let model = MockModel::failing("quota exceeded");
        let err = model.complete("p").await.unwrap_err();
        assert!(matches!(err, ModelError::Api { status: 500, .. }));
    }
}
