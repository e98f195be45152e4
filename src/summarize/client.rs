// src/summarize/client.rs
//! Chat-completion backend seam and the OpenAI-compatible HTTP client.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One completion invocation: system instruction, user content, sampling
/// bounds.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Seam over the external completion service so the pipeline can be
/// exercised with scripted backends in tests.
#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Returns the completion text. A blank completion is an error; callers
    /// rely on `Ok` carrying usable content.
    async fn complete(&self, req: &CompletionRequest) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint. The
/// service is treated as unreliable: timeouts, non-200 statuses, and
/// malformed bodies all surface as errors for the retry layer.
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatClient {
    pub fn new(base_url: &str, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("freshrss-digest/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait::async_trait]
impl CompletionBackend for OpenAiCompatClient {
    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let body = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &req.system,
                },
                Msg {
                    role: "user",
                    content: &req.user,
                },
            ],
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        };

        let started = Instant::now();
        let resp = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("completion request failed")?;

        let status = resp.status();
        if !status.is_success() {
            counter!("digest_completion_errors_total").increment(1);
            let detail = resp.text().await.unwrap_or_default();
            bail!("completion request returned {status}: {detail}");
        }

        let parsed: Resp = resp
            .json()
            .await
            .context("completion response was not valid JSON")?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();

        let elapsed = started.elapsed();
        histogram!("digest_completion_ms").record(elapsed.as_millis() as f64);
        debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            chars = content.chars().count(),
            "completion call finished"
        );

        if content.is_empty() {
            counter!("digest_completion_errors_total").increment(1);
            bail!("completion response had no content");
        }
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openai-compat"
    }
}

/// Fixed-output backend for tests and local dry runs.
#[derive(Clone)]
pub struct MockBackend {
    pub fixed: String,
}

#[async_trait::async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, _req: &CompletionRequest) -> Result<String> {
        Ok(self.fixed.clone())
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_joins_without_double_slash() {
        let client = OpenAiCompatClient::new("https://api.example.com/v1/", "key", "model");
        assert_eq!(client.api_url, "https://api.example.com/v1/chat/completions");
        let client = OpenAiCompatClient::new("https://api.example.com/v1", "key", "model");
        assert_eq!(client.api_url, "https://api.example.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn mock_backend_returns_fixed_output() {
        let backend = MockBackend {
            fixed: "- bullet".to_string(),
        };
        let req = CompletionRequest {
            system: "s".into(),
            user: "u".into(),
            temperature: 0.5,
            max_tokens: 100,
        };
        assert_eq!(backend.complete(&req).await.unwrap(), "- bullet");
    }
}
