// src/generate/backend.rs
//! Generative text backend: provider abstraction, OpenAI-compatible client, mock and
//! disabled variants.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::BackendError;

pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send + 'a>>;

/// `complete(system, user, max_tokens, temperature) -> text`.
pub trait TextBackend: Send + Sync {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        max_tokens: u32,
        temperature: f32,
    ) -> CompletionFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynBackend = Arc<dyn TextBackend>;

/// Factory: build a backend according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock` (or provider `mock`), returns the deterministic mock.
/// * Else if `backend.enabled == false`, returns a disabled backend.
/// * Else builds the OpenAI-compatible client.
pub fn build_backend_from_config(cfg: &PipelineConfig) -> anyhow::Result<DynBackend> {
    let mock_env = std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false);
    if mock_env || cfg.backend.provider == "mock" {
        return Ok(Arc::new(MockBackend));
    }
    if !cfg.backend.enabled {
        return Ok(Arc::new(DisabledBackend));
    }
    match cfg.backend.provider.as_str() {
        "openai" => {
            // Without a key every call fails as Unavailable; the service still starts.
            let key = cfg.resolve_api_key().unwrap_or_else(|e| {
                tracing::warn!(target: "generator", error = %e, "no api key; generation will fail");
                String::new()
            });
            Ok(Arc::new(OpenAiBackend::new(
                &cfg.backend.base_url,
                key,
                &cfg.backend.model,
                Duration::from_secs(cfg.backend.timeout_secs.max(1)),
            )?))
        }
        other => anyhow::bail!("Unsupported backend provider in config: {other}"),
    }
}

/// OpenAI Chat Completions (or any compatible endpoint).
pub struct OpenAiBackend {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("trend-press/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
        })
    }
}

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
    #[serde(default)]
    content: Option<String>,
}

fn map_reqwest_err(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Unavailable(e.to_string())
    }
}

impl TextBackend for OpenAiBackend {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        max_tokens: u32,
        temperature: f32,
    ) -> CompletionFuture<'a> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return Err(BackendError::Unavailable("missing api key".to_string()));
            }
            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: system,
                    },
                    Msg {
                        role: "user",
                        content: user,
                    },
                ],
                temperature,
                max_tokens,
            };

            let resp = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .map_err(map_reqwest_err)?;

            let status = resp.status();
            if !status.is_success() {
                return Err(BackendError::Unavailable(format!("status {status}")));
            }
            let body: Resp = resp.json().await.map_err(map_reqwest_err)?;
            Ok(body
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .unwrap_or_default())
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Always fails with `Disabled`.
pub struct DisabledBackend;

impl TextBackend for DisabledBackend {
    fn complete<'a>(
        &'a self,
        _system: &'a str,
        _user: &'a str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> CompletionFuture<'a> {
        Box::pin(async { Err(BackendError::Disabled) })
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic offline backend for local runs. Answers both prompt stages in the
/// requested format, echoing the `Topic:` line of the user prompt.
pub struct MockBackend;

impl MockBackend {
    fn topic_of(user: &str) -> String {
        user.lines()
            .find_map(|l| l.trim().strip_prefix("Topic:"))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Trending Topic".to_string())
    }
}

impl TextBackend for MockBackend {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> CompletionFuture<'a> {
        let topic = Self::topic_of(user);
        let seo_stage = system.contains("SEO");
        Box::pin(async move {
            if seo_stage {
                return Ok(serde_json::json!({
                    "metaTitle": format!("{topic}: What You Need to Know"),
                    "metaDescription": format!("A quick, factual rundown of why {topic} is trending today."),
                    "keywords": [topic.to_lowercase(), "trending", "news"],
                    "ogTitle": format!("{topic} Explained"),
                    "ogDescription": format!("Why everyone is talking about {topic}."),
                })
                .to_string());
            }
            Ok(format!(
                "TITLE: {topic} Explained: Why It Is Trending\n\
                 EXCERPT: {topic} is drawing attention today. Here is what happened and why it matters.\n\
                 TAGS: {lower}, trending, explainer\n\
                 CONTENT:\n\
                 ## What happened\n\n\
                 Interest in {topic} spiked over the last few hours as people searched for context.\n\n\
                 ## Why it matters\n\n\
                 The story touches on broader questions that readers keep returning to.\n",
                lower = topic.to_lowercase()
            ))
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
