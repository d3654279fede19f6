//! Chat-completion client abstraction.
//!
//! Every model interaction in the dashboard is a two-role exchange: a
//! system instruction plus one user message, answered with free text.
//! [`ChatClient`] captures exactly that, so discovery and presence checks
//! can be driven by the real [`OpenAiChatClient`] or by a scripted client
//! in tests.
//!
//! Calls are made once. There is no retry or backoff; a failed call is
//! reported to the caller, which decides whether it is fatal.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;

/// A language-model service that answers a system + user prompt pair.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Returns the model's reply with surrounding whitespace removed. The
    /// reply may be empty; callers decide what that means.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for OpenAI-compatible `POST /v1/chat/completions` endpoints.
pub struct OpenAiChatClient {
    http: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl OpenAiChatClient {
    /// Build a client for one run. The timeout from `config` is the only
    /// per-call limit applied.
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            url: format!("{}/v1/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: api_key.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        tracing::debug!(model = %self.model, "sending chat completion");

        let response = self
            .http
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to call OpenAI API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        parse_chat_response(parsed)
    }
}

fn parse_chat_response(response: ChatResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))?;

    Ok(content.trim().to_string())
}

/// A client that replays canned replies in order and records each prompt.
#[cfg(test)]
pub(crate) struct ScriptedClient {
    replies: std::sync::Mutex<std::collections::VecDeque<std::result::Result<String, String>>>,
    pub(crate) calls: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl ScriptedClient {
    pub(crate) fn new(replies: Vec<std::result::Result<&str, &str>>) -> Self {
        Self {
            replies: std::sync::Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl ChatClient for ScriptedClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(msg)) => bail!("{}", msg),
            None => bail!("no scripted reply left"),
        }
    }
}
