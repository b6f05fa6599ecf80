//! Fallback-selector suggestions from a generative-text service.
//!
//! The collaborator is a narrow, swappable interface: prompt text in, free
//! text out. Resolution correctness never depends on model output content;
//! a slow, rate-limited, or absent service degrades to an empty suggestion
//! list. Suggestions are surfaced to operators for catalog maintenance and
//! are never fed back into live resolution.

use crate::config::DEFAULT_HEAL_LIMIT;
use crate::resolve::ResolutionResult;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from a completion backend.
#[derive(Debug, Error)]
pub enum SuggestError {
    /// Backend unavailable or misbehaving
    #[error("completion backend error: {0}")]
    Backend(String),

    /// Server returned an error status
    #[error("API error {status}: {body}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// HTTP request failed
    #[cfg(feature = "suggest")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Text-completion capability: prompt in, free text out.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Complete a prompt.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the service is unavailable or rejects
    /// the request.
    async fn complete(&self, prompt: &str) -> Result<String, SuggestError>;
}

/// Render a failed resolution into a prompt asking for alternative
/// selectors.
#[must_use]
pub fn fallback_prompt(failed: &ResolutionResult, limit: usize) -> String {
    let mut prompt = String::from(
        "You are a test automation assistant. A UI element could not be \
         located; every known selector was tried against the live page \
         without a match.\n",
    );
    prompt.push_str(&format!("Element name: {}\n", failed.requested));
    prompt.push_str("Selectors already tried, in order:\n");
    for attempt in &failed.trail {
        prompt.push_str(&format!("  {} (no match)\n", attempt.selector));
    }
    prompt.push_str(&format!(
        "Propose up to {limit} alternative CSS selectors for the same \
         element, most likely first. Reply with one selector per line and \
         nothing else.\n"
    ));
    prompt
}

/// Extract at most `limit` plausible selector lines from free text.
///
/// Strips code fences, bullets, numbering, and surrounding backticks;
/// drops prose lines and duplicates while preserving order.
#[must_use]
pub fn parse_suggestions(text: &str, limit: usize) -> Vec<String> {
    let mut suggestions: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("```") {
            continue;
        }
        let line = line
            .trim_start_matches(['-', '*'])
            .trim_start_matches(|c: char| c.is_ascii_digit())
            .trim_start_matches(['.', ')'])
            .trim()
            .trim_matches('`')
            .trim();
        if line.is_empty() {
            continue;
        }
        let looks_like_selector = !line.contains(char::is_whitespace)
            || line.contains(['#', '.', '[', '>', '/', ':']);
        if !looks_like_selector {
            continue;
        }
        if suggestions.iter().any(|s| s == line) {
            continue;
        }
        suggestions.push(line.to_string());
        if suggestions.len() >= limit {
            break;
        }
    }
    suggestions
}

/// Suggests catalog fallbacks for elements that failed to resolve.
#[derive(Debug, Clone)]
pub struct SelectorSuggester<C> {
    client: C,
    heal_limit: usize,
}

impl<C: CompletionClient> SelectorSuggester<C> {
    /// Create a suggester over a completion client
    #[must_use]
    pub fn new(client: C) -> Self {
        Self {
            client,
            heal_limit: DEFAULT_HEAL_LIMIT,
        }
    }

    /// Cap the number of suggestions requested and returned
    #[must_use]
    pub const fn with_heal_limit(mut self, heal_limit: usize) -> Self {
        self.heal_limit = heal_limit;
        self
    }

    /// Suggest alternative selectors for a failed resolution.
    ///
    /// Best-effort: backend failures are swallowed and yield an empty
    /// list, so an unavailable service cannot affect the caller.
    pub async fn suggest(&self, failed: &ResolutionResult) -> Vec<String> {
        let prompt = fallback_prompt(failed, self.heal_limit);
        match self.client.complete(&prompt).await {
            Ok(text) => parse_suggestions(&text, self.heal_limit),
            Err(error) => {
                tracing::warn!(
                    target: "sanar::suggest",
                    requested = %failed.requested,
                    %error,
                    "suggestion backend unavailable; continuing without suggestions"
                );
                Vec::new()
            }
        }
    }
}

/// OpenAI-compatible chat completion backend.
///
/// Works against any server exposing `/v1/chat/completions`. Requests use
/// a low temperature so selector suggestions stay stable across runs.
#[cfg(feature = "suggest")]
pub mod http {
    use super::{CompletionClient, SuggestError};
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    /// Sampling temperature for selector suggestions
    const SUGGEST_TEMPERATURE: f64 = 0.1;

    /// Token budget for a suggestion response
    const SUGGEST_MAX_TOKENS: u32 = 2048;

    /// Chat message role.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum Role {
        /// System prompt
        System,
        /// User message
        User,
        /// Assistant response
        Assistant,
    }

    /// A single chat message.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ChatMessage {
        /// The role of the message author
        pub role: Role,
        /// The content of the message
        pub content: String,
    }

    #[derive(Debug, Clone, Serialize)]
    struct ChatRequest {
        model: String,
        messages: Vec<ChatMessage>,
        temperature: f64,
        max_tokens: u32,
    }

    #[derive(Debug, Clone, Deserialize)]
    struct ChatChoice {
        message: ChatMessage,
    }

    #[derive(Debug, Clone, Deserialize)]
    struct ChatResponse {
        choices: Vec<ChatChoice>,
    }

    /// HTTP client for an OpenAI-compatible completion endpoint.
    #[derive(Debug, Clone)]
    pub struct HttpCompletionClient {
        base_url: String,
        model: String,
        client: reqwest::Client,
    }

    impl HttpCompletionClient {
        /// Create a client pointing at the given base URL.
        pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default();
            Self {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                model: model.into(),
                client,
            }
        }

        /// Returns the base URL.
        #[must_use]
        pub fn base_url(&self) -> &str {
            &self.base_url
        }

        /// Returns the model name.
        #[must_use]
        pub fn model(&self) -> &str {
            &self.model
        }
    }

    #[async_trait]
    impl CompletionClient for HttpCompletionClient {
        async fn complete(&self, prompt: &str) -> Result<String, SuggestError> {
            let request = ChatRequest {
                model: self.model.clone(),
                messages: vec![ChatMessage {
                    role: Role::User,
                    content: prompt.to_string(),
                }],
                temperature: SUGGEST_TEMPERATURE,
                max_tokens: SUGGEST_MAX_TOKENS,
            };

            let url = format!("{}/v1/chat/completions", self.base_url);
            let resp = self.client.post(&url).json(&request).send().await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(SuggestError::ApiError {
                    status: status.as_u16(),
                    body,
                });
            }

            let response: ChatResponse = resp.json().await?;
            response
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or_else(|| SuggestError::Backend("empty choices in response".into()))
        }
    }
}
