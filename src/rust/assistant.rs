//! Client for the hosted text-generation service behind `/suggestion` and `/chat`.
//!
//! Speaks the OpenAI-compatible chat-completions protocol: a list of role-tagged
//! messages goes out, the first choice's message content comes back.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("Text-generation service is not configured")]
    NotConfigured,
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Text-generation service returned {status}: {body}")]
    StatusError { status: u16, body: String },
    #[error("Text-generation service returned no content")]
    EmptyResponse,
    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl AssistantConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            model: model.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AssistantClient {
    http: reqwest::Client,
    config: AssistantConfig,
}

impl AssistantClient {
    pub fn new(config: AssistantConfig) -> Result<Self, AssistantError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Asks for treatment and prevention guidance for a detected disease.
    pub async fn suggest(&self, disease: &str) -> Result<String, AssistantError> {
        let disease = require_non_empty(disease, "disease")?;
        let messages = vec![
            ChatMessage {
                role: "system",
                content: "You are an agronomy assistant helping farmers and gardeners \
                          deal with plant diseases. Answer concisely in plain language."
                    .to_string(),
            },
            ChatMessage {
                role: "user",
                content: format!(
                    "A leaf photo was classified as \"{}\". Explain what this means, \
                     how to treat it, and how to prevent it from spreading.",
                    disease
                ),
            },
        ];
        self.complete(messages).await
    }

    /// Answers a follow-up question about a detected disease.
    ///
    /// `previous_messages` is the prior conversation, already rendered as text.
    pub async fn chat(
        &self,
        disease: &str,
        message: &str,
        previous_messages: &str,
    ) -> Result<String, AssistantError> {
        let message = require_non_empty(message, "message")?;
        let mut system = String::from(
            "You are an agronomy assistant helping a user with a plant disease. \
             Answer concisely in plain language.",
        );
        let disease = disease.trim();
        if !disease.is_empty() {
            system.push_str(&format!(" The user's plant was diagnosed with \"{}\".", disease));
        }

        let mut messages = vec![ChatMessage {
            role: "system",
            content: system,
        }];
        let previous = previous_messages.trim();
        if !previous.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: format!("Conversation so far:\n{}", previous),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: message.to_string(),
        });

        self.complete(messages).await
    }

    async fn complete(&self, messages: Vec<ChatMessage<'_>>) -> Result<String, AssistantError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.config.model,
            messages,
        };

        let mut builder = self.http.post(&url).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        log::debug!("Requesting completion from {}", url);
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Text-generation service returned {}: {}", status, body);
            return Err(AssistantError::StatusError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        extract_content(parsed)
    }
}

fn require_non_empty<'a>(value: &'a str, field: &str) -> Result<&'a str, AssistantError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AssistantError::ValidationError(format!("{} cannot be empty", field)));
    }
    Ok(value)
}

fn extract_content(response: ChatResponse) -> Result<String, AssistantError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(AssistantError::EmptyResponse)
}
