//! Chat completion backends.
//!
//! The bot only ever sends a persona prompt plus one user message and reads
//! back one text reply, so the shared types here carry plain text only.
//! [`openai::OpenAiProvider`] covers any OpenAI-compatible
//! `/v1/chat/completions` endpoint.

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ModelsConfig;
use crate::credentials::Credentials;

pub mod openai;

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Persona / instructions.
    System,
    /// The facilitator.
    User,
    /// The model.
    Assistant,
}

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the turn.
    pub role: Role,
    /// Turn text.
    pub content: String,
}

impl Message {
    /// A facilitator turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Everything a backend needs for one completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Turns after the system prompt, oldest first.
    pub messages: Vec<Message>,
    /// Sent ahead of `messages` when present.
    pub system: Option<String>,
    /// Per-request completion cap; `None` defers to the backend default.
    pub max_tokens: Option<u32>,
}

/// Why generation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The model finished its answer.
    EndTurn,
    /// Cut off by the token cap.
    MaxTokens,
    /// Withheld by the backend's content filter.
    ContentFilter,
    /// Anything else, verbatim.
    Other(String),
}

/// Token accounting reported by the backend (zero when absent).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageStats {
    /// Prompt tokens.
    pub input_tokens: u32,
    /// Completion tokens.
    pub output_tokens: u32,
}

/// A successful completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Reply text of the first choice, never blank.
    pub text: String,
    /// Why generation ended.
    pub stop_reason: StopReason,
    /// Token accounting.
    pub usage: UsageStats,
    /// Model name as reported by the backend.
    pub model: String,
}

/// Completion failures. None of these ever reach the facilitator verbatim.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Connect, timeout or body read failure.
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The body was not the expected JSON shape.
    #[error("unexpected completion response: {0}")]
    Parse(String),
    /// Non-2xx answer.
    #[error("completion backend answered {status}: {body}")]
    HttpStatus {
        /// Status code.
        status: u16,
        /// Body after [`sanitize_http_error_body`].
        body: String,
    },
    /// The first choice carried no text.
    #[error("completion backend returned an empty reply")]
    EmptyReply,
}

/// A chat completion backend, shared by every concurrently handled chat.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one completion.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] for transport, status or decoding failures.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;

    /// `<provider>/<model>` spec this backend was built from.
    fn model_id(&self) -> &str;
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Longest error body kept for logs.
const ERROR_BODY_LIMIT: usize = 256;

/// Secret shapes scrubbed from upstream error bodies: OpenAI keys, Google
/// OAuth access tokens, Telegram bot tokens.
const SECRET_PATTERNS: &[&str] = &[
    r"sk-proj-[A-Za-z0-9_\-]{10,}",
    r"sk-[A-Za-z0-9]{32,}",
    r"ya29\.[A-Za-z0-9_\-]{20,}",
    r"\d{8,10}:[A-Za-z0-9_\-]{30,}",
];

fn secret_patterns() -> &'static [Regex] {
    static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        SECRET_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// Read the body and turn a non-2xx status into [`ProviderError::HttpStatus`].
///
/// # Errors
///
/// Returns `Request` if the body cannot be read, `HttpStatus` otherwise.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }
    Err(ProviderError::HttpStatus {
        status: status.as_u16(),
        body: sanitize_http_error_body(&body),
    })
}

/// Make an upstream error body safe to log: whitespace collapsed, secrets
/// replaced by `[REDACTED]`, length capped with a `...[truncated]` marker.
pub fn sanitize_http_error_body(raw: &str) -> String {
    let single_line = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let scrubbed = secret_patterns()
        .iter()
        .fold(single_line, |text, re| {
            re.replace_all(&text, "[REDACTED]").into_owned()
        });

    match scrubbed.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((cut, _)) => format!("{}...[truncated]", &scrubbed[..cut]),
        None => scrubbed,
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Split `"openai/gpt-3.5-turbo"` into `("openai", "gpt-3.5-turbo")`.
///
/// Only the first `/` separates; the model part may contain more.
///
/// # Errors
///
/// Returns an error when there is no `/` or either side is empty.
pub fn parse_provider_string(spec: &str) -> anyhow::Result<(&str, &str)> {
    match spec.split_once('/') {
        Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
            Ok((provider, model))
        }
        _ => anyhow::bail!("model spec {spec:?} must look like '<provider>/<model>'"),
    }
}

/// Build the backend named by `[models] default`.
///
/// # Errors
///
/// Returns an error for an unsupported provider prefix, a missing API key,
/// or an HTTP client that cannot be constructed.
pub fn from_config(
    models: &ModelsConfig,
    credentials: &Credentials,
) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let (provider, model) = parse_provider_string(&models.default)?;
    if provider != "openai" {
        anyhow::bail!("unsupported provider '{provider}' (only 'openai' is available)");
    }

    let api_key = credentials.require(&models.api_key_env)?;
    let backend = openai::OpenAiProvider::new(
        models.default.clone(),
        model.to_owned(),
        api_key,
        &models.base_url,
        Duration::from_secs(models.timeout_secs),
    )?
    .with_max_tokens(models.max_tokens);
    Ok(Arc::new(backend))
}
