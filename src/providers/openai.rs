//! OpenAI-compatible `/v1/chat/completions` backend.
//!
//! Works against api.openai.com and any server speaking the same wire format
//! (hosted proxies, local gateways) via `[models] base_url`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{
    check_http_response, CompletionRequest, CompletionResponse, LlmProvider, ProviderError, Role,
    StopReason, UsageStats,
};

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Request body. Public so tests can inspect what goes on the wire.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// Bare model name (no provider prefix).
    pub model: String,
    /// System turn first, then the conversation.
    pub messages: Vec<ChatTurn>,
    /// Omitted entirely when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// One `messages[]` entry.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct ChatTurn {
    /// `system`, `user` or `assistant`.
    pub role: &'static str,
    /// Turn text.
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    model: String,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Backend bound to one model, key and endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    model_spec: String,
    model_name: String,
    api_key: String,
    endpoint: String,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Create a provider bound to `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        model_spec: String,
        model_name: String,
        api_key: String,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            model_spec,
            model_name,
            api_key,
            endpoint: endpoint_url(base_url),
            max_tokens: None,
            client,
        })
    }

    /// Default completion cap for requests that do not set their own.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Append the chat completions path to `base_url`. A trailing `/` or `/v1`
/// on the base is absorbed.
#[doc(hidden)]
pub fn endpoint_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = base.strip_suffix("/v1").unwrap_or(base);
    format!("{base}{CHAT_COMPLETIONS_PATH}")
}

/// Map a [`CompletionRequest`] onto the wire body.
#[doc(hidden)]
pub fn build_request(model: &str, request: &CompletionRequest) -> ChatRequest {
    let system = request.system.iter().map(|text| ChatTurn {
        role: wire_role(Role::System),
        content: text.clone(),
    });
    let conversation = request.messages.iter().map(|m| ChatTurn {
        role: wire_role(m.role),
        content: m.content.clone(),
    });

    ChatRequest {
        model: model.to_owned(),
        messages: system.chain(conversation).collect(),
        max_tokens: request.max_tokens,
    }
}

/// Decode a 2xx body. Only the first choice is used.
///
/// # Errors
///
/// `Parse` for malformed JSON or no choices, `EmptyReply` when the first
/// choice has no usable text.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<CompletionResponse, ProviderError> {
    let decoded: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Parse(format!("invalid chat completion body: {e}")))?;

    let Some(first) = decoded.choices.into_iter().next() else {
        return Err(ProviderError::Parse("response has no choices".to_owned()));
    };
    let text = first
        .message
        .content
        .filter(|text| !text.trim().is_empty())
        .ok_or(ProviderError::EmptyReply)?;

    let usage = decoded.usage.map_or_else(UsageStats::default, |u| UsageStats {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    });

    Ok(CompletionResponse {
        text,
        stop_reason: stop_reason(first.finish_reason.as_deref()),
        usage,
        model: decoded.model,
    })
}

fn stop_reason(finish_reason: Option<&str>) -> StopReason {
    match finish_reason {
        None | Some("stop") => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        Some("content_filter") => StopReason::ContentFilter,
        Some(other) => StopReason::Other(other.to_owned()),
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let mut body = build_request(&self.model_name, &request);
        body.max_tokens = body.max_tokens.or(self.max_tokens);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        parse_response(&check_http_response(response).await?)
    }

    fn model_id(&self) -> &str {
        &self.model_spec
    }
}
