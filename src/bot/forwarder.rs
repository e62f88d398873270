//! Persona-conditioned chat forwarding.

use std::sync::Arc;

use tracing::{info, warn};

use crate::persona::PersonaBuilder;
use crate::providers::{CompletionRequest, LlmProvider, Message};

use super::replies;

/// Sends free text to the completion provider under the persona prompt.
#[derive(Clone)]
pub struct ChatForwarder {
    persona: PersonaBuilder,
    provider: Arc<dyn LlmProvider>,
}

impl ChatForwarder {
    /// Wire the forwarder to its collaborators.
    pub fn new(persona: PersonaBuilder, provider: Arc<dyn LlmProvider>) -> Self {
        Self { persona, provider }
    }

    /// Forward `text` from `sender_id` and return the reply to send.
    ///
    /// `display_name` is the directory name already resolved for this
    /// message; `None` selects the persona's fallback name. Always yields
    /// exactly one reply: the provider's text verbatim, or
    /// [`replies::CHAT_FAILURE`] when the provider fails.
    pub async fn forward(&self, sender_id: &str, display_name: Option<&str>, text: &str) -> String {
        let system = self.persona.build(display_name);
        let request = conversation(system, text);

        match self.provider.complete(request).await {
            Ok(response) => {
                info!(
                    sender_id,
                    model = %response.model,
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "chat reply received"
                );
                response.text
            }
            Err(e) => {
                warn!(sender_id, provider = self.provider.model_id(), error = %e, "chat completion failed");
                replies::CHAT_FAILURE.to_owned()
            }
        }
    }
}

/// The single two-message exchange: persona as system, text as user.
pub fn conversation(system: String, text: &str) -> CompletionRequest {
    CompletionRequest {
        messages: vec![Message::user(text)],
        system: Some(system),
        max_tokens: None,
    }
}
