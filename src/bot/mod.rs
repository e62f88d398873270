//! Command dispatch: one inbound message in, exactly one reply out.
//!
//! [`Dispatcher::handle`] classifies the text with [`Command::parse`] and
//! routes to registration, report listing, recap trigger, or the
//! [`ChatForwarder`]. Every collaborator failure is caught and logged here;
//! nothing propagates to the transport loop.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::recap::{RecapOutcome, RecapService};
use crate::store::{ReportQuery, StoreError, UserDirectory};

pub mod command;
pub mod forwarder;
pub mod replies;

pub use command::Command;
pub use forwarder::ChatForwarder;

/// An inbound message as delivered by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Stable sender identifier.
    pub sender_id: String,
    /// Sender display name as reported by the transport.
    pub sender_display_name: String,
    /// Message body.
    pub text: String,
}

/// Collaborators handed to the dispatcher at startup.
#[derive(Clone)]
pub struct Dispatcher {
    directory: UserDirectory,
    reports: ReportQuery,
    recap: Arc<dyn RecapService>,
    forwarder: ChatForwarder,
    auto_register_on_chat: bool,
}

impl Dispatcher {
    /// Wire the dispatcher.
    pub fn new(
        directory: UserDirectory,
        reports: ReportQuery,
        recap: Arc<dyn RecapService>,
        forwarder: ChatForwarder,
    ) -> Self {
        Self {
            directory,
            reports,
            recap,
            forwarder,
            auto_register_on_chat: true,
        }
    }

    /// Toggle first-contact registration on free-text messages.
    pub fn with_auto_register(mut self, enabled: bool) -> Self {
        self.auto_register_on_chat = enabled;
        self
    }

    /// Produce the reply for one inbound message.
    pub async fn handle(&self, msg: &InboundMessage) -> String {
        let command = Command::parse(&msg.text);
        debug!(sender_id = %msg.sender_id, ?command, "dispatching message");

        let result = match command {
            Some(Command::Start) => self.handle_start(msg).await,
            Some(Command::Reports) => self.handle_reports(msg).await,
            Some(Command::Recap) => self.handle_recap(msg).await,
            None => Ok(self.handle_chat(msg).await),
        };

        result.unwrap_or_else(|e| {
            warn!(sender_id = %msg.sender_id, ?command, error = %e, "store call failed");
            replies::TRY_AGAIN_LATER.to_owned()
        })
    }

    async fn handle_start(&self, msg: &InboundMessage) -> Result<String, StoreError> {
        let registration = self
            .directory
            .register_if_absent(&msg.sender_id, &msg.sender_display_name)
            .await?;
        Ok(replies::greeting(
            &msg.sender_display_name,
            registration.created,
        ))
    }

    async fn handle_reports(&self, msg: &InboundMessage) -> Result<String, StoreError> {
        let Some(name) = self.directory.resolve(&msg.sender_id).await? else {
            info!(sender_id = %msg.sender_id, "report request from unregistered sender");
            return Ok(replies::NOT_REGISTERED.to_owned());
        };

        let reports = self.reports.reports_for(&name).await?;
        if reports.is_empty() {
            Ok(replies::no_reports(&name))
        } else {
            Ok(replies::report_list(&name, &reports))
        }
    }

    async fn handle_recap(&self, msg: &InboundMessage) -> Result<String, StoreError> {
        let Some(name) = self.directory.resolve(&msg.sender_id).await? else {
            info!(sender_id = %msg.sender_id, "recap request from unregistered sender");
            return Ok(replies::NOT_REGISTERED.to_owned());
        };

        // Failure detail is already logged by the recap service.
        Ok(match self.recap.trigger_recap(&msg.sender_id, &name).await {
            RecapOutcome::Success => replies::recap_started(&name),
            RecapOutcome::RemoteFailure(_) | RecapOutcome::TransportError(_) => {
                replies::TRY_AGAIN_LATER.to_owned()
            }
        })
    }

    async fn handle_chat(&self, msg: &InboundMessage) -> String {
        if msg.text.trim().is_empty() {
            return replies::EMPTY_MESSAGE.to_owned();
        }

        let display_name = self.chat_identity(msg).await;
        self.forwarder
            .forward(&msg.sender_id, display_name.as_deref(), &msg.text)
            .await
    }

    /// One directory read per chat message: registration doubles as the
    /// lookup. Failures degrade to the persona's fallback name.
    async fn chat_identity(&self, msg: &InboundMessage) -> Option<String> {
        let lookup = if self.auto_register_on_chat {
            self.directory
                .register_if_absent(&msg.sender_id, &msg.sender_display_name)
                .await
                .map(|registration| Some(registration.display_name))
        } else {
            self.directory.resolve(&msg.sender_id).await
        };

        match lookup {
            Ok(Some(name)) => Some(name),
            Ok(None) => {
                debug!(sender_id = %msg.sender_id, "sender not in directory, using fallback persona name");
                None
            }
            Err(e) => {
                warn!(sender_id = %msg.sender_id, error = %e, "directory lookup failed, using fallback persona name");
                None
            }
        }
    }
}
