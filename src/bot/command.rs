//! Reserved command tokens.

/// Registration trigger.
pub const START_TOKEN: &str = "/start";
/// Report listing trigger.
pub const REPORTS_TOKEN: &str = "/laporan";
/// Recap trigger.
pub const RECAP_TOKEN: &str = "/rekap";

/// The closed set of recognized commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Register the sender if needed and greet them.
    Start,
    /// List the sender's reports.
    Reports,
    /// Ask the remote service for a recap.
    Recap,
}

impl Command {
    /// Classify raw message text.
    ///
    /// Only an exact token match (ignoring surrounding whitespace) counts.
    /// Everything else, unknown slash commands included, is free text.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            START_TOKEN => Some(Self::Start),
            REPORTS_TOKEN => Some(Self::Reports),
            RECAP_TOKEN => Some(Self::Recap),
            _ => None,
        }
    }

    /// The reserved token for this command.
    pub fn token(self) -> &'static str {
        match self {
            Self::Start => START_TOKEN,
            Self::Reports => REPORTS_TOKEN,
            Self::Recap => RECAP_TOKEN,
        }
    }
}
