use thiserror::Error;

/// Core failure taxonomy. Command-layer IO wraps these with `anyhow`
/// context; the scheduler and extraction engine only ever produce
/// variants from this enum so callers can tell a retryable network
/// failure from a soft empty-content outcome.
#[derive(Debug, Error)]
pub enum CondenserError {
    #[error("configuration incomplete: {0}")]
    Configuration(String),
    #[error("completion api failure: {0}")]
    Network(String),
    #[error("invalid rule pattern `{pattern}`: {reason}")]
    Pattern { pattern: String, reason: String },
    #[error("nothing to summarize in range {start}..{end} (check extraction rules)")]
    EmptyContent { start: usize, end: usize },
    #[error("no chat history")]
    NoHistory,
    #[error("summarization already in flight")]
    Busy,
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl CondenserError {
    /// Failures that leave the scheduler pointer untouched and are worth
    /// retrying on the next trigger cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Busy)
    }
}
