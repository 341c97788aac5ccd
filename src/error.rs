//! Error types for Loan Assist.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dialog error: {0}")]
    Dialog(#[from] DialogError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while advancing a conversation.
///
/// None of these are fatal: the engine recovers from each one locally and
/// the session stays usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialogError {
    #[error("Could not read an amount from {input:?}")]
    InvalidAmountFormat { input: String },

    #[error("Requested amount {requested} exceeds the eligibility ceiling of {ceiling}")]
    EligibilityCeilingExceeded { requested: u64, ceiling: u64 },

    #[error("Input not expected at stage {stage}")]
    UnexpectedInputAtStep { stage: String },

    #[error("Upload received but no document is pending")]
    UploadWithNoPendingDocument,
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Conversation closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
