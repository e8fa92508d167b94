//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all bridge failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Inbound request failed validation (bad tenant token, command syntax,
    /// content type).
    Validation(String),
    /// Invocation payload is neither a web request nor a queue batch.
    UnsupportedPayload(String),
    /// Event callback carries an event sub-type the bridge does not handle.
    UnsupportedEventType(String),
    /// Outbound content fetch failed (network error or non-success status).
    Fetch(String),
    /// Every extraction strategy was exhausted without a usable record.
    NoMetadataFound(String),
    /// Queue message body could not be decoded into a work item.
    Decode(String),
    /// Queue send or delete failure.
    Queue(String),
    /// Posting a reply or unfurl back to Slack failed.
    Delivery(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::UnsupportedPayload(msg) => write!(f, "unsupported payload: {msg}"),
            Self::UnsupportedEventType(msg) => write!(f, "unsupported event type: {msg}"),
            Self::Fetch(msg) => write!(f, "fetch: {msg}"),
            Self::NoMetadataFound(msg) => write!(f, "no metadata found: {msg}"),
            Self::Decode(msg) => write!(f, "decode: {msg}"),
            Self::Queue(msg) => write!(f, "queue: {msg}"),
            Self::Delivery(msg) => write!(f, "delivery: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
