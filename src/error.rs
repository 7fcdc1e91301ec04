use std::time::Duration;
use thiserror::Error;

/// Failures of a single run: startup, session and per-entry errors.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("failed to connect to {url}: {source}")]
    ConnectionFailure {
        url: String,
        #[source]
        source: RpcError,
    },

    #[error("token metadata unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("subscription failed: {0}")]
    SubscriptionFailure(String),

    #[error("log query failed: {0}")]
    QueryFailed(String),

    #[error(transparent)]
    MalformedLogEntry(#[from] DecodeError),
}

impl MonitorError {
    /// Per-entry errors are skipped; everything else ends the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MonitorError::MalformedLogEntry(_))
    }
}

/// Reasons a raw log entry cannot be turned into a transfer record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed log entry: expected 3 topics, found {found}")]
    MissingTopics { found: usize },

    #[error("malformed log entry: empty data payload")]
    EmptyData,

    #[error("malformed log entry: data payload of {len} bytes does not fit uint256")]
    DataTooWide { len: usize },

    #[error("malformed log entry: missing block number")]
    MissingBlockNumber,
}

/// Errors raised by the chain client itself.
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("invalid node url: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timeout after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("subscription closed by node")]
    SubscriptionClosed,
}
