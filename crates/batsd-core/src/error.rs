use std::io;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BatsdError>;

/// Failures surfaced by the protocol layer. Nothing here is retried or
/// swallowed; the caller decides whether to `connect()` again.
#[derive(Debug, Error)]
pub enum BatsdError {
    #[error("cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("not connected")]
    NotConnected,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("response is not valid JSON: {source}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("key name {0:?} cannot be sent on the wire")]
    InvalidKey(String),

    #[error("server response has no key {key:?}")]
    ServerKeyMissing { key: String },

    #[error("socket error: {0}")]
    Io(#[from] io::Error),
}

impl BatsdError {
    /// True when the failure leaves the byte stream in an unknown state.
    pub fn breaks_stream(&self) -> bool {
        matches!(
            self,
            BatsdError::Timeout(_) | BatsdError::Protocol(_) | BatsdError::Io(_)
        )
    }
}
