//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding or encoding events.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("event frame is not text")]
    NotText,
}
