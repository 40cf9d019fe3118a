use std::io;

use thiserror::Error;

/// A buffer could not be interpreted as a drop notification.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("drop notification too short: {have} < {need} bytes")]
    TooShort { have: usize, need: usize },

    #[error("truncated drop notification: {0}")]
    Truncated(#[from] io::Error),
}

/// The agent could not tell us anything about an endpoint.
///
/// Distinct from an endpoint that exists but has no security identity yet,
/// which is a successful lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("endpoint {id} not found")]
    NotFound { id: String },

    #[error("agent returned HTTP {status} for endpoint {id}")]
    Status { id: String, status: u16 },

    #[error("agent request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed endpoint response: {0}")]
    Decode(#[from] serde_json::Error),
}
