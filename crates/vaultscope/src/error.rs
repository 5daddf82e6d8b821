//! Error taxonomy at the engine's public boundary.
//!
//! Insufficient history is not an error: it surfaces as zeroed or absent
//! metadata fields, never as a failed call.

use thiserror::Error;

use crate::providers::FetchError;

#[derive(Debug, Error)]
pub enum Error {
    /// No configured provider has a record for the requested vault.
    #[error("not found: {0}")]
    NotFound(String),

    /// Chain or provider is not enabled in this engine's configuration.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Malformed input; rejected before any external call is attempted.
    #[error("invalid: {0}")]
    Invalid(String),

    /// External source failed after retries.
    #[error("upstream: {0}")]
    Upstream(#[from] FetchError),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
