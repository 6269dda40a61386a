//! Fetch error types.

use thiserror::Error;

/// Errors surfaced by a data source.
///
/// "No results" is not an error: sources return an empty page with
/// total zero. These variants cover transport and evaluation failures,
/// which the coordinator catches and logs without touching loaded rows.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The host-supplied fetch callback failed.
    #[error("data source failed: {message}")]
    Source { message: String },

    /// The coordinator worker is gone (engine torn down).
    #[error("fetch coordinator is shut down")]
    Shutdown,
}

impl FetchError {
    /// Convenience constructor for host callbacks.
    pub fn source(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
        }
    }
}
