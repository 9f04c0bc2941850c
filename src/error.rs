//! Unified error types.

use thiserror::Error;

use crate::cache::CacheKey;

/// Top-level error.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// A response that lost the generation race. Logged and dropped by the
    /// cache; never handed to subscribers.
    #[error("Stale response for {key}: generation {generation} superseded by {current}")]
    StaleResponse {
        key: CacheKey,
        generation: u64,
        current: u64,
    },

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Failure of a single remote call.
///
/// `Clone` so the last failure can be kept on a cache entry for display.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Unreachable backend, dropped connection or timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// The payload did not match the expected shape.
    #[error("Schema error: {0}")]
    Schema(String),
}

impl FetchError {
    pub fn timeout() -> Self {
        FetchError::Network("request timed out".to_string())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return FetchError::Schema(e.to_string());
        }
        if let Some(status) = e.status() {
            return FetchError::Http {
                status: status.as_u16(),
                body: e.to_string(),
            };
        }
        FetchError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_status() {
        let err = FetchError::Http {
            status: 503,
            body: "unavailable".into(),
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(FetchError::timeout().status(), None);
    }

    #[test]
    fn test_sync_error_from_fetch() {
        let err: SyncError = FetchError::Schema("expected array".into()).into();
        assert!(matches!(err, SyncError::Fetch(FetchError::Schema(_))));
        assert_eq!(err.to_string(), "Fetch error: Schema error: expected array");
    }
}
