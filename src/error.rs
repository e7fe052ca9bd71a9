//! Error types for the terna crate.
//!
//! All errors carry stable string messages suitable for display and for
//! recording in persisted failure lists. API keys never appear in error
//! messages.

/// Errors that can occur while counting or extracting publications.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Invalid run configuration. Raised before any network call is made.
    #[error("config error: {0}")]
    Config(String),

    /// Missing or rejected API key. Fatal to the affected provider's run;
    /// sibling providers are unaffected.
    #[error("auth error: {0}")]
    Auth(String),

    /// A transient request failure (timeout, 429, 503). Retried with
    /// backoff; surfaced only once the retry budget is exhausted.
    #[error("transient error: {0}")]
    Transient(String),

    /// A non-transient HTTP failure (connection setup, unexpected status).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider answered, but the response shape was not the one its
    /// API documents. Recorded against the query, never a crash.
    #[error("provider response error: {0}")]
    Provider(String),

    /// Snapshot load or persist failure.
    #[error("persist error: {0}")]
    Persist(String),

    /// The run was cancelled before this query was issued.
    #[error("run cancelled")]
    Cancelled,
}

impl SearchError {
    /// Whether this error should be retried by the backoff loop.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Convenience type alias for terna results.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_config() {
        let err = SearchError::Config("keywords must not be empty".into());
        assert_eq!(err.to_string(), "config error: keywords must not be empty");
    }

    #[test]
    fn display_auth() {
        let err = SearchError::Auth("no API key configured for scopus".into());
        assert_eq!(err.to_string(), "auth error: no API key configured for scopus");
    }

    #[test]
    fn display_transient() {
        let err = SearchError::Transient("HTTP 429".into());
        assert_eq!(err.to_string(), "transient error: HTTP 429");
    }

    #[test]
    fn display_cancelled() {
        assert_eq!(SearchError::Cancelled.to_string(), "run cancelled");
    }

    #[test]
    fn transient_classification() {
        assert!(SearchError::Transient("timeout".into()).is_transient());
        assert!(!SearchError::Auth("bad key".into()).is_transient());
        assert!(!SearchError::Http("500".into()).is_transient());
        assert!(!SearchError::Cancelled.is_transient());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchError>();
    }
}
