//! Error types for the Amazon Music API client.

use thiserror::Error;

/// Errors that can occur while establishing a session or calling the API.
///
/// The taxonomy is deliberately precise about retryability so callers can
/// decide retry vs. abort:
///
/// - [`Transport`](Self::Transport) — retryable with backoff (read-only
///   actions only; `createQueue` is not idempotent).
/// - [`SessionExpired`](Self::SessionExpired) — retryable exactly once
///   after re-establishing a session.
/// - Everything else — not retryable without operator intervention.
#[derive(Debug, Error)]
pub enum AmazonMusicError {
    /// The sign-in portal rejected the supplied credentials.
    #[error("authentication failed: credentials rejected by sign-in portal")]
    Authentication,

    /// The sign-in portal presented a CAPTCHA or equivalent challenge.
    /// Automatic resolution is out of scope; sign in from a browser and
    /// reuse its cookies instead.
    #[error("sign-in challenge (CAPTCHA) presented, cannot continue automatically")]
    ChallengeRequired,

    /// The post-login configuration was missing or incomplete, so no
    /// regional endpoint could be determined.
    #[error("could not resolve regional endpoint: {0}")]
    RegionResolution(String),

    /// Network-level failure (connection refused, timeout, TLS error).
    #[error("HTTP transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The action name is not in the static endpoint mapping. Raised
    /// before any network call is attempted.
    #[error("unknown API action: {0}")]
    UnknownAction(String),

    /// The response body did not parse as JSON, or a response document
    /// was missing the structure the caller depends on. Carries the raw
    /// body for diagnosis.
    #[error("malformed API response: {body}")]
    MalformedResponse {
        /// Raw response body (or document) as received.
        body: String,
    },

    /// A mid-session call was answered with a redirect back to the
    /// sign-in portal. Re-run session establishment and retry once.
    #[error("session expired, re-establish and retry")]
    SessionExpired,

    /// The service reported an in-band failure status (e.g.
    /// `MAX_CONCURRENCY_REACHED` from the stream locator).
    #[error("API failure ({status}): {body}")]
    Api {
        /// Service status marker from the response document.
        status: String,
        /// Full response document as received.
        body: String,
    },

    /// File I/O error (cookie jar read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize the cookie jar file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors (e.g. missing home directory).
    #[error("{0}")]
    Other(String),
}

/// Convenience alias for `Result<T, AmazonMusicError>`.
pub type Result<T> = std::result::Result<T, AmazonMusicError>;
