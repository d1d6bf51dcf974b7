use thiserror::Error;

/// Why a single request attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// HTTP 429. Waits out the rate-limit cooldown before the next attempt.
    RateLimited,
    /// Connect/DNS/timeout errors and non-200 statuses.
    Transient,
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("invalid request url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("GTIN must be exactly 13 digits, got {0:?}")]
    InvalidGtin(String),

    #[error("unknown bridge {0:?}")]
    UnknownBridge(String),

    #[error("bridge {bridge} requires parameter {param}")]
    MissingParam {
        bridge: &'static str,
        param: &'static str,
    },

    #[error("proxy refresh produced no proxies ({failed} of {sources} sources failed)")]
    NoProxies { sources: usize, failed: usize },

    #[error(transparent)]
    Transport(#[from] TransportError),
}
