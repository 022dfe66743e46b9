use catalog_client::CatalogError;

use crate::cache::CacheError;

/// Result type alias for acquisition operations.
pub type Result<T> = std::result::Result<T, AcquireError>;

#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// Anti-automation signal. Callers must not retry automatically.
    #[error("Catalog has temporarily blocked requests from this host: {0}")]
    Blocked(String),

    /// Superseded by a newer request in the same task group.
    #[error("Acquisition cancelled")]
    Cancelled,

    #[error("No catalog entry for: {0}")]
    NotFound(String),

    #[error("Transient catalog failure: {0}")]
    Transient(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl AcquireError {
    /// Whether this outcome feeds the rate gate's consecutive-error counter.
    pub fn counts_against_pacing(&self) -> bool {
        matches!(self, AcquireError::Blocked(_) | AcquireError::Transient(_))
    }

    /// Failures that only lose one query or one enrichment, not the burst.
    pub fn is_skippable(&self) -> bool {
        matches!(self, AcquireError::Transient(_) | AcquireError::NotFound(_))
    }
}

/// Lowercase substrings that mean the catalog is refusing automated traffic.
const BLOCKED_SIGNALS: &[&str] = &[
    "429",
    "too many",
    "rate limit",
    "blocked",
    "forbidden",
    "captcha",
    "unusual traffic",
    "denied",
];

fn has_block_signal(text: &str) -> bool {
    let lowered = text.to_lowercase();
    BLOCKED_SIGNALS.iter().any(|s| lowered.contains(s))
}

/// Map a client failure onto the acquisition taxonomy.
///
/// Only response bodies are scanned for ban vocabulary; network errors
/// carry URLs and are always transient. Any non-2xx other than 404 is a
/// block: the catalog answers unexpected statuses once it starts
/// rate-limiting.
pub fn classify(err: CatalogError) -> AcquireError {
    match err {
        CatalogError::NotFound(target) => AcquireError::NotFound(target),
        CatalogError::Api { status, message } => {
            if has_block_signal(&message) {
                AcquireError::Blocked(format!("HTTP {status}: {message}"))
            } else {
                AcquireError::Blocked(format!("unexpected HTTP status {status}"))
            }
        }
        CatalogError::Undecodable { reason, body } => {
            if has_block_signal(&body) {
                AcquireError::Blocked(format!("challenge page instead of data ({reason})"))
            } else {
                AcquireError::Transient(format!("undecodable response: {reason}"))
            }
        }
        err @ (CatalogError::Network(_) | CatalogError::Parse(_)) => {
            AcquireError::Transient(err.to_string())
        }
    }
}
