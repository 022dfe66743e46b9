use std::time::Duration;

use tracing::info;

/// Receives elapsed-time observations per logical endpoint, e.g. for ETA
/// estimates. Storage of the observations is up to the implementor.
pub trait TimingSink: Send + Sync {
    fn record(&self, endpoint: &str, elapsed: Duration, cached: bool);
}

/// Emits each observation as a tracing event.
pub struct LogTimingSink;

impl TimingSink for LogTimingSink {
    fn record(&self, endpoint: &str, elapsed: Duration, cached: bool) {
        info!(
            endpoint,
            elapsed_ms = elapsed.as_millis() as u64,
            cached,
            "Request timing"
        );
    }
}
