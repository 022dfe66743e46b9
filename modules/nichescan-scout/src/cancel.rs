use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{AcquireError, Result};

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Cooperative cancellation signal for one task in a task group.
#[derive(Debug, Clone)]
pub struct CancelToken {
    group: Arc<str>,
    id: u64,
    inner: CancellationToken,
}

impl CancelToken {
    pub fn new(group: &str) -> Self {
        Self {
            group: Arc::from(group),
            id: NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed),
            inner: CancellationToken::new(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// `Err(Cancelled)` once signaled.
    pub fn check(&self) -> Result<()> {
        if self.inner.is_cancelled() {
            Err(AcquireError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when the token is signaled.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await
    }

    fn same_task(&self, other: &CancelToken) -> bool {
        self.id == other.id
    }
}

/// At most one active token per task group. Starting a task supersedes
/// (signals) whatever was running in the same group.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    active: Mutex<HashMap<String, CancelToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, group: &str) -> CancelToken {
        let token = CancelToken::new(group);
        let previous = self.lock().insert(group.to_string(), token.clone());
        if let Some(previous) = previous {
            info!(group, "Superseding in-flight task");
            previous.cancel();
        }
        token
    }

    /// Retire `token`. The registry entry is only cleared if `token` is still
    /// the active one for its group, so a stale task cannot erase a newer
    /// registration.
    pub fn finish(&self, token: &CancelToken) {
        {
            let mut active = self.lock();
            if active
                .get(token.group())
                .is_some_and(|current| current.same_task(token))
            {
                active.remove(token.group());
            }
        }
        token.cancel();
    }

    /// Start a task whose token is retired when the guard drops.
    pub fn enter(&self, group: &str) -> TaskGuard<'_> {
        TaskGuard {
            registry: self,
            token: self.start(group),
        }
    }

    pub fn active(&self, group: &str) -> Option<CancelToken> {
        self.lock().get(group).cloned()
    }

    /// Signal every active task, e.g. on shutdown.
    pub fn cancel_all(&self) {
        for token in self.lock().values() {
            token.cancel();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CancelToken>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub struct TaskGuard<'a> {
    registry: &'a CancellationRegistry,
    token: CancelToken,
}

impl TaskGuard<'_> {
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.registry.finish(&self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_signals_previous_token_in_same_group() {
        let registry = CancellationRegistry::new();
        let first = registry.start("category");
        let other_group = registry.start("top");
        let second = registry.start("category");

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(!other_group.is_cancelled());
        assert!(registry.active("category").unwrap().same_task(&second));
    }

    #[test]
    fn stale_finish_keeps_newer_registration() {
        let registry = CancellationRegistry::new();
        let stale = registry.start("niche");
        let current = registry.start("niche");

        registry.finish(&stale);
        assert!(registry.active("niche").unwrap().same_task(&current));

        registry.finish(&current);
        assert!(registry.active("niche").is_none());
        assert!(current.is_cancelled());
    }

    #[test]
    fn guard_retires_token_on_drop() {
        let registry = CancellationRegistry::new();
        let token = {
            let guard = registry.enter("details");
            guard.token().clone()
        };
        assert!(token.is_cancelled());
        assert!(registry.active("details").is_none());
    }

    #[test]
    fn check_reports_cancelled() {
        let token = CancelToken::new("g");
        assert!(token.check().is_ok());
        token.cancel();
        assert!(matches!(token.check(), Err(AcquireError::Cancelled)));
    }
}
