//! Coalesced session refresh.
//!
//! Several requests can hit a 401 at the same moment when the access cookie
//! expires. The first one to take the gate runs the refresh call; the others
//! wait on the gate and reuse its outcome instead of issuing their own.

use reqwest::StatusCode;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// Outcome of one call to the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// 2xx: new access cookie set.
    Refreshed,
    /// The backend answered with a non-2xx status.
    Rejected(StatusCode),
    /// No response (network error, timeout).
    Unreachable(String),
}

impl RefreshOutcome {
    pub fn is_refreshed(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed)
    }

    /// The refresh credential itself was refused (401).
    pub fn is_hard_rejection(&self) -> bool {
        matches!(self, RefreshOutcome::Rejected(status) if *status == StatusCode::UNAUTHORIZED)
    }
}

/// Serializes refresh calls and shares each outcome with concurrent waiters.
#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    gate: Mutex<Option<RefreshOutcome>>,
    generation: AtomicU64,
}

impl RefreshCoordinator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run `refresh` unless another refresh completed while this caller
    /// waited for the gate, in which case that outcome is returned.
    pub(crate) async fn refresh<F, Fut>(&self, refresh: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome>,
    {
        let observed = self.generation.load(Ordering::SeqCst);
        let mut last = self.gate.lock().await;

        if self.generation.load(Ordering::SeqCst) != observed {
            if let Some(outcome) = last.as_ref() {
                debug!(?outcome, "Joined in-flight session refresh");
                return outcome.clone();
            }
        }

        let outcome = refresh().await;
        *last = Some(outcome.clone());
        self.generation.fetch_add(1, Ordering::SeqCst);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_outcome_predicates() {
        assert!(RefreshOutcome::Refreshed.is_refreshed());
        assert!(RefreshOutcome::Rejected(StatusCode::UNAUTHORIZED).is_hard_rejection());
        assert!(!RefreshOutcome::Rejected(StatusCode::BAD_REQUEST).is_hard_rejection());
        assert!(!RefreshOutcome::Unreachable("offline".into()).is_hard_rejection());
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_coalesce() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let run = |calls: Arc<AtomicUsize>| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            RefreshOutcome::Refreshed
        };

        let (a, b) = tokio::join!(
            coordinator.refresh(|| run(calls.clone())),
            coordinator.refresh(|| run(calls.clone())),
        );

        assert_eq!(a, RefreshOutcome::Refreshed);
        assert_eq!(b, RefreshOutcome::Refreshed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sequential_refreshes_both_run() {
        let coordinator = RefreshCoordinator::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            coordinator
                .refresh(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    RefreshOutcome::Rejected(StatusCode::UNAUTHORIZED)
                })
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
