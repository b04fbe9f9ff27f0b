//! Proactive session refresh.
//!
//! While a user is signed in, a background task refreshes the access cookie
//! on a fixed interval shorter than its lifetime. The task only holds a
//! `Weak` reference to the client, and the [`RefreshTimer`] handle aborts it
//! on drop, so logout and client teardown both stop it.

use crate::client::ClientInner;
use crate::refresh::RefreshOutcome;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Handle to the background refresh task. Dropping it cancels the task.
pub(crate) struct RefreshTimer {
    handle: Option<JoinHandle<()>>,
}

impl RefreshTimer {
    /// Spawn the task. The first refresh fires one `every` from now.
    pub(crate) fn spawn(client: Weak<ClientInner>, every: Duration) -> Self {
        let handle = tokio::spawn(run(client, every));
        debug!(interval_secs = every.as_secs(), "Proactive refresh scheduled");
        Self {
            handle: Some(handle),
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Release the task without aborting it. Used by the task itself before it
    /// logs out, so clearing the timer slot does not cancel the logout.
    pub(crate) fn disarm(mut self) {
        self.handle.take();
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run(client: Weak<ClientInner>, every: Duration) {
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(inner) = client.upgrade() else {
            break;
        };

        match inner.refresh_session().await {
            RefreshOutcome::Refreshed => debug!("Proactive session refresh succeeded"),
            outcome if outcome.is_hard_rejection() => {
                info!("Refresh credential rejected, logging out");
                if let Some(timer) = inner.take_timer() {
                    timer.disarm();
                }
                inner.logout().await;
                break;
            }
            outcome => {
                warn!(?outcome, "Proactive session refresh failed, keeping session");
            }
        }
    }
}
