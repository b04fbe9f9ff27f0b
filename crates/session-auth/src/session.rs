//! Session state store.
//!
//! The session (current user, loading flag, error) is published through a
//! `tokio::sync::watch` channel. Consumers either read a [`Session`] snapshot
//! or subscribe and await transitions, e.g. a route guard reacting to a forced
//! logout.
//!
//! Writes are serialized by the channel's lock. An epoch counter is bumped
//! whenever the user is cleared or a sign-in replaces the credentials, and a
//! fetch result is applied only if the epoch it started under is still
//! current. A slow `/me/` response can therefore never resurrect a user after
//! logout, nor sign one out after login.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{watch, Notify};
use tracing::debug;

/// Generic error shown when the session could not be fetched.
pub const SESSION_FETCH_ERROR: &str = "Could not fetch user data";

/// The authenticated user as returned by the backend's "who am I" endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Any further fields the backend returns.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            id: None,
            extra: Map::new(),
        }
    }
}

/// Coarse session status for route guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No user yet, a fetch or refresh-triggered retry is outstanding.
    Loading,
    Authenticated,
    /// No user and nothing in flight: show the login screen.
    Unauthenticated,
}

/// Snapshot of the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<User>,
    pub loading: bool,
    /// Set only on unexpected failures, never for an ordinary 401.
    pub error: Option<String>,
}

impl Session {
    pub fn status(&self) -> SessionStatus {
        match (&self.user, self.loading) {
            (Some(_), _) => SessionStatus::Authenticated,
            (None, true) => SessionStatus::Loading,
            (None, false) => SessionStatus::Unauthenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Result of one session fetch, applied by [`SessionStore::settle_fetch`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FetchOutcome {
    Authenticated(User),
    Unauthenticated,
    Failed(String),
}

/// Observable session store.
pub struct SessionStore {
    state: watch::Sender<Session>,
    epoch: AtomicU64,
    fetch_in_flight: AtomicBool,
    fetch_done: Notify,
    outstanding: AtomicUsize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            state,
            epoch: AtomicU64::new(0),
            fetch_in_flight: AtomicBool::new(false),
            fetch_done: Notify::new(),
            outstanding: AtomicUsize::new(0),
        }
    }

    /// Current session.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver notified on every session transition.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().user.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status()
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Claim the single fetch slot. `None` if a fetch is already running.
    pub(crate) fn try_begin_fetch(&self) -> Option<FetchGuard<'_>> {
        self.fetch_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| FetchGuard { store: self })
    }

    /// Wait for the fetch slot to free up, then claim it.
    pub(crate) async fn begin_fetch(&self) -> FetchGuard<'_> {
        loop {
            let released = self.fetch_done.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            if let Some(guard) = self.try_begin_fetch() {
                return guard;
            }
            released.await;
        }
    }

    /// Make every in-flight fetch stale without touching the current user.
    pub(crate) fn invalidate_fetches(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark work as outstanding; `loading` drops back once every guard is gone.
    pub(crate) fn begin_loading(&self) -> LoadingGuard<'_> {
        self.state.send_if_modified(|session| {
            self.outstanding.fetch_add(1, Ordering::SeqCst);
            let changed = !session.loading;
            session.loading = true;
            changed
        });
        LoadingGuard { store: self }
    }

    fn end_loading(&self) {
        self.state.send_if_modified(|session| {
            let remaining = self.outstanding.fetch_sub(1, Ordering::SeqCst) - 1;
            if remaining == 0 && session.loading {
                session.loading = false;
                true
            } else {
                false
            }
        });
    }

    /// Apply a fetch result if no logout happened since `epoch` was read.
    ///
    /// Returns false when the result was stale and discarded.
    pub(crate) fn settle_fetch(&self, epoch: u64, outcome: FetchOutcome) -> bool {
        self.state.send_if_modified(|session| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            match outcome {
                FetchOutcome::Authenticated(user) => {
                    session.user = Some(user);
                    session.error = None;
                }
                FetchOutcome::Unauthenticated => {
                    session.user = None;
                    session.error = None;
                }
                FetchOutcome::Failed(message) => {
                    session.user = None;
                    session.error = Some(message);
                }
            }
            true
        })
    }

    /// Clear the user and invalidate in-flight fetches.
    ///
    /// Returns true if a user was actually cleared.
    pub(crate) fn clear_user(&self) -> bool {
        self.state.send_if_modified(|session| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            let cleared = session.user.take().is_some();
            if cleared {
                debug!("Session user cleared");
            }
            cleared
        })
    }
}

/// Holds the single fetch slot until dropped.
pub(crate) struct FetchGuard<'a> {
    store: &'a SessionStore,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.store.fetch_in_flight.store(false, Ordering::SeqCst);
        self.store.fetch_done.notify_waiters();
    }
}

/// Keeps `loading` set until dropped.
pub(crate) struct LoadingGuard<'a> {
    store: &'a SessionStore,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.end_loading();
    }
}
