//! Authenticated API client.
//!
//! [`ApiClient`] is the single call surface for the back-office backend.
//! Credentials live in the transport's cookie jar. When a call comes back 401
//! the client refreshes the session once and re-issues the call once; if the
//! refresh fails the session is cleared and the call fails with
//! [`ApiError::SessionExpired`].

use crate::refresh::{RefreshCoordinator, RefreshOutcome};
use crate::refresh_timer::RefreshTimer;
use crate::request_fsm::{PendingRequest, RequestInput};
use crate::session::{FetchGuard, FetchOutcome, Session, SessionStore, User, SESSION_FETCH_ERROR};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Method, TransportHandle};
use crate::{ApiError, ApiResult};
use backoffice_config::{Config, Endpoints};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Client behaviour knobs.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub endpoints: Endpoints,
    /// Background refresh interval while signed in; `None` disables it.
    pub proactive_refresh: Option<Duration>,
}

impl From<&Config> for ClientOptions {
    fn from(config: &Config) -> Self {
        Self {
            endpoints: config.endpoints.clone(),
            proactive_refresh: config.proactive_refresh_interval(),
        }
    }
}

/// Account details for [`ApiClient::register`].
#[derive(Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn validate(&self) -> ApiResult<()> {
        if [&self.username, &self.email, &self.password]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(ApiError::InvalidRequest(
                "Username, email, and password are required".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct ClientInner {
    transport: TransportHandle,
    session: SessionStore,
    endpoints: Endpoints,
    refresh: RefreshCoordinator,
    proactive_refresh: Option<Duration>,
    timer: Mutex<Option<RefreshTimer>>,
}

impl ClientInner {
    /// Refresh through the coordinator so concurrent callers share one call.
    pub(crate) async fn refresh_session(&self) -> RefreshOutcome {
        self.refresh.refresh(|| self.call_refresh()).await
    }

    async fn call_refresh(&self) -> RefreshOutcome {
        let request = ApiRequest::post(&self.endpoints.refresh, json!({}));
        match self.transport.send(&request).await {
            Ok(response) if response.is_success() => {
                debug!("Session refreshed");
                RefreshOutcome::Refreshed
            }
            Ok(response) => {
                debug!(status = response.status().as_u16(), "Refresh rejected");
                RefreshOutcome::Rejected(response.status())
            }
            Err(err) => RefreshOutcome::Unreachable(err.to_string()),
        }
    }

    /// Best-effort server logout, then clear local state. Never fails.
    pub(crate) async fn logout(&self) {
        let request = ApiRequest::post(&self.endpoints.logout, json!({}));
        match self.transport.send(&request).await {
            Ok(response) if response.is_success() => debug!("Server session invalidated"),
            Ok(response) => warn!(
                status = response.status().as_u16(),
                "Logout endpoint returned an error, clearing local session anyway"
            ),
            Err(err) => warn!(
                error = %err,
                "Logout request failed, clearing local session anyway"
            ),
        }

        if self.session.clear_user() {
            info!("Logged out");
        }
        self.stop_timer();
    }

    fn start_timer(self: &Arc<Self>) {
        let Some(every) = self.proactive_refresh else {
            return;
        };

        let mut slot = lock(&self.timer);
        if slot.as_ref().is_some_and(|timer| !timer.is_finished()) {
            return;
        }
        *slot = Some(RefreshTimer::spawn(Arc::downgrade(self), every));
    }

    fn stop_timer(&self) {
        if self.take_timer().is_some() {
            debug!("Proactive refresh cancelled");
        }
    }

    pub(crate) fn take_timer(&self) -> Option<RefreshTimer> {
        lock(&self.timer).take()
    }
}

/// Cookie-authenticated client for the back-office API.
///
/// Cloning is cheap; clones share the session, the refresh gate and the
/// background timer. The timer stops when the last clone is dropped.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    pub fn new(transport: TransportHandle, options: ClientOptions) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                session: SessionStore::new(),
                endpoints: options.endpoints,
                refresh: RefreshCoordinator::new(),
                proactive_refresh: options.proactive_refresh,
                timer: Mutex::new(None),
            }),
        }
    }

    /// Build a client with an [`HttpTransport`] from configuration.
    pub fn from_config(config: &Config) -> ApiResult<Self> {
        config.validate()?;
        let transport = HttpTransport::from_config(config)?;
        info!(base_url = %transport.base_url(), "API client configured");
        Ok(Self::new(Arc::new(transport), ClientOptions::from(config)))
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Shortcut for `session().subscribe()`.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.session.subscribe()
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    /// Whether the proactive refresh task is running.
    pub fn refresh_timer_active(&self) -> bool {
        lock(&self.inner.timer)
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    /// Ask the backend who is signed in and update the session.
    ///
    /// A 401 is the ordinary signed-out state and sets no error. Any other
    /// failure clears the user and sets a generic error. If a fetch is already
    /// in flight this returns the current snapshot without a second request.
    pub async fn fetch_session(&self) -> Session {
        let Some(fetch) = self.inner.session.try_begin_fetch() else {
            debug!("Session fetch already in flight, skipping");
            return self.inner.session.snapshot();
        };
        self.run_fetch(fetch).await
    }

    async fn run_fetch(&self, _fetch: FetchGuard<'_>) -> Session {
        let inner = &self.inner;
        let epoch = inner.session.epoch();
        let loading = inner.session.begin_loading();

        let request = ApiRequest::get(&inner.endpoints.me);
        let outcome = match inner.transport.send(&request).await {
            Ok(response) if response.is_success() => match response.json::<User>() {
                Ok(user) => FetchOutcome::Authenticated(user),
                Err(err) => {
                    warn!(error = %err, "Unreadable user payload");
                    FetchOutcome::Failed(SESSION_FETCH_ERROR.to_string())
                }
            },
            Ok(response) if response.is_unauthorized() => FetchOutcome::Unauthenticated,
            Ok(response) => {
                warn!(
                    status = response.status().as_u16(),
                    "Session fetch failed"
                );
                FetchOutcome::Failed(SESSION_FETCH_ERROR.to_string())
            }
            Err(err) => {
                warn!(error = %err, "Session fetch failed");
                FetchOutcome::Failed(SESSION_FETCH_ERROR.to_string())
            }
        };

        let authenticated = matches!(outcome, FetchOutcome::Authenticated(_));
        if inner.session.settle_fetch(epoch, outcome) {
            if authenticated {
                inner.start_timer();
            } else {
                inner.stop_timer();
            }
        } else {
            debug!("Discarding stale session fetch");
        }

        drop(loading);
        inner.session.snapshot()
    }

    /// Issue `method path` with an optional JSON body.
    ///
    /// The body is only sent for `post`, `put` and `patch`.
    pub async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<Value>,
    ) -> ApiResult<ApiResponse> {
        self.send(ApiRequest::new(method, path).with_optional_body(body))
            .await
    }

    /// Like [`request`](Self::request) and decode the 2xx body as JSON.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        path: &str,
        method: Method,
        body: Option<Value>,
    ) -> ApiResult<T> {
        self.request(path, method, body).await?.json()
    }

    /// Send a prepared request and decode the 2xx body as JSON.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        self.send(request).await?.json()
    }

    /// Send a prepared request with refresh-and-retry-once on 401.
    ///
    /// Returns `Ok` only for 2xx. A 401 after the retry is returned as
    /// [`ApiError::Unauthorized`] with no second refresh. Authentication
    /// endpoints never trigger a refresh.
    pub async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let inner = &self.inner;
        let refreshable = !inner.endpoints.is_auth_endpoint(request.path());
        let request_id = Uuid::new_v4();
        let mut call = PendingRequest::new(request);

        let first = inner.transport.send(call.request()).await;
        call.observe(&first, refreshable)?;
        if call.is_terminal() {
            return settle(first);
        }

        debug!(
            %request_id,
            method = %call.request().method(),
            path = %call.request().path(),
            "Access rejected, refreshing session"
        );
        let _loading = inner.session.begin_loading();

        let outcome = inner.refresh_session().await;
        if !outcome.is_refreshed() {
            call.advance(RequestInput::RefreshFailed)?;
            warn!(%request_id, ?outcome, "Session refresh failed, logging out");
            inner.logout().await;
            call.advance(RequestInput::LoggedOut)?;
            return Err(ApiError::SessionExpired);
        }

        call.advance(RequestInput::RefreshSucceeded)?;
        debug!(%request_id, retry = call.is_retry(), "Retrying after refresh");
        let retried = inner.transport.send(call.request()).await;
        call.observe(&retried, refreshable)?;
        settle(retried)
    }

    pub async fn get(&self, path: &str) -> ApiResult<ApiResponse> {
        self.request(path, Method::Get, None).await
    }

    /// Invalidate the server session (best effort) and clear local state.
    ///
    /// Always succeeds locally, even when the network call fails. Calling it
    /// while signed out is harmless.
    pub async fn logout(&self) {
        self.inner.logout().await;
    }

    /// Sign in with username and password, then fetch the session.
    ///
    /// The backend answers by setting the session cookies; the returned
    /// snapshot reflects the follow-up session fetch. A fetch already in
    /// flight was sent without those cookies, so its result is discarded and
    /// a fresh one is issued once it finishes.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Session> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ApiError::InvalidRequest(
                "Username and password are required".to_string(),
            ));
        }

        let request = ApiRequest::post(
            &self.inner.endpoints.login,
            json!({ "username": username, "password": password }),
        );
        let response = self.inner.transport.send(&request).await?;

        match response.status() {
            status if status.is_success() => {
                info!(username, "Logged in");
                self.inner.session.invalidate_fetches();
                let fetch = self.inner.session.begin_fetch().await;
                Ok(self.run_fetch(fetch).await)
            }
            StatusCode::UNAUTHORIZED => Err(ApiError::InvalidCredentials(response.message())),
            status => Err(ApiError::Status {
                status,
                body: response.into_body(),
            }),
        }
    }

    /// Create an account. Does not sign in.
    pub async fn register(&self, registration: &Registration) -> ApiResult<()> {
        registration.validate()?;

        let body = serde_json::to_value(registration)?;
        let request = ApiRequest::post(&self.inner.endpoints.register, body);
        let response = self.inner.transport.send(&request).await?;

        match response.status() {
            status if status.is_success() => {
                info!(username = %registration.username, "Account registered");
                Ok(())
            }
            StatusCode::BAD_REQUEST => Err(ApiError::Registration(response.message())),
            status => Err(ApiError::Status {
                status,
                body: response.into_body(),
            }),
        }
    }
}

/// Map a final attempt to the caller's result.
fn settle(outcome: ApiResult<ApiResponse>) -> ApiResult<ApiResponse> {
    let response = outcome?;
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized {
            body: response.into_body(),
        }),
        status => Err(ApiError::Status {
            status,
            body: response.into_body(),
        }),
    }
}
