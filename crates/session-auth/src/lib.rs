//! Session-aware API client for the coffee-shop back office.
//!
//! This crate provides:
//! - A cookie-carrying HTTP transport behind the [`Transport`] seam
//! - [`ApiClient`]: refresh once and retry once on 401, forced logout when the
//!   refresh fails
//! - An observable [`SessionStore`] (user, loading, error)
//! - Optional proactive refresh while a user is signed in
//! - An explicit FSM per request enforcing the retry-once rule

mod client;
mod error;
mod refresh;
mod refresh_timer;
mod request_fsm;
mod session;
mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use client::{ApiClient, ClientOptions, Registration};
pub use error::{ApiError, ApiResult};
pub use refresh::RefreshOutcome;
pub use request_fsm::request_machine;
pub use request_fsm::{PendingRequest, RequestInput, RequestMachine, RequestState};
pub use session::{Session, SessionStatus, SessionStore, User, SESSION_FETCH_ERROR};
pub use transport::{
    ApiRequest, ApiResponse, HttpTransport, Method, Transport, TransportHandle,
};

pub use reqwest::StatusCode;
