//! Per-request state machine using rust-fsm.
//!
//! Every call made through [`ApiClient::request`](crate::ApiClient::request)
//! owns one machine. The retry-once rule is structural: the only way into
//! `RetryPending` is a successful refresh from `AwaitingRefresh`, and a 401
//! observed in `RetryPending` leads to `Failed`, never back to
//! `AwaitingRefresh`.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │     Pending     │ (initial)
//! └────────┬────────┘
//!          │ Success ──► Succeeded
//!          │ Failure ──► Failed
//!          │ Unauthorized
//!          ▼
//! ┌─────────────────┐  RefreshFailed   ┌────────────────────┐
//! │ AwaitingRefresh │ ───────────────► │ FailedAfterRefresh │
//! └────────┬────────┘                  └─────────┬──────────┘
//!          │ RefreshSucceeded                    │ LoggedOut
//!          ▼                                     ▼
//! ┌─────────────────┐                         Failed
//! │  RetryPending   │
//! └────────┬────────┘
//!          │ Success ──► Succeeded
//!          │ Failure / Unauthorized ──► Failed
//! ```

use crate::transport::{ApiRequest, ApiResponse};
use crate::{ApiError, ApiResult};
use rust_fsm::*;

state_machine! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub request_machine(Pending)

    Pending => {
        Success => Succeeded,
        Failure => Failed,
        Unauthorized => AwaitingRefresh
    },
    AwaitingRefresh => {
        RefreshSucceeded => RetryPending,
        RefreshFailed => FailedAfterRefresh
    },
    FailedAfterRefresh => {
        LoggedOut => Failed
    },
    RetryPending => {
        Success => Succeeded,
        Failure => Failed,
        // Second 401: no further recovery
        Unauthorized => Failed
    }
}

pub use request_machine::Input as RequestInput;
pub use request_machine::State as RequestState;
pub use request_machine::StateMachine as RequestMachine;

/// One outbound call plus the machine tracking its retry bookkeeping.
pub struct PendingRequest {
    request: ApiRequest,
    machine: RequestMachine,
}

impl PendingRequest {
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            machine: RequestMachine::new(),
        }
    }

    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    pub fn state(&self) -> RequestState {
        *self.machine.state()
    }

    /// The retry marker: set once the call has been re-issued after a refresh.
    pub fn is_retry(&self) -> bool {
        self.state() == RequestState::RetryPending
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state(), RequestState::Succeeded | RequestState::Failed)
    }

    /// Feed one input into the machine.
    pub fn advance(&mut self, input: RequestInput) -> ApiResult<RequestState> {
        let from = self.state();
        self.machine.consume(&input).map_err(|_| {
            ApiError::InvalidStateTransition(format!("{input:?} from {from:?}"))
        })?;
        Ok(self.state())
    }

    /// Classify an attempt's outcome and advance.
    ///
    /// A 401 only counts as `Unauthorized` when the path is refreshable;
    /// on authentication endpoints it is an ordinary failure.
    pub fn observe(
        &mut self,
        outcome: &ApiResult<ApiResponse>,
        refreshable: bool,
    ) -> ApiResult<RequestState> {
        self.advance(classify(outcome, refreshable))
    }
}

fn classify(outcome: &ApiResult<ApiResponse>, refreshable: bool) -> RequestInput {
    match outcome {
        Ok(response) if response.is_success() => RequestInput::Success,
        Ok(response) if response.is_unauthorized() && refreshable => RequestInput::Unauthorized,
        _ => RequestInput::Failure,
    }
}
