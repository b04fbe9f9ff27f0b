//! Scripted in-memory transport for tests.
//!
//! [`MockBackend`] plays back queued replies per `(method, path)` route and
//! records every request it receives, so tests can assert on exactly which
//! calls the client made. Unscripted routes answer 404.

use crate::transport::{ApiRequest, ApiResponse, Method, Transport};
use crate::{ApiError, ApiResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// A scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with this status and body.
    Respond(StatusCode, String),
    /// No response at all.
    Fail,
    /// Wait, then play the inner reply.
    Delayed(Duration, Box<MockReply>),
    /// Wait until the gate is notified, then play the inner reply.
    Gated(Arc<Notify>, Box<MockReply>),
}

impl MockReply {
    pub fn json(status: StatusCode, body: Value) -> Self {
        MockReply::Respond(status, body.to_string())
    }

    pub fn ok(body: Value) -> Self {
        Self::json(StatusCode::OK, body)
    }

    pub fn status(status: StatusCode) -> Self {
        MockReply::Respond(status, String::new())
    }

    pub fn delayed(self, by: Duration) -> Self {
        MockReply::Delayed(by, Box::new(self))
    }

    pub fn gated(self, gate: Arc<Notify>) -> Self {
        MockReply::Gated(gate, Box::new(self))
    }
}

#[derive(Default)]
struct Route {
    queued: VecDeque<MockReply>,
    fallback: Option<MockReply>,
}

/// In-memory backend implementing [`Transport`].
#[derive(Default)]
pub struct MockBackend {
    routes: Mutex<HashMap<(Method, String), Route>>,
    calls: Mutex<Vec<ApiRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn route_key(method: Method, path: &str) -> (Method, String) {
    let path = path.split('?').next().unwrap_or(path);
    (method, path.to_string())
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a one-shot reply for `method path`.
    pub fn enqueue(&self, method: Method, path: &str, reply: MockReply) -> &Self {
        lock(&self.routes)
            .entry(route_key(method, path))
            .or_default()
            .queued
            .push_back(reply);
        self
    }

    /// Queue a one-shot reply with a JSON body.
    pub fn respond(&self, method: Method, path: &str, status: StatusCode, body: Value) -> &Self {
        self.enqueue(method, path, MockReply::json(status, body))
    }

    /// Reply used once the queue for `method path` is empty.
    pub fn respond_always(&self, method: Method, path: &str, reply: MockReply) -> &Self {
        lock(&self.routes)
            .entry(route_key(method, path))
            .or_default()
            .fallback = Some(reply);
        self
    }

    /// Every request received, in order.
    pub fn calls(&self) -> Vec<ApiRequest> {
        lock(&self.calls).clone()
    }

    /// Number of requests received for `method path` (query ignored).
    pub fn count(&self, method: Method, path: &str) -> usize {
        let key = route_key(method, path);
        lock(&self.calls)
            .iter()
            .filter(|call| route_key(call.method(), call.path()) == key)
            .count()
    }

    fn next_reply(&self, request: &ApiRequest) -> MockReply {
        let mut routes = lock(&self.routes);
        routes
            .get_mut(&route_key(request.method(), request.path()))
            .and_then(|route| route.queued.pop_front().or_else(|| route.fallback.clone()))
            .unwrap_or_else(|| MockReply::status(StatusCode::NOT_FOUND))
    }
}

#[async_trait]
impl Transport for MockBackend {
    async fn send(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        lock(&self.calls).push(request.clone());
        let mut reply = self.next_reply(request);

        loop {
            match reply {
                MockReply::Respond(status, body) => return Ok(ApiResponse::new(status, body)),
                MockReply::Fail => return Err(ApiError::NetworkUnavailable),
                MockReply::Delayed(by, next) => {
                    tokio::time::sleep(by).await;
                    reply = *next;
                }
                MockReply::Gated(gate, next) => {
                    gate.notified().await;
                    reply = *next;
                }
            }
        }
    }
}
