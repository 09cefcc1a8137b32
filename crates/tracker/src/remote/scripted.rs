//! Scripted transport for tests

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use super::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Transport that replays queued responses in order
///
/// Every request is recorded. Once the script runs out, requests fail as
/// if the network were down.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<std::result::Result<HttpResponse, String>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response
    pub fn push_raw(&self, status: u16, body: impl Into<String>) {
        self.lock_responses().push_back(Ok(HttpResponse {
            status,
            body: body.into(),
        }));
    }

    /// Queue a 200 success envelope carrying `data`
    pub fn push_ok(&self, data: Value) {
        self.push_raw(
            200,
            json!({"code": 0, "message": "success", "data": data}).to_string(),
        );
    }

    /// Queue an application error envelope
    pub fn push_api_error(&self, code: i64, message: &str, data: Value) {
        self.push_raw(
            200,
            json!({"code": code, "message": message, "data": data}).to_string(),
        );
    }

    /// Queue a 401 response
    pub fn push_unauthorized(&self) {
        self.push_raw(
            401,
            json!({"code": 2002, "message": "token expired", "data": null}).to_string(),
        );
    }

    /// Queue a network-level failure
    pub fn push_failure(&self, message: &str) {
        self.lock_responses().push_back(Err(message.to_string()));
    }

    /// Requests sent so far, oldest first
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Scripted responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.lock_responses().len()
    }

    fn lock_responses(
        &self,
    ) -> std::sync::MutexGuard<'_, VecDeque<std::result::Result<HttpResponse, String>>> {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        match self.lock_responses().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("connection refused")),
        }
    }
}
