//! HTTP transport seam
//!
//! [`RemoteClient`](super::RemoteClient) speaks to the network only through
//! [`HttpTransport`]. Production uses a synchronous ureq agent to stay
//! executor-agnostic; tests script responses with `ScriptedTransport`
//! (behind the `test-support` feature).

use anyhow::{Context, Result};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// HTTP methods used by the backend API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        })
    }
}

/// A fully resolved outgoing request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Bearer token for the Authorization header
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

/// Status and raw body of a response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Sends requests; any status code counts as a response, only I/O fails
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// ureq-backed transport
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        // Non-2xx statuses are returned as responses so the client can read
        // the envelope and detect 401s.
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }
}

impl HttpTransport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let authorization = request.bearer.as_ref().map(|t| format!("Bearer {}", t));

        let result = match request.method {
            Method::Get => {
                let mut builder = self.agent.get(&request.url);
                if let Some(value) = &authorization {
                    builder = builder.header("Authorization", value.as_str());
                }
                builder.call()
            }
            Method::Post | Method::Put => {
                let mut builder = if request.method == Method::Post {
                    self.agent.post(&request.url)
                } else {
                    self.agent.put(&request.url)
                };
                if let Some(value) = &authorization {
                    builder = builder.header("Authorization", value.as_str());
                }
                match &request.body {
                    Some(body) => builder.send_json(body),
                    None => builder.send_empty(),
                }
            }
        };

        let response =
            result.with_context(|| format!("Failed to send {} {}", request.method, request.url))?;
        let status = response.status().as_u16();
        let body = response
            .into_body()
            .read_to_string()
            .context("Failed to read response body")?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Put.to_string(), "PUT");
    }
}
