//! Authenticated request gateway for the learning backend
//!
//! Every call goes through [`RemoteClient::call`], which attaches the
//! bearer token, refreshes an expired session once, unwraps the response
//! envelope, and folds transport failures into [`ApiError`].

use log::{debug, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::{Arc, PoisonError, RwLock};

use super::api::{Envelope, TokenPair};
use super::auth::{CredentialStore, SessionListener, SharedListener};
use super::transport::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::error::{ApiError, codes};

/// Per-call options
#[derive(Debug, Clone, Copy)]
pub struct CallOptions {
    /// Attach the stored access token
    pub requires_auth: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            requires_auth: true,
        }
    }
}

impl CallOptions {
    pub fn anonymous() -> Self {
        Self {
            requires_auth: false,
        }
    }
}

/// Backend API client
pub struct RemoteClient {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    credentials: CredentialStore,
    listener: RwLock<SharedListener>,
}

impl RemoteClient {
    /// Path of the token refresh endpoint
    const REFRESH_PATH: &'static str = "/auth/refresh";

    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `http://localhost:8000/api/v1`
    /// * `transport` - HTTP transport to send requests through
    /// * `credentials` - Token storage
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        credentials: CredentialStore,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            transport,
            credentials,
            listener: RwLock::new(None),
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Register the receiver of session-expired notifications
    pub fn set_session_listener(&self, listener: Option<Arc<dyn SessionListener>>) {
        *self.listener.write().unwrap_or_else(PoisonError::into_inner) = listener;
    }

    /// Issue a request and return the envelope's `data`
    ///
    /// A 401 on an authenticated call triggers one refresh; if it succeeds
    /// the call is retried exactly once, otherwise credentials are cleared,
    /// the session listener is notified, and the call fails as
    /// unauthenticated.
    pub fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: CallOptions,
    ) -> Result<Value, ApiError> {
        let url = self.url(path);
        let mut response = self.send(method, &url, body, options.requires_auth)?;

        if response.status == 401 && options.requires_auth {
            debug!("{} {} returned 401, refreshing session", method, path);
            if self.refresh_session() {
                response = self.send(method, &url, body, true)?;
            } else {
                self.expire_session();
                return Err(ApiError::session_expired());
            }
        }

        parse_envelope(&response)
    }

    /// Issue a request and decode the envelope's `data` into `T`
    pub fn call_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: CallOptions,
    ) -> Result<T, ApiError> {
        let data = self.call(method, path, body, options)?;
        decode(data, path)
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.call_json(Method::Get, path, None, CallOptions::default())
    }

    pub fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        options: CallOptions,
    ) -> Result<T, ApiError> {
        let body = encode(body)?;
        self.call_json(Method::Post, path, Some(&body), options)
    }

    pub fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let body = encode(body)?;
        self.call_json(Method::Put, path, Some(&body), CallOptions::default())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        with_auth: bool,
    ) -> Result<HttpResponse, ApiError> {
        let request = HttpRequest {
            method,
            url: url.to_string(),
            bearer: if with_auth {
                self.credentials.access_token()
            } else {
                None
            },
            body: body.cloned(),
        };

        self.transport.send(&request).map_err(|e| {
            warn!("API request failed: {:#}", e);
            ApiError::transport(format!("Network request failed: {:#}", e))
        })
    }

    /// Exchange the refresh token for a new pair; never retried
    fn refresh_session(&self) -> bool {
        let Some(refresh_token) = self.credentials.refresh_token() else {
            debug!("No refresh token stored");
            return false;
        };

        let body = json!({ "refresh_token": refresh_token });
        let response = match self.send(Method::Post, &self.url(Self::REFRESH_PATH), Some(&body), false) {
            Ok(response) => response,
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                return false;
            }
        };

        let pair = parse_envelope(&response).and_then(|data| decode::<TokenPair>(data, Self::REFRESH_PATH));
        match pair {
            Ok(pair) if !pair.access_token.is_empty() => {
                self.credentials.save_pair(&pair);
                info!("Session refreshed");
                true
            }
            Ok(_) => {
                warn!("Token refresh returned an empty access token");
                false
            }
            Err(e) => {
                warn!("Token refresh rejected: {}", e);
                false
            }
        }
    }

    fn expire_session(&self) {
        self.credentials.clear();
        let listener = self
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(listener) = listener {
            listener.on_session_expired();
        }
    }
}

/// Unwrap `{code, message, data}`; anything else is a transport-level failure
fn parse_envelope(response: &HttpResponse) -> Result<Value, ApiError> {
    let envelope: Envelope = serde_json::from_str(&response.body).map_err(|e| {
        warn!("Malformed response (HTTP {}): {}", response.status, e);
        ApiError::transport(format!(
            "Malformed response (HTTP {}): {}",
            response.status, e
        ))
    })?;

    if envelope.code != codes::SUCCESS {
        return Err(ApiError::new(envelope.code, envelope.message, envelope.data));
    }

    Ok(envelope.data.unwrap_or(Value::Null))
}

fn decode<T: DeserializeOwned>(data: Value, path: &str) -> Result<T, ApiError> {
    serde_json::from_value(data)
        .map_err(|e| ApiError::transport(format!("Unexpected response shape from {}: {}", path, e)))
}

fn encode<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::new(codes::INVALID_PARAMS, format!("Unencodable request: {}", e), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorKind;
    use crate::remote::{Credentials, ScriptedTransport};
    use crate::storage::{Cache, InMemoryKvStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn client() -> (Arc<ScriptedTransport>, RemoteClient) {
        let transport = Arc::new(ScriptedTransport::new());
        let cache = Cache::new(Arc::new(InMemoryKvStore::new()), "em");
        let credentials = CredentialStore::new(cache);
        credentials.save(&Credentials::new("access-1", Some("refresh-1".to_string())));
        let client = RemoteClient::new("http://api.test/api/v1/", transport.clone(), credentials);
        (transport, client)
    }

    #[test]
    fn test_attaches_bearer_token() {
        let (transport, client) = client();
        transport.push_ok(json!({"ok": true}));

        let data = client
            .call(Method::Get, "/auth/me", None, CallOptions::default())
            .unwrap();

        assert_eq!(data, json!({"ok": true}));
        let requests = transport.requests();
        assert_eq!(requests[0].url, "http://api.test/api/v1/auth/me");
        assert_eq!(requests[0].bearer.as_deref(), Some("access-1"));
    }

    #[test]
    fn test_anonymous_call_has_no_token() {
        let (transport, client) = client();
        transport.push_ok(Value::Null);

        client
            .call(Method::Post, "/auth/login", Some(&json!({})), CallOptions::anonymous())
            .unwrap();

        assert_eq!(transport.requests()[0].bearer, None);
    }

    #[test]
    fn test_application_error_carries_envelope() {
        let (transport, client) = client();
        transport.push_api_error(3001, "membership required", json!({"plan": "pro"}));

        let err = client
            .call(Method::Get, "/learning/stats", None, CallOptions::default())
            .unwrap_err();

        assert_eq!(err.code, 3001);
        assert_eq!(err.message, "membership required");
        assert_eq!(err.data, Some(json!({"plan": "pro"})));
        assert_eq!(err.kind(), ApiErrorKind::MembershipRequired);
        // No retry for application errors
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn test_refresh_then_retry_once() {
        let (transport, client) = client();
        transport.push_unauthorized();
        transport.push_ok(json!({"access_token": "access-2", "refresh_token": "refresh-2"}));
        transport.push_ok(json!({"vocabulary": 10}));

        let data = client
            .call(Method::Get, "/learning/progress", None, CallOptions::default())
            .unwrap();

        assert_eq!(data["vocabulary"], 10);
        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].url, "http://api.test/api/v1/auth/refresh");
        assert_eq!(requests[1].bearer, None);
        assert_eq!(requests[1].body, Some(json!({"refresh_token": "refresh-1"})));
        assert_eq!(requests[2].bearer.as_deref(), Some("access-2"));
        assert_eq!(client.credentials().refresh_token().as_deref(), Some("refresh-2"));
    }

    #[test]
    fn test_second_401_is_not_retried_again() {
        let (transport, client) = client();
        transport.push_unauthorized();
        transport.push_ok(json!({"access_token": "access-2"}));
        transport.push_unauthorized();

        let err = client
            .call(Method::Get, "/learning/progress", None, CallOptions::default())
            .unwrap_err();

        assert_eq!(err.code, 2002);
        assert_eq!(transport.requests().len(), 3);
    }

    #[test]
    fn test_refresh_failure_clears_credentials_and_notifies() {
        let (transport, client) = client();
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        client.set_session_listener(Some(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        transport.push_unauthorized();
        transport.push_api_error(2002, "refresh token expired", Value::Null);

        let err = client
            .call(Method::Get, "/learning/progress", None, CallOptions::default())
            .unwrap_err();

        assert!(err.is_unauthenticated());
        assert!(!client.credentials().is_logged_in());
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn test_transport_failure_is_wrapped() {
        let (transport, client) = client();
        transport.push_failure("connection reset");

        let err = client
            .call(Method::Get, "/learning/progress", None, CallOptions::default())
            .unwrap_err();

        assert_eq!(err.code, codes::UNKNOWN_ERROR);
        assert_eq!(err.kind(), ApiErrorKind::RemoteUnavailable);
    }

    #[test]
    fn test_malformed_json_is_wrapped() {
        let (transport, client) = client();
        transport.push_raw(502, "<html>Bad Gateway</html>");

        let err = client
            .call(Method::Get, "/learning/progress", None, CallOptions::default())
            .unwrap_err();

        assert!(err.is_transport());
        assert!(err.message.contains("502"));
    }
}
