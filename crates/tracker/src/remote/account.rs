//! Account endpoints (`/auth/*`)

use log::{info, warn};
use serde_json::{Value, json};
use std::sync::Arc;

use super::api::{AuthResponse, LoginRequest, RegisterRequest};
use super::auth::CredentialStore;
use super::client::{CallOptions, RemoteClient};
use crate::error::ApiError;

/// Sign-in, sign-up and session management
#[derive(Clone)]
pub struct AuthApi {
    client: Arc<RemoteClient>,
}

impl AuthApi {
    pub fn new(client: Arc<RemoteClient>) -> Self {
        Self { client }
    }

    /// Sign in with email and password
    pub fn login_email(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.login(LoginRequest {
            email: Some(email),
            phone: None,
            password,
        })
    }

    /// Sign in with phone number and password
    pub fn login_phone(&self, phone: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.login(LoginRequest {
            email: None,
            phone: Some(phone),
            password,
        })
    }

    /// Create an account; the returned tokens sign the user in
    pub fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let response: AuthResponse =
            self.client
                .post("/auth/register", request, CallOptions::anonymous())?;
        self.adopt_tokens(&response);
        info!("Registered new account");
        Ok(response)
    }

    /// End the session
    ///
    /// The server call is best-effort; local tokens are cleared regardless.
    pub fn logout(&self) {
        if let Some(refresh_token) = self.client.credentials().refresh_token() {
            let body = json!({ "refresh_token": refresh_token });
            if let Err(e) = self
                .client
                .post::<_, Value>("/auth/logout", &body, CallOptions::default())
            {
                warn!("Logout request failed: {}", e);
            }
        }
        self.client.credentials().clear();
        info!("Logged out");
    }

    /// Current user profile
    pub fn me(&self) -> Result<Value, ApiError> {
        self.client.get("/auth/me")
    }

    /// Stored tokens, e.g. to restore a session issued elsewhere
    pub fn credentials(&self) -> &CredentialStore {
        self.client.credentials()
    }

    pub fn is_logged_in(&self) -> bool {
        self.client.credentials().is_logged_in()
    }

    fn login(&self, request: LoginRequest<'_>) -> Result<AuthResponse, ApiError> {
        let response: AuthResponse =
            self.client
                .post("/auth/login", &request, CallOptions::anonymous())?;
        self.adopt_tokens(&response);
        info!("Logged in");
        Ok(response)
    }

    fn adopt_tokens(&self, response: &AuthResponse) {
        match &response.tokens {
            Some(pair) if !pair.access_token.is_empty() => {
                self.client.credentials().save_pair(pair);
            }
            _ => warn!("Auth response carried no tokens"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{Credentials, ScriptedTransport};
    use crate::storage::{Cache, InMemoryKvStore};

    fn api() -> (Arc<ScriptedTransport>, AuthApi) {
        let transport = Arc::new(ScriptedTransport::new());
        let credentials = CredentialStore::new(Cache::new(Arc::new(InMemoryKvStore::new()), "em"));
        let client = Arc::new(RemoteClient::new("http://api.test", transport.clone(), credentials));
        (transport, AuthApi::new(client))
    }

    #[test]
    fn test_login_stores_tokens() {
        let (transport, api) = api();
        transport.push_ok(json!({
            "user": {"id": 1, "email": "a@b.c"},
            "tokens": {"access_token": "acc", "refresh_token": "ref", "token_type": "bearer", "expires_in": 1800}
        }));

        let response = api.login_email("a@b.c", "secret").unwrap();

        assert_eq!(response.user.unwrap()["id"], 1);
        assert!(api.is_logged_in());
        let request = &transport.requests()[0];
        assert_eq!(request.bearer, None);
        assert_eq!(request.body, Some(json!({"email": "a@b.c", "password": "secret"})));
    }

    #[test]
    fn test_invalid_credentials() {
        let (transport, api) = api();
        transport.push_api_error(2003, "invalid credentials", Value::Null);

        let err = api.login_phone("13800000000", "wrong").unwrap_err();

        assert_eq!(err.code, 2003);
        assert!(!api.is_logged_in());
    }

    #[test]
    fn test_logout_clears_even_when_offline() {
        let (transport, api) = api();
        api.credentials()
            .save(&Credentials::new("acc", Some("ref".to_string())));
        transport.push_failure("offline");

        api.logout();

        assert!(!api.is_logged_in());
        assert_eq!(
            transport.requests()[0].body,
            Some(json!({"refresh_token": "ref"}))
        );
    }
}
