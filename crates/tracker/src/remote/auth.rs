//! Credential storage and session signalling
//!
//! Tokens are persisted in the offline cache so a restart keeps the user
//! signed in. Only [`RemoteClient`](super::RemoteClient) and
//! [`AuthApi`](super::AuthApi) write them.

use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::api::TokenPair;
use crate::storage::{Cache, keys};

/// Stored token data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }
}

/// Receives notice that the session ended and the user must sign in again
///
/// Implemented by the UI layer, which owns navigation to the login screen.
pub trait SessionListener: Send + Sync {
    fn on_session_expired(&self);
}

impl<F> SessionListener for F
where
    F: Fn() + Send + Sync,
{
    fn on_session_expired(&self) {
        self()
    }
}

/// Cache-backed credential persistence
#[derive(Clone)]
pub struct CredentialStore {
    cache: Cache,
}

impl CredentialStore {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Load stored credentials, if any
    pub fn load(&self) -> Option<Credentials> {
        self.cache
            .read_opt::<Credentials>(keys::AUTH_TOKENS)
            .filter(|c| !c.access_token.is_empty())
    }

    pub fn access_token(&self) -> Option<String> {
        self.load().map(|c| c.access_token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.load().and_then(|c| c.refresh_token)
    }

    pub fn save(&self, credentials: &Credentials) {
        self.cache.write(keys::AUTH_TOKENS, credentials);
    }

    /// Save a freshly issued pair
    ///
    /// Keeps the previous refresh token if the server did not rotate it.
    pub fn save_pair(&self, pair: &TokenPair) -> Credentials {
        let refresh_token = pair.refresh_token.clone().or_else(|| self.refresh_token());
        let credentials = Credentials::new(pair.access_token.clone(), refresh_token);
        self.save(&credentials);
        credentials
    }

    /// Clear stored tokens (logout)
    pub fn clear(&self) {
        info!("Clearing stored credentials");
        self.cache.delete(keys::AUTH_TOKENS);
    }

    pub fn is_logged_in(&self) -> bool {
        self.load().is_some()
    }
}

/// Listener slot shared between the client and the tracker facade
pub(crate) type SharedListener = Option<Arc<dyn SessionListener>>;
