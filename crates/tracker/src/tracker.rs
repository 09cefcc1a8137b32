//! Top-level entry point for the UI layer

use anyhow::{Context as _, Result};
use log::{debug, info, warn};
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::context::Context;
use crate::models::SyncState;
use crate::remote::{
    AuthApi, CredentialStore, HttpTransport, LearningApi, RemoteClient, SessionListener, UreqTransport,
};
use crate::storage::{Cache, KeyValueCache, SqliteKvStore};
use crate::stores::{CheckinStore, ProfileStore, ProgressStore};
use crate::sync::{DrainReport, PendingMutation, SyncPolicy, cooldown_elapsed};

/// What [`Tracker::refresh_from_remote`] managed to pull
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshReport {
    /// Local writes were still queued, so nothing was pulled
    pub skipped: bool,
    pub progress: bool,
    pub history: bool,
}

/// Learning tracker bound to one cache namespace and one backend
pub struct Tracker {
    ctx: Arc<Context>,
    config: TrackerConfig,
    progress: ProgressStore,
    checkins: CheckinStore,
    profile: ProfileStore,
    auth: AuthApi,
}

impl Tracker {
    /// Open the on-disk cache and connect to the configured backend
    pub fn open(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        let path = config
            .database_path()
            .context("Could not determine data directory")?;
        config::ensure_parent_dir(&path)?;

        let backend = Arc::new(SqliteKvStore::open(&path)?);
        let transport = Arc::new(UreqTransport::new(config.request_timeout()));
        info!("Opened tracker cache at {}", path.display());

        Ok(Self::with_parts(backend, transport, Clock::system(), config))
    }

    /// Assemble a tracker from explicit parts
    pub fn with_parts(
        backend: Arc<dyn KeyValueCache>,
        transport: Arc<dyn HttpTransport>,
        clock: Clock,
        config: TrackerConfig,
    ) -> Self {
        let cache = Cache::new(backend, config.namespace.clone());
        let client = Arc::new(RemoteClient::new(
            config.api_base_url.clone(),
            transport,
            CredentialStore::new(cache.clone()),
        ));
        let policy = SyncPolicy {
            max_attempts: config.max_sync_attempts,
        };
        let ctx = Arc::new(Context::new(cache, clock, client.clone(), policy));

        Self {
            progress: ProgressStore::new(ctx.clone()),
            checkins: CheckinStore::new(ctx.clone()),
            profile: ProfileStore::new(ctx.clone()),
            auth: AuthApi::new(client),
            ctx,
            config,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn checkins(&self) -> &CheckinStore {
        &self.checkins
    }

    pub fn profile(&self) -> &ProfileStore {
        &self.profile
    }

    pub fn auth(&self) -> &AuthApi {
        &self.auth
    }

    /// Read-only learning endpoints (today status, stats)
    pub fn learning(&self) -> &LearningApi {
        &self.ctx.learning
    }

    pub fn clock(&self) -> &Clock {
        &self.ctx.clock
    }

    /// Register the receiver of session-expired notifications
    pub fn set_session_listener(&self, listener: Option<Arc<dyn SessionListener>>) {
        self.ctx.client.set_session_listener(listener);
    }

    /// Drain the sync queue now
    pub fn sync_now(&self) -> DrainReport {
        self.ctx.drain()
    }

    /// Drain the sync queue unless it is empty or drained too recently
    pub fn sync_if_due(&self) -> Option<DrainReport> {
        if self.ctx.queue.is_empty() {
            return None;
        }
        let state = self.ctx.sync_state();
        let now = self.ctx.clock.now_utc();
        if !cooldown_elapsed(state.last_attempt_at, now, self.config.sync_cooldown_secs) {
            debug!("Sync skipped, still in cooldown");
            return None;
        }
        Some(self.ctx.drain())
    }

    pub fn sync_state(&self) -> SyncState {
        self.ctx.sync_state()
    }

    pub fn pending_mutations(&self) -> Vec<PendingMutation> {
        self.ctx.queue.pending()
    }

    pub fn dead_letters(&self) -> Vec<PendingMutation> {
        self.ctx.queue.dead_letters()
    }

    /// Pull progress and check-in history from the backend
    ///
    /// Queued local writes are delivered first. If any remain, nothing is
    /// pulled so the server copy cannot overwrite them.
    pub fn refresh_from_remote(&self) -> RefreshReport {
        self.ctx.drain();
        if !self.ctx.queue.is_empty() {
            info!("Skipping remote refresh, {} writes pending", self.ctx.queue.len());
            return RefreshReport {
                skipped: true,
                ..RefreshReport::default()
            };
        }

        let progress = self.progress.refresh_from_remote().is_some();
        let history = match self.checkins.refresh_history(None, None) {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to refresh check-in history: {}", e);
                false
            }
        };
        RefreshReport {
            skipped: false,
            progress,
            history,
        }
    }

    /// Erase every locally stored record, credentials included
    pub fn reset(&self) {
        self.ctx.cache.clear_namespace();
        info!("Cleared local data in namespace {}", self.ctx.cache.namespace());
    }
}
