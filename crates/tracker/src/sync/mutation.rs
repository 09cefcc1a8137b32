//! Mutations awaiting delivery

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::remote::api::{CheckinRequest, ProgressUpdate};

/// A state change to replay against the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum Mutation {
    /// Partial progress update (`PUT /learning/progress`)
    ProgressUpdate(ProgressUpdate),
    /// Daily check-in (`POST /learning/checkin`)
    Checkin(CheckinRequest),
}

impl Mutation {
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::ProgressUpdate(_) => "progress-update",
            Mutation::Checkin(_) => "checkin",
        }
    }
}

/// Queue entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMutation {
    /// Monotonic per-namespace id
    pub id: u64,
    pub mutation: Mutation,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// Delivers a mutation to the backend
pub trait MutationHandler {
    fn apply(&self, mutation: &Mutation) -> Result<(), ApiError>;
}

impl<F> MutationHandler for F
where
    F: Fn(&Mutation) -> Result<(), ApiError>,
{
    fn apply(&self, mutation: &Mutation) -> Result<(), ApiError> {
        self(mutation)
    }
}
