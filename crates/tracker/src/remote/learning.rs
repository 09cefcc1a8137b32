//! Learning endpoints (`/learning/*`)

use chrono::NaiveDate;
use log::debug;
use std::sync::Arc;

use super::api::{
    CheckinHistory, CheckinRequest, CheckinResponse, LearningStats, ProgressResponse, ProgressUpdate,
    TodayStatus,
};
use super::client::{CallOptions, RemoteClient};
use crate::error::ApiError;

/// Typed wrapper over the learning API
#[derive(Clone)]
pub struct LearningApi {
    client: Arc<RemoteClient>,
}

impl LearningApi {
    pub fn new(client: Arc<RemoteClient>) -> Self {
        Self { client }
    }

    /// Fetch the server-side progress snapshot
    pub fn get_progress(&self) -> Result<ProgressResponse, ApiError> {
        self.client.get("/learning/progress")
    }

    /// Send a partial progress update
    pub fn update_progress(&self, update: &ProgressUpdate) -> Result<ProgressResponse, ApiError> {
        debug!("Pushing progress update: {:?}", update);
        self.client.put("/learning/progress", update)
    }

    /// Submit today's check-in
    ///
    /// Returns `None` when the server accepts the check-in without echoing a
    /// record.
    pub fn checkin(&self, request: &CheckinRequest) -> Result<Option<CheckinResponse>, ApiError> {
        self.client
            .post("/learning/checkin", request, CallOptions::default())
    }

    /// Fetch check-in history, optionally bounded by date
    pub fn checkin_history(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<CheckinHistory, ApiError> {
        let path = history_path(start, end);
        self.client.get(&path)
    }

    pub fn today_status(&self) -> Result<TodayStatus, ApiError> {
        self.client.get("/learning/today")
    }

    pub fn stats(&self) -> Result<LearningStats, ApiError> {
        self.client.get("/learning/stats")
    }
}

fn history_path(start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
    let params: Vec<String> = [("start_date", start), ("end_date", end)]
        .into_iter()
        .filter_map(|(name, date)| {
            date.map(|d| format!("{}={}", name, urlencoding::encode(&d.format("%Y-%m-%d").to_string())))
        })
        .collect();

    if params.is_empty() {
        "/learning/checkin/history".to_string()
    } else {
        format!("/learning/checkin/history?{}", params.join("&"))
    }
}
