//! Remote learning service integration
//!
//! This module provides:
//! - An authenticated request gateway with one-shot token refresh
//! - A pluggable HTTP transport (ureq in production, scripted in tests)
//! - Typed wrappers for the learning and account endpoints

mod account;
mod auth;
mod client;
mod learning;
#[cfg(any(test, feature = "test-support"))]
mod scripted;
mod transport;

pub use account::AuthApi;
pub use auth::{CredentialStore, Credentials, SessionListener};
pub use client::{CallOptions, RemoteClient};
pub use learning::LearningApi;
#[cfg(any(test, feature = "test-support"))]
pub use scripted::ScriptedTransport;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, UreqTransport};

/// Remote API request and response types
pub mod api {
    use chrono::NaiveDate;
    use serde::{Deserialize, Serialize};
    use serde_json::Value;
    use std::collections::HashMap;

    use crate::models::{Skill, Task};

    /// Response envelope wrapping every backend reply
    #[derive(Debug, Deserialize)]
    pub struct Envelope {
        pub code: i64,
        #[serde(default)]
        pub message: String,
        #[serde(default)]
        pub data: Option<Value>,
    }

    /// Access/refresh token pair issued by the auth endpoints
    #[derive(Debug, Clone, Deserialize)]
    pub struct TokenPair {
        pub access_token: String,
        pub refresh_token: Option<String>,
        #[serde(default)]
        pub expires_in: Option<u64>,
    }

    /// Body of `POST /auth/login`
    #[derive(Debug, Serialize)]
    pub struct LoginRequest<'a> {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub email: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub phone: Option<&'a str>,
        pub password: &'a str,
    }

    /// Body of `POST /auth/register`
    #[derive(Debug, Clone, Serialize)]
    pub struct RegisterRequest {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub email: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub phone: Option<String>,
        pub password: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub nickname: Option<String>,
    }

    /// Reply of login and register
    #[derive(Debug, Clone, Deserialize)]
    pub struct AuthResponse {
        #[serde(default)]
        pub user: Option<Value>,
        #[serde(default)]
        pub tokens: Option<TokenPair>,
    }

    /// Server-side progress snapshot (`GET/PUT /learning/progress`)
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct ProgressResponse {
        #[serde(default)]
        pub vocabulary: f64,
        #[serde(default)]
        pub listening: f64,
        #[serde(default)]
        pub reading: f64,
        #[serde(default)]
        pub writing: f64,
        #[serde(default)]
        pub speaking: f64,
        #[serde(default)]
        pub overall: f64,
        #[serde(default)]
        pub current_day: u32,
        #[serde(default)]
        pub start_date: Option<NaiveDate>,
        #[serde(default)]
        pub total_study_time: u32,
        #[serde(default)]
        pub words_learned: u32,
        #[serde(default)]
        pub streak_days: u32,
    }

    /// Partial progress update; unset fields are left untouched server-side
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct ProgressUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub vocabulary: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub listening: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub reading: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub writing: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub speaking: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub add_study_time: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub add_words_learned: Option<u32>,
    }

    impl ProgressUpdate {
        /// Update carrying a single skill value
        pub fn skill(skill: Skill, value: f64) -> Self {
            let mut update = Self::default();
            update.set_skill(skill, value);
            update
        }

        pub fn study_time(minutes: u32) -> Self {
            Self {
                add_study_time: Some(minutes),
                ..Self::default()
            }
        }

        pub fn words_learned(count: u32) -> Self {
            Self {
                add_words_learned: Some(count),
                ..Self::default()
            }
        }

        pub fn set_skill(&mut self, skill: Skill, value: f64) {
            let slot = match skill {
                Skill::Vocabulary => &mut self.vocabulary,
                Skill::Listening => &mut self.listening,
                Skill::Reading => &mut self.reading,
                Skill::Writing => &mut self.writing,
                Skill::Speaking => &mut self.speaking,
            };
            *slot = Some(value);
        }

        pub fn is_empty(&self) -> bool {
            *self == Self::default()
        }
    }

    /// Body of `POST /learning/checkin`
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct CheckinRequest {
        pub tasks: Vec<Task>,
        pub study_time: u32,
        #[serde(default)]
        pub note: String,
    }

    /// Reply of `POST /learning/checkin`
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct CheckinResponse {
        #[serde(default)]
        pub id: Option<i64>,
        pub checkin_date: NaiveDate,
        #[serde(default)]
        pub tasks: Vec<String>,
        #[serde(default)]
        pub study_time: u32,
        #[serde(default)]
        pub note: Option<String>,
        pub streak_days: u32,
    }

    /// One entry of `GET /learning/checkin/history`
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct HistoryRecord {
        #[serde(default)]
        pub id: Option<i64>,
        pub checkin_date: NaiveDate,
        #[serde(default)]
        pub tasks: Vec<String>,
        #[serde(default)]
        pub study_time: u32,
        #[serde(default)]
        pub note: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct CheckinHistory {
        #[serde(default)]
        pub records: Vec<HistoryRecord>,
        #[serde(default)]
        pub total_checkins: u32,
        #[serde(default)]
        pub current_streak: u32,
    }

    /// Reply of `GET /learning/today`
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct TodayStatus {
        pub date: NaiveDate,
        #[serde(default)]
        pub is_checked_in: bool,
        #[serde(default)]
        pub tasks: Vec<Value>,
        #[serde(default)]
        pub study_time: u32,
        #[serde(default)]
        pub can_checkin: bool,
    }

    /// Reply of `GET /learning/stats`
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct LearningStats {
        #[serde(default)]
        pub current_day: u32,
        #[serde(default)]
        pub total_days: u32,
        #[serde(default)]
        pub completion_rate: f64,
        #[serde(default)]
        pub total_study_time: u32,
        #[serde(default)]
        pub avg_daily_time: f64,
        #[serde(default)]
        pub words_learned: u32,
        #[serde(default)]
        pub words_total: u32,
        #[serde(default)]
        pub checkin_count: u32,
        #[serde(default)]
        pub current_streak: u32,
        #[serde(default)]
        pub longest_streak: u32,
        #[serde(default)]
        pub skill_progress: HashMap<String, f64>,
    }
}
