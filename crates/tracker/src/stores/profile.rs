//! Study profile and assessment history

use log::info;
use serde_json::Value;
use std::sync::Arc;

use crate::context::{Context, Delivery};
use crate::models::{AssessmentHistory, AssessmentKind, AssessmentResult, StudyProfile};
use crate::remote::api::ProgressUpdate;
use crate::storage::keys;
use crate::sync::Mutation;

#[derive(Clone)]
pub struct ProfileStore {
    ctx: Arc<Context>,
}

impl ProfileStore {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// The profile, starting the plan today if this is the first use
    pub fn get(&self) -> StudyProfile {
        self.ctx.update_profile(|profile| profile.clone())
    }

    /// Day number within the 30-day plan
    pub fn current_day(&self) -> u32 {
        self.get().current_day(self.ctx.clock.today())
    }

    /// Count newly learned words and report them to the backend
    pub fn add_words_learned(&self, count: u32) -> (StudyProfile, Delivery) {
        let profile = self.ctx.update_profile(|profile| {
            profile.words_learned = profile.words_learned.saturating_add(count);
            profile.clone()
        });
        let delivery = self
            .ctx
            .submit(Mutation::ProgressUpdate(ProgressUpdate::words_learned(count)));
        (profile, delivery)
    }

    /// Store the result of an assessment checkpoint, replacing any earlier one
    pub fn save_assessment(&self, kind: AssessmentKind, result: Value) -> AssessmentResult {
        let saved = AssessmentResult {
            date: self.ctx.clock.today(),
            timestamp: self.ctx.clock.timestamp_millis(),
            result,
        };
        let stored = saved.clone();
        self.ctx
            .cache
            .update(keys::ASSESSMENT, AssessmentHistory::default(), |history| {
                history.set(kind, stored)
            });
        info!("Saved {:?} assessment", kind);
        saved
    }

    pub fn assessments(&self) -> AssessmentHistory {
        self.ctx.cache.read(keys::ASSESSMENT, AssessmentHistory::default())
    }
}
