//! Skill progress: local record plus remote mirroring

use log::{info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::context::{Context, Delivery};
use crate::models::{Skill, SkillProgress, StudyProfile, Task};
use crate::remote::api::ProgressUpdate;
use crate::storage::keys;
use crate::sync::Mutation;

use super::ProfileStore;

/// Gain for a task that trains one skill
const TASK_REWARD: f64 = 1.0;
/// Gain for every skill when the daily test is completed
const TEST_REWARD: f64 = 0.5;

#[derive(Clone)]
pub struct ProgressStore {
    ctx: Arc<Context>,
}

impl ProgressStore {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Locally cached progress; all zeros if nothing is stored
    pub fn get_local(&self) -> SkillProgress {
        self.ctx.cache.read(keys::PROGRESS, SkillProgress::default())
    }

    /// Replace the local record with the backend's copy
    ///
    /// Returns `None` and leaves the local record untouched on failure.
    pub fn refresh_from_remote(&self) -> Option<SkillProgress> {
        match self.ctx.learning.get_progress() {
            Ok(remote) => {
                let progress = SkillProgress::new(
                    remote.vocabulary,
                    remote.listening,
                    remote.reading,
                    remote.writing,
                    remote.speaking,
                );
                self.ctx.cache.write(keys::PROGRESS, &progress);
                Some(progress)
            }
            Err(e) => {
                warn!("Failed to refresh progress: {}", e);
                None
            }
        }
    }

    /// Set one skill value
    ///
    /// The value is clamped to `[0, 100]` and `overall` recomputed before the
    /// record is persisted. Only the changed skill is sent upstream.
    pub fn set_skill(&self, skill: Skill, value: f64) -> (SkillProgress, Delivery) {
        let progress = self
            .ctx
            .cache
            .update(keys::PROGRESS, SkillProgress::default(), |progress| {
                progress.set(skill, value);
                progress.clone()
            });

        let update = ProgressUpdate::skill(skill, progress.get(skill));
        let delivery = self.ctx.submit(Mutation::ProgressUpdate(update));
        (progress, delivery)
    }

    /// Credit the skills trained by a day's completed tasks
    ///
    /// Each skill task adds 1 to its skill; the test adds 0.5 to every skill.
    /// Values saturate at 100. Returns `None` for the delivery when nothing
    /// changed.
    pub fn apply_task_rewards(&self, tasks: &BTreeSet<Task>) -> (SkillProgress, Option<Delivery>) {
        let (progress, update) = self
            .ctx
            .cache
            .update(keys::PROGRESS, SkillProgress::default(), |progress| {
                let before = progress.clone();
                for task in tasks {
                    match task.skill() {
                        Some(skill) => progress.set(skill, progress.get(skill) + TASK_REWARD),
                        None => {
                            for skill in Skill::ALL {
                                progress.set(skill, progress.get(skill) + TEST_REWARD);
                            }
                        }
                    }
                }

                let mut update = ProgressUpdate::default();
                for skill in Skill::ALL {
                    if progress.get(skill) != before.get(skill) {
                        update.set_skill(skill, progress.get(skill));
                    }
                }
                (progress.clone(), update)
            });

        if update.is_empty() {
            return (progress, None);
        }
        info!("Task rewards raised overall progress to {}", progress.overall());
        let delivery = self.ctx.submit(Mutation::ProgressUpdate(update));
        (progress, Some(delivery))
    }

    /// Count newly learned words
    pub fn add_words_learned(&self, count: u32) -> (StudyProfile, Delivery) {
        ProfileStore::new(self.ctx.clone()).add_words_learned(count)
    }
}
