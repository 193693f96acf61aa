// src/services/finalizer.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

use crate::{
    error::AppError,
    models::{
        answers::{AnswerMap, NormalizedAnswers, RawAnswers},
        question::Question,
        result::{ResponseEntry, ResultRecord, SubmissionSummary},
        user::CandidateSummary,
    },
    repository::Storage,
    services::{
        marking,
        notifier::ResultNotifier,
        progress::{ProgressTracker, SaveOutcome},
    },
    utils::time::Clock,
};

/// Per-identity submit locks, so a double-clicked submit is processed one at a time.
#[derive(Clone, Default)]
pub struct SubmitLocks {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl SubmitLocks {
    pub async fn acquire(&self, identity: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop locks nobody holds or waits on.
            map.retain(|_, l| Arc::strong_count(l) > 1);
            map.entry(identity.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Gives every key question an entry, `None` where the candidate gave nothing.
pub fn normalize(answer_key: &[Question], raw: &RawAnswers) -> NormalizedAnswers {
    let submitted = raw.by_question_id();
    answer_key
        .iter()
        .map(|q| (q.id, submitted.get(&q.id).cloned().flatten()))
        .collect()
}

/// Turns a candidate's final answers into a persisted result.
///
/// `IN_PROGRESS -> SUBMITTING -> COMPLETED`: the per-identity lock marks
/// SUBMITTING, and the attempt is COMPLETED once the result is stored, the
/// candidate summary updated and the progress record cleared.
#[derive(Clone)]
pub struct SessionFinalizer {
    storage: Storage,
    tracker: ProgressTracker,
    notifier: Arc<dyn ResultNotifier>,
    locks: SubmitLocks,
    clock: Clock,
}

impl SessionFinalizer {
    pub fn new(
        storage: Storage,
        tracker: ProgressTracker,
        notifier: Arc<dyn ResultNotifier>,
        locks: SubmitLocks,
        clock: Clock,
    ) -> Self {
        Self {
            storage,
            tracker,
            notifier,
            locks,
            clock,
        }
    }

    /// Autosaves progress under the same per-identity lock as `submit`, so a
    /// save can never land after the submission that closed the attempt.
    ///
    /// Returns whether the tick was persisted. Storage failures during the save
    /// itself are swallowed by the tracker.
    ///
    /// # Errors
    ///
    /// `Conflict` once the candidate has submitted, or once the saved session
    /// has run out of time and its answers are final.
    pub async fn autosave(
        &self,
        identity: &str,
        current_question_index: u32,
        time_remaining: u32,
        answers: AnswerMap,
    ) -> Result<bool, AppError> {
        let _guard = self.locks.acquire(identity).await;

        match self.storage.candidates.get(identity).await {
            Ok(Some(candidate)) if candidate.test_submitted => {
                return Err(AppError::Conflict(
                    "Assessment already submitted".to_string(),
                ));
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(
                identity,
                "Could not check submission state before autosave: {}",
                e
            ),
        }

        match self
            .tracker
            .save_progress(identity, current_question_index, time_remaining, answers)
            .await
        {
            SaveOutcome::Saved => Ok(true),
            SaveOutcome::NotSaved => Ok(false),
            SaveOutcome::Expired => Err(AppError::Conflict(
                "Time is up, saved answers are final".to_string(),
            )),
        }
    }

    /// Scores and records a submission for `identity`.
    ///
    /// If the saved session has already run out of time, the last saved answers
    /// are marked instead of `raw`. Resubmitting overwrites the previous result.
    /// If a stored result already matches the answers (a retry after a partial
    /// failure), its counts are reused rather than marking again.
    ///
    /// # Errors
    ///
    /// `Configuration` if the answer key is empty, `ServiceUnavailable` if the
    /// store cannot be reached. Nothing is written unless the key was loaded.
    pub async fn submit(
        &self,
        identity: &str,
        applicant_name: &str,
        raw: &RawAnswers,
    ) -> Result<SubmissionSummary, AppError> {
        let _guard = self.locks.acquire(identity).await;

        let snapshot = self.tracker.load_progress(identity).await.map_err(|e| {
            tracing::error!(identity, "Progress unavailable for submit: {}", e);
            AppError::from(e)
        })?;
        let saved;
        let raw = if snapshot.has_progress && snapshot.time_remaining == 0 {
            tracing::info!(identity, "Time ran out, marking the last saved answers");
            saved = RawAnswers::from(&snapshot.answers);
            &saved
        } else {
            raw
        };

        let answer_key = self.storage.questions.answer_key().await.map_err(|e| {
            tracing::error!("Answer key unavailable for submit: {}", e);
            AppError::ServiceUnavailable(e.to_string())
        })?;
        if answer_key.is_empty() {
            return Err(AppError::Configuration(
                "answer key is empty, cannot mark submission".to_string(),
            ));
        }

        let answers = normalize(&answer_key, raw);
        let now = self.clock.now();

        let record = match self.storage.results.get(identity).await? {
            Some(existing) if existing.completed && existing.matches_answers(&answers) => {
                tracing::info!(identity, "Replaying stored result for repeated submission");
                existing
            }
            _ => {
                let summary = marking::score(&answer_key, &answers);
                let record = ResultRecord {
                    email: identity.to_string(),
                    applicant_name: applicant_name.to_string(),
                    responses: answers
                        .iter()
                        .map(|(id, answer)| ResponseEntry {
                            question_id: *id,
                            answer: answer.clone(),
                            timestamp: now,
                        })
                        .collect(),
                    overall_score: summary.score,
                    correct_count: summary.correct_count,
                    wrong_count: summary.wrong_count,
                    skipped_count: summary.skipped_count,
                    completed: true,
                    assessment_date: now,
                };
                self.storage.results.upsert(&record).await.map_err(|e| {
                    tracing::error!(identity, "Failed to store result record: {}", e);
                    AppError::from(e)
                })?;
                record
            }
        };

        let summary = record.summary();

        let candidate_summary = CandidateSummary {
            overall_score: summary.score,
            correct_count: summary.correct_count,
            wrong_count: summary.wrong_count,
            skipped_count: summary.skipped_count,
            submitted_at: now,
        };
        let updated = self
            .storage
            .candidates
            .apply_summary(identity, &candidate_summary)
            .await
            .map_err(|e| {
                tracing::error!(identity, "Failed to update candidate summary: {}", e);
                AppError::from(e)
            })?;
        if !updated {
            tracing::warn!(identity, "No candidate record to update with the summary");
        }

        self.tracker.clear_progress(identity).await.map_err(|e| {
            tracing::error!(identity, "Failed to clear progress after submit: {}", e);
            AppError::from(e)
        })?;

        tracing::info!(
            identity,
            score = summary.score,
            correct = summary.correct_count,
            wrong = summary.wrong_count,
            skipped = summary.skipped_count,
            "Assessment submitted"
        );

        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.result_finalized(&record).await {
                tracing::warn!("Result notification failed: {}", e);
            }
        });

        Ok(summary)
    }
}
