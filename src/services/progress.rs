// src/services/progress.rs

use std::sync::Arc;

use crate::{
    models::{
        answers::AnswerMap,
        progress::{CandidateProgress, ProgressSnapshot},
    },
    repository::{ProgressRepository, StorageError},
    utils::time::Clock,
};

/// Result of one autosave tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The store failed; the client keeps going and retries on the next tick.
    NotSaved,
    /// The stored record has no time left, so its answers are frozen.
    Expired,
}

/// Tracks each candidate's in-flight session: position, remaining time and
/// partial answers, so a candidate can resume after a disconnect.
///
/// Remaining time is authoritative on the server: every read subtracts the
/// wall-clock time elapsed since the last save.
#[derive(Clone)]
pub struct ProgressTracker {
    repo: Arc<dyn ProgressRepository>,
    clock: Clock,
    duration_secs: u32,
}

impl ProgressTracker {
    pub fn new(repo: Arc<dyn ProgressRepository>, clock: Clock, duration_secs: u32) -> Self {
        Self {
            repo,
            clock,
            duration_secs,
        }
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Creates a fresh record with the full duration unless one already exists.
    /// Returns true when a record was created.
    pub async fn start(&self, identity: &str) -> Result<bool, StorageError> {
        let progress = CandidateProgress::started(identity, self.duration_secs, self.clock.now());
        self.repo.insert_if_absent(&progress).await
    }

    /// Best-effort autosave. Storage failures are logged and reported as
    /// `SaveOutcome::NotSaved`, never raised.
    ///
    /// The stored time is clamped to the configured duration and to what the
    /// server computes for the existing record, so a client cannot buy extra time
    /// by reporting a larger `time_remaining`. Once the existing record has run
    /// out of time its answers are final and the save is refused.
    pub async fn save_progress(
        &self,
        identity: &str,
        current_question_index: u32,
        time_remaining: u32,
        answers: AnswerMap,
    ) -> SaveOutcome {
        let now = self.clock.now();

        let ceiling = match self.repo.get(identity).await {
            Ok(Some(existing)) => match existing.remaining_at(now) {
                0 => {
                    tracing::info!(identity, "Autosave after time ran out, answers kept");
                    return SaveOutcome::Expired;
                }
                remaining => remaining,
            },
            Ok(None) => self.duration_secs,
            Err(e) => {
                tracing::warn!(identity, "Could not read progress before autosave: {}", e);
                self.duration_secs
            }
        };

        let progress = CandidateProgress {
            email: identity.to_string(),
            current_question_index,
            time_remaining: time_remaining.min(ceiling),
            answers,
            start_time: now,
            last_updated: now,
        };

        match self.repo.upsert(&progress).await {
            Ok(()) => SaveOutcome::Saved,
            Err(e) => {
                tracing::warn!(identity, "Autosave failed, continuing: {}", e);
                SaveOutcome::NotSaved
            }
        }
    }

    /// Current state for `identity`, with time remaining recomputed as of now.
    /// A missing record is not an error: it yields `has_progress = false` and defaults.
    pub async fn load_progress(&self, identity: &str) -> Result<ProgressSnapshot, StorageError> {
        let snapshot = match self.repo.get(identity).await? {
            Some(progress) => ProgressSnapshot {
                has_progress: true,
                current_question_index: progress.current_question_index,
                time_remaining: progress.remaining_at(self.clock.now()),
                answers: progress.answers,
            },
            None => ProgressSnapshot::empty(self.duration_secs),
        };
        Ok(snapshot)
    }

    /// Deletes the record. Idempotent.
    pub async fn clear_progress(&self, identity: &str) -> Result<(), StorageError> {
        if !self.repo.delete(identity).await? {
            tracing::debug!(identity, "No progress to clear");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use crate::utils::time::fixed_now;
    use chrono::Duration;

    fn tracker(repo: &InMemoryRepository, clock: Clock) -> ProgressTracker {
        ProgressTracker::new(Arc::new(repo.clone()), clock, 1800)
    }

    fn answers(entries: &[(i64, &str)]) -> AnswerMap {
        entries.iter().map(|(id, a)| (*id, a.to_string())).collect()
    }

    #[tokio::test]
    async fn missing_record_returns_defaults() {
        let repo = InMemoryRepository::new();
        let snapshot = tracker(&repo, Clock::fixed(fixed_now()))
            .load_progress("a@x.io")
            .await
            .unwrap();

        assert_eq!(snapshot, ProgressSnapshot::empty(1800));
    }

    #[tokio::test]
    async fn resume_subtracts_elapsed_time() {
        let repo = InMemoryRepository::new();
        let mut clock = Clock::fixed(fixed_now());
        assert_eq!(
            tracker(&repo, clock)
                .save_progress("a@x.io", 3, 600, answers(&[(1, "A")]))
                .await,
            SaveOutcome::Saved
        );

        clock.advance(Duration::seconds(50));
        let after_50 = tracker(&repo, clock).load_progress("a@x.io").await.unwrap();
        assert!(after_50.has_progress);
        assert_eq!(after_50.time_remaining, 550);
        assert_eq!(after_50.current_question_index, 3);
        assert_eq!(after_50.answers, answers(&[(1, "A")]));

        clock.advance(Duration::seconds(650));
        let after_700 = tracker(&repo, clock).load_progress("a@x.io").await.unwrap();
        assert_eq!(after_700.time_remaining, 0);
    }

    #[tokio::test]
    async fn client_cannot_extend_its_clock() {
        let repo = InMemoryRepository::new();
        let mut clock = Clock::fixed(fixed_now());
        tracker(&repo, clock)
            .save_progress("a@x.io", 0, 600, AnswerMap::new())
            .await;

        // 100s later the client claims it still has 5000s left.
        clock.advance(Duration::seconds(100));
        tracker(&repo, clock)
            .save_progress("a@x.io", 1, 5000, AnswerMap::new())
            .await;

        let snapshot = tracker(&repo, clock).load_progress("a@x.io").await.unwrap();
        assert_eq!(snapshot.time_remaining, 500);
    }

    #[tokio::test]
    async fn first_save_is_capped_at_duration() {
        let repo = InMemoryRepository::new();
        let t = tracker(&repo, Clock::fixed(fixed_now()));
        t.save_progress("a@x.io", 0, 99_999, AnswerMap::new()).await;

        let snapshot = t.load_progress("a@x.io").await.unwrap();
        assert_eq!(snapshot.time_remaining, 1800);
    }

    #[tokio::test]
    async fn expired_record_keeps_its_answers() {
        let repo = InMemoryRepository::new();
        let mut clock = Clock::fixed(fixed_now());
        tracker(&repo, clock)
            .save_progress("a@x.io", 2, 60, answers(&[(1, "B")]))
            .await;

        clock.advance(Duration::seconds(61));
        let outcome = tracker(&repo, clock)
            .save_progress("a@x.io", 3, 0, answers(&[(1, "A"), (2, "B")]))
            .await;
        assert_eq!(outcome, SaveOutcome::Expired);

        let snapshot = tracker(&repo, clock).load_progress("a@x.io").await.unwrap();
        assert_eq!(snapshot.time_remaining, 0);
        assert_eq!(snapshot.current_question_index, 2);
        assert_eq!(snapshot.answers, answers(&[(1, "B")]));
    }

    #[tokio::test]
    async fn saving_zero_time_is_accepted_once() {
        let repo = InMemoryRepository::new();
        let t = tracker(&repo, Clock::fixed(fixed_now()));
        assert!(t.start("a@x.io").await.unwrap());

        assert_eq!(
            t.save_progress("a@x.io", 1, 0, answers(&[(1, "B")])).await,
            SaveOutcome::Saved
        );
        assert_eq!(
            t.save_progress("a@x.io", 1, 0, answers(&[(1, "A")])).await,
            SaveOutcome::Expired
        );
        assert_eq!(
            t.load_progress("a@x.io").await.unwrap().answers,
            answers(&[(1, "B")])
        );
    }

    #[tokio::test]
    async fn save_failure_is_swallowed() {
        let repo = InMemoryRepository::new();
        repo.set_offline(true);

        let outcome = tracker(&repo, Clock::fixed(fixed_now()))
            .save_progress("a@x.io", 0, 100, AnswerMap::new())
            .await;
        assert_eq!(outcome, SaveOutcome::NotSaved);
    }

    #[tokio::test]
    async fn start_does_not_reset_existing_progress() {
        let repo = InMemoryRepository::new();
        let t = tracker(&repo, Clock::fixed(fixed_now()));
        assert!(t.start("a@x.io").await.unwrap());

        t.save_progress("a@x.io", 7, 300, AnswerMap::new()).await;
        assert!(!t.start("a@x.io").await.unwrap());

        let snapshot = t.load_progress("a@x.io").await.unwrap();
        assert_eq!(snapshot.current_question_index, 7);
        assert_eq!(snapshot.time_remaining, 300);
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let repo = InMemoryRepository::new();
        let t = tracker(&repo, Clock::fixed(fixed_now()));
        t.start("a@x.io").await.unwrap();

        t.clear_progress("a@x.io").await.unwrap();
        t.clear_progress("a@x.io").await.unwrap();

        assert!(!t.load_progress("a@x.io").await.unwrap().has_progress);
    }
}
