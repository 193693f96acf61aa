// src/models/progress.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{
    answers::{AnswerMap, RawAnswers},
    result::SubmissionSummary,
};

/// A candidate's resumable in-flight session state.
/// At most one record exists per candidate email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProgress {
    pub email: String,
    pub current_question_index: u32,
    /// Seconds left as of `last_updated`.
    pub time_remaining: u32,
    pub answers: AnswerMap,
    pub start_time: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl CandidateProgress {
    /// Fresh progress for a candidate who has not started yet.
    pub fn started(email: &str, duration_secs: u32, now: DateTime<Utc>) -> Self {
        CandidateProgress {
            email: email.to_string(),
            current_question_index: 0,
            time_remaining: duration_secs,
            answers: AnswerMap::new(),
            start_time: now,
            last_updated: now,
        }
    }

    /// Stored time minus wall-clock time elapsed since the last save, floored at 0.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> u32 {
        let elapsed = (now - self.last_updated).num_seconds().max(0);
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.time_remaining.saturating_sub(elapsed)
    }
}

/// DTO for the autosave call.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressRequest {
    #[validate(range(max = 10_000))]
    pub current_question_index: u32,
    pub time_remaining: u32,
    #[serde(default)]
    pub answers: RawAnswers,
}

/// What a candidate sees when resuming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub has_progress: bool,
    pub current_question_index: u32,
    pub time_remaining: u32,
    pub answers: AnswerMap,
}

impl ProgressSnapshot {
    pub fn empty(duration_secs: u32) -> Self {
        ProgressSnapshot {
            has_progress: false,
            current_question_index: 0,
            time_remaining: duration_secs,
            answers: AnswerMap::new(),
        }
    }
}

/// Response for `GET /api/user-progress`.
/// `result` is only present when the timer had run out and the saved answers were submitted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgressResponse {
    #[serde(flatten)]
    pub progress: ProgressSnapshot,
    pub auto_submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SubmissionSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn remaining_time_subtracts_elapsed_seconds() {
        let t = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let mut progress = CandidateProgress::started("a@b.c", 1800, t);
        progress.time_remaining = 600;

        assert_eq!(progress.remaining_at(t + Duration::seconds(50)), 550);
        assert_eq!(progress.remaining_at(t + Duration::seconds(700)), 0);
    }

    #[test]
    fn remaining_time_ignores_clock_going_backwards() {
        let t = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let progress = CandidateProgress::started("a@b.c", 300, t);

        assert_eq!(progress.remaining_at(t - Duration::seconds(30)), 300);
    }

    #[test]
    fn partial_seconds_are_not_charged() {
        let t = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let progress = CandidateProgress::started("a@b.c", 300, t);

        assert_eq!(progress.remaining_at(t + Duration::milliseconds(1999)), 299);
    }
}
