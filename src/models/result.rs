// src/models/result.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::answers::{NormalizedAnswers, RawAnswers};

/// One recorded answer inside a result record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEntry {
    pub question_id: i64,
    /// `None` when the question was never answered.
    pub answer: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Persisted outcome of a finalized submission.
/// Keyed by candidate email; a resubmission overwrites the previous record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub email: String,
    pub applicant_name: String,
    /// Ordered by question id.
    pub responses: Vec<ResponseEntry>,
    /// Percentage, 0-100.
    pub overall_score: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub skipped_count: u32,
    pub completed: bool,
    pub assessment_date: DateTime<Utc>,
}

impl ResultRecord {
    /// Whether this record was produced from exactly these normalized answers.
    pub fn matches_answers(&self, answers: &NormalizedAnswers) -> bool {
        self.responses.len() == answers.len()
            && self
                .responses
                .iter()
                .zip(answers.iter())
                .all(|(entry, (id, answer))| entry.question_id == *id && &entry.answer == answer)
    }

    pub fn summary(&self) -> SubmissionSummary {
        SubmissionSummary {
            score: self.overall_score,
            correct_count: self.correct_count,
            wrong_count: self.wrong_count,
            skipped_count: self.skipped_count,
        }
    }
}

/// Marking outcome as returned to the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub score: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub skipped_count: u32,
}

/// DTO for submitting an assessment.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Key: question id (as JSON object key). Value: selected option, or null.
    pub answers: RawAnswers,
}

/// DTO returned by the submit endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub message: String,
    #[serde(flatten)]
    pub summary: SubmissionSummary,
}
