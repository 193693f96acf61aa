// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A test-taking candidate, identified by email.
/// Carries the denormalized score summary shown in the admin view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub email: String,
    pub name: String,

    /// Always 'user' for candidates.
    pub role: String,

    pub last_login: DateTime<Utc>,
    pub overall_score: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub skipped_count: u32,

    /// Flips to true on the first successful submission and never back.
    pub test_submitted: bool,
}

impl Candidate {
    pub fn new(email: &str, name: &str, now: DateTime<Utc>) -> Self {
        Candidate {
            email: email.to_string(),
            name: name.to_string(),
            role: "user".to_string(),
            last_login: now,
            overall_score: 0,
            correct_count: 0,
            wrong_count: 0,
            skipped_count: 0,
            test_submitted: false,
        }
    }
}

/// Score fields written onto the candidate record at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateSummary {
    pub overall_score: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub skipped_count: u32,
    pub submitted_at: DateTime<Utc>,
}

/// DTO for candidate login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required."))]
    pub name: String,
    #[validate(email(message = "A valid email is required."))]
    pub email: String,
}
