// src/services/marking.rs

//! Automatic marking. Pure functions only: no I/O, no clock, no randomness.

use crate::models::{answers::NormalizedAnswers, question::Question, result::SubmissionSummary};

/// How a single question was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Wrong,
    Skipped,
}

/// Classifies one submitted value against its key entry.
///
/// Missing, null and blank values are skipped. Otherwise the trimmed value must
/// equal `correct_answer` exactly (case-sensitive).
pub fn classify(question: &Question, submitted: Option<&str>) -> Verdict {
    match submitted.map(str::trim) {
        None | Some("") => Verdict::Skipped,
        Some(answer) if answer == question.correct_answer => Verdict::Correct,
        Some(_) => Verdict::Wrong,
    }
}

/// Scores a submission against the answer key.
///
/// Iterates the key in its given order; ids in `submitted` that are not in the
/// key are ignored, and key questions absent from `submitted` count as skipped.
pub fn score(answer_key: &[Question], submitted: &NormalizedAnswers) -> SubmissionSummary {
    let mut correct_count = 0;
    let mut wrong_count = 0;
    let mut skipped_count = 0;

    for question in answer_key {
        let answer = submitted.get(&question.id).and_then(|a| a.as_deref());
        match classify(question, answer) {
            Verdict::Correct => correct_count += 1,
            Verdict::Wrong => wrong_count += 1,
            Verdict::Skipped => skipped_count += 1,
        }
    }

    let total = u32::try_from(answer_key.len()).unwrap_or(u32::MAX);

    SubmissionSummary {
        score: percentage(correct_count, total),
        correct_count,
        wrong_count,
        skipped_count,
    }
}

/// `round(correct / total * 100)` with halves rounded up; 0 for an empty key.
pub fn percentage(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct);
    let total = u64::from(total);
    // Integer form of floor(x + 0.5) for non-negative x.
    ((correct * 200 + total) / (total * 2)) as u32
}
