// src/models/answers.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Partial answers keyed by question id. Ordered so persisted JSON is stable.
pub type AnswerMap = BTreeMap<i64, String>;

/// Answers normalized against the full answer key: every key question has an entry,
/// `None` where the candidate never answered.
pub type NormalizedAnswers = BTreeMap<i64, Option<String>>;

/// Answer map exactly as a client sends it.
///
/// JSON object keys are always strings, and values are either a selected option
/// or `null`. Any other shape (arrays, numbers, nested objects) fails to
/// deserialize and is rejected before it reaches the marking engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawAnswers(pub BTreeMap<String, Option<String>>);

impl RawAnswers {
    /// Entries whose key is an integer question id, with `None` kept for explicit nulls.
    /// Keys that are not integers can never match a question and are dropped.
    pub fn by_question_id(&self) -> NormalizedAnswers {
        self.0
            .iter()
            .filter_map(|(key, value)| key.trim().parse::<i64>().ok().map(|id| (id, value.clone())))
            .collect()
    }

    /// Only the non-blank selections, as stored in autosaved progress.
    pub fn selections(&self) -> AnswerMap {
        self.by_question_id()
            .into_iter()
            .filter_map(|(id, value)| match value {
                Some(v) if !v.trim().is_empty() => Some((id, v)),
                _ => None,
            })
            .collect()
    }
}

impl From<&AnswerMap> for RawAnswers {
    fn from(answers: &AnswerMap) -> Self {
        RawAnswers(
            answers
                .iter()
                .map(|(id, value)| (id.to_string(), Some(value.clone())))
                .collect(),
        )
    }
}
