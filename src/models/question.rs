// src/models/question.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::html::clean_html;

/// One entry of the authoritative answer key.
/// Loaded once from a trusted source and never mutated by the assessment core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Stable integer key, also the key used in candidate answer maps.
    pub id: i64,

    /// The text content of the question.
    pub text: String,

    /// Ordered list of options (e.g., ["Option A", "Option B"]).
    pub options: Vec<String>,

    pub category: String,

    /// The option text that is marked correct.
    pub correct_answer: String,

    /// Stored for reporting; marking uses plain accuracy.
    pub weight: i32,

    pub explanation: Option<String>,
}

/// DTO for sending a question to the candidate (excludes the answer key).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
    pub category: String,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id,
            text: q.text.clone(),
            options: q.options.clone(),
            category: q.category.clone(),
        }
    }
}

/// Question ids appear both as numbers and as numeric strings in seed files.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SeedId {
    Number(i64),
    Text(String),
}

impl SeedId {
    fn resolve(&self) -> Option<i64> {
        match self {
            SeedId::Number(n) => Some(*n),
            SeedId::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Raw question shape accepted from seed files.
/// Covers both the `question`/`answer` layout and the `text`/`correctAnswer` layout.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuestionSeed {
    pub id: SeedId,

    #[serde(alias = "question")]
    #[validate(length(min = 1, max = 2000))]
    pub text: String,

    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(rename = "correctAnswer", alias = "answer")]
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: String,

    #[serde(default = "default_weight")]
    pub weight: i32,

    #[serde(default)]
    #[validate(length(max = 4000))]
    pub explanation: Option<String>,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_weight() -> i32 {
    1
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

impl QuestionSeed {
    /// Validates the raw entry and normalizes it into a `Question`.
    ///
    /// Text and explanation are sanitized since clients render them as HTML.
    /// Options and the correct answer are kept verbatim so marking is unaffected.
    pub fn into_question(self) -> Result<Question, String> {
        self.validate().map_err(|e| e.to_string())?;

        let id = self
            .id
            .resolve()
            .ok_or_else(|| format!("question id {:?} is not an integer", self.id))?;

        if !self.options.iter().any(|o| o == &self.correct_answer) {
            tracing::warn!(
                question_id = id,
                "Correct answer does not match any listed option"
            );
        }

        Ok(Question {
            id,
            text: clean_html(&self.text),
            options: self.options,
            category: self.category,
            correct_answer: self.correct_answer,
            weight: self.weight,
            explanation: self.explanation.as_deref().map(clean_html),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_legacy_question_layout() {
        let seed: QuestionSeed = serde_json::from_value(serde_json::json!({
            "id": 3,
            "question": "Pick B",
            "options": ["A", "B"],
            "answer": "B",
            "explanation": "Because"
        }))
        .unwrap();

        let q = seed.into_question().unwrap();
        assert_eq!(q.id, 3);
        assert_eq!(q.text, "Pick B");
        assert_eq!(q.correct_answer, "B");
        assert_eq!(q.category, "general");
        assert_eq!(q.weight, 1);
    }

    #[test]
    fn accepts_string_ids_and_camel_case_answer() {
        let seed: QuestionSeed = serde_json::from_value(serde_json::json!({
            "id": "12",
            "text": "Pick A",
            "options": ["A", "B"],
            "correctAnswer": "A",
            "category": "billing",
            "weight": 2
        }))
        .unwrap();

        let q = seed.into_question().unwrap();
        assert_eq!(q.id, 12);
        assert_eq!(q.category, "billing");
        assert_eq!(q.weight, 2);
    }

    #[test]
    fn rejects_empty_options() {
        let seed: QuestionSeed = serde_json::from_value(serde_json::json!({
            "id": 1,
            "text": "No options",
            "options": [],
            "answer": "A"
        }))
        .unwrap();

        assert!(seed.into_question().is_err());
    }

    #[test]
    fn rejects_non_numeric_id() {
        let seed: QuestionSeed = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "text": "Bad id",
            "options": ["A"],
            "answer": "A"
        }))
        .unwrap();

        assert!(seed.into_question().is_err());
    }

    #[test]
    fn strips_script_from_text_but_keeps_options() {
        let seed: QuestionSeed = serde_json::from_value(serde_json::json!({
            "id": 1,
            "text": "<b>Hi</b><script>alert(1)</script>",
            "options": ["<A>", "B"],
            "answer": "<A>"
        }))
        .unwrap();

        let q = seed.into_question().unwrap();
        assert_eq!(q.text, "<b>Hi</b>");
        assert_eq!(q.options[0], "<A>");
        assert_eq!(q.correct_answer, "<A>");
    }

    #[test]
    fn public_question_hides_answer_key() {
        let q = Question {
            id: 1,
            text: "Q".to_string(),
            options: vec!["A".to_string()],
            category: "general".to_string(),
            correct_answer: "A".to_string(),
            weight: 1,
            explanation: Some("secret".to_string()),
        };

        let value = serde_json::to_value(PublicQuestion::from(&q)).unwrap();
        assert!(value.get("correctAnswer").is_none());
        assert!(value.get("explanation").is_none());
    }
}
