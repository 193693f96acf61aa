// src/services/answer_key.rs

//! Loading the answer key from its seed file.

use std::collections::HashSet;
use std::path::Path;

use crate::{
    error::AppError,
    models::question::{Question, QuestionSeed},
    repository::QuestionRepository,
};

/// Parses a JSON array of seed questions into a validated key, ordered by id.
pub fn parse_answer_key(json: &str) -> Result<Vec<Question>, AppError> {
    let seeds: Vec<QuestionSeed> = serde_json::from_str(json)
        .map_err(|e| AppError::Configuration(format!("invalid questions file: {}", e)))?;

    let mut seen = HashSet::new();
    let mut questions = Vec::with_capacity(seeds.len());

    for (index, seed) in seeds.into_iter().enumerate() {
        let question = seed
            .into_question()
            .map_err(|e| AppError::Configuration(format!("question #{}: {}", index, e)))?;

        if !seen.insert(question.id) {
            return Err(AppError::Configuration(format!(
                "duplicate question id {}",
                question.id
            )));
        }
        questions.push(question);
    }

    questions.sort_by_key(|q| q.id);
    Ok(questions)
}

pub async fn load_answer_key_file(path: impl AsRef<Path>) -> Result<Vec<Question>, AppError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::Configuration(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse_answer_key(&raw)
}

/// Replaces the stored key with the file contents. Returns the number of questions.
pub async fn reseed(repo: &dyn QuestionRepository, path: &str) -> Result<usize, AppError> {
    let questions = load_answer_key_file(path).await?;
    if questions.is_empty() {
        return Err(AppError::Configuration(format!(
            "{} contains no questions",
            path
        )));
    }

    repo.replace_all(&questions).await?;
    tracing::info!("Answer key reseeded with {} questions from {}", questions.len(), path);
    Ok(questions.len())
}

/// Seeds the key on first boot; an existing key is left alone.
pub async fn seed_if_empty(repo: &dyn QuestionRepository, path: &str) -> Result<usize, AppError> {
    if repo.count().await? > 0 {
        return Ok(0);
    }
    if !Path::new(path).exists() {
        tracing::warn!("No questions stored and {} not found; answer key is empty", path);
        return Ok(0);
    }
    reseed(repo, path).await
}
