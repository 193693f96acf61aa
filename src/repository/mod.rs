// src/repository/mod.rs

//! Persistence contracts for the assessment core.
//!
//! Every service receives its handles through [`Storage`], so the same code runs
//! against Postgres in production and against [`InMemoryRepository`] in tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;

use crate::models::{
    admin::{Admin, AdminLog, NewAdmin},
    progress::CandidateProgress,
    question::Question,
    result::ResultRecord,
    user::{Candidate, CandidateSummary},
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StorageError::Serialization(err.to_string())
            }
            _ => StorageError::Connection(err.to_string()),
        }
    }
}

/// Read access to the answer key, plus the administrative reseed.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// All questions ordered by id.
    async fn answer_key(&self) -> Result<Vec<Question>, StorageError>;

    async fn count(&self) -> Result<u64, StorageError>;

    /// Replaces the whole answer key in one step.
    async fn replace_all(&self, questions: &[Question]) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn get(&self, email: &str) -> Result<Option<CandidateProgress>, StorageError>;

    /// Insert or overwrite; an existing `start_time` is preserved.
    async fn upsert(&self, progress: &CandidateProgress) -> Result<(), StorageError>;

    /// Returns false when a record already existed and was left untouched.
    async fn insert_if_absent(&self, progress: &CandidateProgress) -> Result<bool, StorageError>;

    /// Returns false when there was nothing to delete.
    async fn delete(&self, email: &str) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Insert or overwrite the record for `record.email`.
    async fn upsert(&self, record: &ResultRecord) -> Result<(), StorageError>;

    async fn get(&self, email: &str) -> Result<Option<ResultRecord>, StorageError>;

    /// Newest assessment first.
    async fn list(&self) -> Result<Vec<ResultRecord>, StorageError>;

    async fn delete(&self, email: &str) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait CandidateRepository: Send + Sync {
    /// Creates the candidate or refreshes its name and last login.
    async fn record_login(
        &self,
        email: &str,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<Candidate, StorageError>;

    async fn get(&self, email: &str) -> Result<Option<Candidate>, StorageError>;

    /// Most recent login first.
    async fn list(&self) -> Result<Vec<Candidate>, StorageError>;

    /// Writes the score fields and sets `test_submitted`.
    /// Returns false when no candidate with that email exists.
    async fn apply_summary(
        &self,
        email: &str,
        summary: &CandidateSummary,
    ) -> Result<bool, StorageError>;

    async fn delete(&self, email: &str) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>, StorageError>;

    /// Fails with `StorageError::Conflict` if the email is taken.
    async fn create(&self, admin: &NewAdmin) -> Result<Admin, StorageError>;
}

#[async_trait]
pub trait AdminLogRepository: Send + Sync {
    async fn append(&self, email: &str, at: DateTime<Utc>) -> Result<AdminLog, StorageError>;

    /// Newest entry first.
    async fn list(&self) -> Result<Vec<AdminLog>, StorageError>;

    async fn delete(&self, id: i64) -> Result<bool, StorageError>;
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub results: Arc<dyn ResultRepository>,
    pub candidates: Arc<dyn CandidateRepository>,
    pub admins: Arc<dyn AdminRepository>,
    pub admin_logs: Arc<dyn AdminLogRepository>,
}

impl Storage {
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_backend(PgRepository::new(pool))
    }

    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryRepository::new())
    }

    /// Wires every repository to one shared backend.
    pub fn from_backend<R>(repo: R) -> Self
    where
        R: QuestionRepository
            + ProgressRepository
            + ResultRepository
            + CandidateRepository
            + AdminRepository
            + AdminLogRepository
            + Clone
            + 'static,
    {
        Self {
            questions: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            results: Arc::new(repo.clone()),
            candidates: Arc::new(repo.clone()),
            admins: Arc::new(repo.clone()),
            admin_logs: Arc::new(repo),
        }
    }
}
