// src/repository/memory.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    AdminLogRepository, AdminRepository, CandidateRepository, ProgressRepository,
    QuestionRepository, ResultRepository, StorageError,
};
use crate::models::{
    admin::{Admin, AdminLog, NewAdmin},
    progress::CandidateProgress,
    question::Question,
    result::ResultRecord,
    user::{Candidate, CandidateSummary},
};

#[derive(Default)]
struct Tables {
    questions: Vec<Question>,
    progress: HashMap<String, CandidateProgress>,
    results: HashMap<String, ResultRecord>,
    candidates: HashMap<String, Candidate>,
    admins: Vec<Admin>,
    admin_logs: Vec<AdminLog>,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Clones share the same tables. `set_offline(true)` makes every call fail with
/// `StorageError::Connection`, which lets tests exercise persistence failures.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<Tables>>,
    offline: Arc<AtomicBool>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("store offline".to_string()));
        }
        self.tables
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn answer_key(&self) -> Result<Vec<Question>, StorageError> {
        let guard = self.lock()?;
        let mut questions = guard.questions.clone();
        questions.sort_by_key(|q| q.id);
        Ok(questions)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.lock()?.questions.len() as u64)
    }

    async fn replace_all(&self, questions: &[Question]) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.questions = questions.to_vec();
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get(&self, email: &str) -> Result<Option<CandidateProgress>, StorageError> {
        Ok(self.lock()?.progress.get(email).cloned())
    }

    async fn upsert(&self, progress: &CandidateProgress) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let mut record = progress.clone();
        if let Some(existing) = guard.progress.get(&progress.email) {
            record.start_time = existing.start_time;
        }
        guard.progress.insert(record.email.clone(), record);
        Ok(())
    }

    async fn insert_if_absent(&self, progress: &CandidateProgress) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        if guard.progress.contains_key(&progress.email) {
            return Ok(false);
        }
        guard
            .progress
            .insert(progress.email.clone(), progress.clone());
        Ok(true)
    }

    async fn delete(&self, email: &str) -> Result<bool, StorageError> {
        Ok(self.lock()?.progress.remove(email).is_some())
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn upsert(&self, record: &ResultRecord) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.results.insert(record.email.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<ResultRecord>, StorageError> {
        Ok(self.lock()?.results.get(email).cloned())
    }

    async fn list(&self) -> Result<Vec<ResultRecord>, StorageError> {
        let guard = self.lock()?;
        let mut records: Vec<ResultRecord> = guard.results.values().cloned().collect();
        records.sort_by(|a, b| b.assessment_date.cmp(&a.assessment_date));
        Ok(records)
    }

    async fn delete(&self, email: &str) -> Result<bool, StorageError> {
        Ok(self.lock()?.results.remove(email).is_some())
    }
}

#[async_trait]
impl CandidateRepository for InMemoryRepository {
    async fn record_login(
        &self,
        email: &str,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<Candidate, StorageError> {
        let mut guard = self.lock()?;
        let candidate = guard
            .candidates
            .entry(email.to_string())
            .and_modify(|c| {
                c.name = name.to_string();
                c.last_login = at;
            })
            .or_insert_with(|| Candidate::new(email, name, at));
        Ok(candidate.clone())
    }

    async fn get(&self, email: &str) -> Result<Option<Candidate>, StorageError> {
        Ok(self.lock()?.candidates.get(email).cloned())
    }

    async fn list(&self) -> Result<Vec<Candidate>, StorageError> {
        let guard = self.lock()?;
        let mut candidates: Vec<Candidate> = guard.candidates.values().cloned().collect();
        candidates.sort_by(|a, b| b.last_login.cmp(&a.last_login));
        Ok(candidates)
    }

    async fn apply_summary(
        &self,
        email: &str,
        summary: &CandidateSummary,
    ) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        match guard.candidates.get_mut(email) {
            Some(candidate) => {
                candidate.overall_score = summary.overall_score;
                candidate.correct_count = summary.correct_count;
                candidate.wrong_count = summary.wrong_count;
                candidate.skipped_count = summary.skipped_count;
                candidate.test_submitted = true;
                candidate.last_login = summary.submitted_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, email: &str) -> Result<bool, StorageError> {
        Ok(self.lock()?.candidates.remove(email).is_some())
    }
}

#[async_trait]
impl AdminRepository for InMemoryRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.admins.iter().find(|a| a.email == email).cloned())
    }

    async fn create(&self, admin: &NewAdmin) -> Result<Admin, StorageError> {
        let id = self.next_id();
        let mut guard = self.lock()?;
        if guard.admins.iter().any(|a| a.email == admin.email) {
            return Err(StorageError::Conflict);
        }
        let created = Admin {
            id,
            username: admin.username.clone(),
            email: admin.email.clone(),
            password: admin.password_hash.clone(),
            role: "admin".to_string(),
        };
        guard.admins.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl AdminLogRepository for InMemoryRepository {
    async fn append(&self, email: &str, at: DateTime<Utc>) -> Result<AdminLog, StorageError> {
        let id = self.next_id();
        let mut guard = self.lock()?;
        let entry = AdminLog {
            id,
            email: email.to_string(),
            timestamp: at,
            status: "Authorized Access".to_string(),
        };
        guard.admin_logs.push(entry.clone());
        Ok(entry)
    }

    async fn list(&self) -> Result<Vec<AdminLog>, StorageError> {
        let guard = self.lock()?;
        let mut logs = guard.admin_logs.clone();
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(logs)
    }

    async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        let before = guard.admin_logs.len();
        guard.admin_logs.retain(|l| l.id != id);
        Ok(guard.admin_logs.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::fixed_now;

    #[tokio::test]
    async fn progress_upsert_keeps_start_time() {
        let repo = InMemoryRepository::new();
        let t0 = fixed_now();
        let first = CandidateProgress::started("a@x.io", 1800, t0);
        ProgressRepository::upsert(&repo, &first).await.unwrap();

        let mut later = CandidateProgress::started("a@x.io", 1700, t0 + chrono::Duration::seconds(100));
        later.current_question_index = 4;
        ProgressRepository::upsert(&repo, &later).await.unwrap();

        let stored = ProgressRepository::get(&repo, "a@x.io").await.unwrap().unwrap();
        assert_eq!(stored.start_time, t0);
        assert_eq!(stored.current_question_index, 4);
        assert_eq!(stored.time_remaining, 1700);
    }

    #[tokio::test]
    async fn insert_if_absent_does_not_overwrite() {
        let repo = InMemoryRepository::new();
        let mut progress = CandidateProgress::started("a@x.io", 1800, fixed_now());
        assert!(repo.insert_if_absent(&progress).await.unwrap());

        progress.time_remaining = 5;
        assert!(!repo.insert_if_absent(&progress).await.unwrap());
        let stored = ProgressRepository::get(&repo, "a@x.io").await.unwrap().unwrap();
        assert_eq!(stored.time_remaining, 1800);
    }

    #[tokio::test]
    async fn summary_update_sets_submitted_flag() {
        let repo = InMemoryRepository::new();
        repo.record_login("a@x.io", "Ann", fixed_now()).await.unwrap();

        let summary = CandidateSummary {
            overall_score: 50,
            correct_count: 1,
            wrong_count: 0,
            skipped_count: 1,
            submitted_at: fixed_now(),
        };
        assert!(repo.apply_summary("a@x.io", &summary).await.unwrap());
        assert!(!repo.apply_summary("missing@x.io", &summary).await.unwrap());

        let candidate = CandidateRepository::get(&repo, "a@x.io").await.unwrap().unwrap();
        assert!(candidate.test_submitted);
        assert_eq!(candidate.overall_score, 50);
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let repo = InMemoryRepository::new();
        repo.set_offline(true);

        assert!(matches!(
            repo.answer_key().await,
            Err(StorageError::Connection(_))
        ));
        repo.set_offline(false);
        assert!(repo.answer_key().await.unwrap().is_empty());
    }
}
