// src/repository/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};

use super::{
    AdminLogRepository, AdminRepository, CandidateRepository, ProgressRepository,
    QuestionRepository, ResultRepository, StorageError,
};
use crate::models::{
    admin::{Admin, AdminLog, NewAdmin},
    answers::AnswerMap,
    progress::CandidateProgress,
    question::Question,
    result::{ResponseEntry, ResultRecord},
    user::{Candidate, CandidateSummary},
};

/// Postgres-backed repository. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn u32_from_i32(field: &'static str, v: i32) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn i32_from_u32(field: &'static str, v: u32) -> Result<i32, StorageError> {
    i32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    text: String,
    options: Json<Vec<String>>,
    category: String,
    correct_answer: String,
    weight: i32,
    explanation: Option<String>,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            id: row.id,
            text: row.text,
            options: row.options.0,
            category: row.category,
            correct_answer: row.correct_answer,
            weight: row.weight,
            explanation: row.explanation,
        }
    }
}

#[derive(FromRow)]
struct ProgressRow {
    email: String,
    current_question_index: i32,
    time_remaining: i32,
    answers: Json<AnswerMap>,
    start_time: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl TryFrom<ProgressRow> for CandidateProgress {
    type Error = StorageError;

    fn try_from(row: ProgressRow) -> Result<Self, Self::Error> {
        Ok(CandidateProgress {
            email: row.email,
            current_question_index: u32_from_i32(
                "current_question_index",
                row.current_question_index,
            )?,
            time_remaining: u32_from_i32("time_remaining", row.time_remaining)?,
            answers: row.answers.0,
            start_time: row.start_time,
            last_updated: row.last_updated,
        })
    }
}

#[derive(FromRow)]
struct ResultRow {
    email: String,
    applicant_name: String,
    responses: Json<Vec<ResponseEntry>>,
    overall_score: i32,
    correct_count: i32,
    wrong_count: i32,
    skipped_count: i32,
    completed: bool,
    assessment_date: DateTime<Utc>,
}

impl TryFrom<ResultRow> for ResultRecord {
    type Error = StorageError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        Ok(ResultRecord {
            email: row.email,
            applicant_name: row.applicant_name,
            responses: row.responses.0,
            overall_score: u32_from_i32("overall_score", row.overall_score)?,
            correct_count: u32_from_i32("correct_count", row.correct_count)?,
            wrong_count: u32_from_i32("wrong_count", row.wrong_count)?,
            skipped_count: u32_from_i32("skipped_count", row.skipped_count)?,
            completed: row.completed,
            assessment_date: row.assessment_date,
        })
    }
}

#[derive(FromRow)]
struct CandidateRow {
    email: String,
    name: String,
    role: String,
    last_login: DateTime<Utc>,
    overall_score: i32,
    correct_count: i32,
    wrong_count: i32,
    skipped_count: i32,
    test_submitted: bool,
}

impl TryFrom<CandidateRow> for Candidate {
    type Error = StorageError;

    fn try_from(row: CandidateRow) -> Result<Self, Self::Error> {
        Ok(Candidate {
            email: row.email,
            name: row.name,
            role: row.role,
            last_login: row.last_login,
            overall_score: u32_from_i32("overall_score", row.overall_score)?,
            correct_count: u32_from_i32("correct_count", row.correct_count)?,
            wrong_count: u32_from_i32("wrong_count", row.wrong_count)?,
            skipped_count: u32_from_i32("skipped_count", row.skipped_count)?,
            test_submitted: row.test_submitted,
        })
    }
}

#[derive(FromRow)]
struct AdminRow {
    id: i64,
    username: String,
    email: String,
    password: String,
    role: String,
}

impl From<AdminRow> for Admin {
    fn from(row: AdminRow) -> Self {
        Admin {
            id: row.id,
            username: row.username,
            email: row.email,
            password: row.password,
            role: row.role,
        }
    }
}

#[derive(FromRow)]
struct AdminLogRow {
    id: i64,
    email: String,
    logged_at: DateTime<Utc>,
    status: String,
}

impl From<AdminLogRow> for AdminLog {
    fn from(row: AdminLogRow) -> Self {
        AdminLog {
            id: row.id,
            email: row.email,
            timestamp: row.logged_at,
            status: row.status,
        }
    }
}

const CANDIDATE_COLUMNS: &str = "email, name, role, last_login, overall_score, correct_count, \
     wrong_count, skipped_count, test_submitted";

const RESULT_COLUMNS: &str = "email, applicant_name, responses, overall_score, correct_count, \
     wrong_count, skipped_count, completed, assessment_date";

#[async_trait]
impl QuestionRepository for PgRepository {
    async fn answer_key(&self) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, text, options, category, correct_answer, weight, explanation
            FROM questions
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Question::from).collect())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn replace_all(&self, questions: &[Question]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM questions")
            .execute(&mut *tx)
            .await?;

        for q in questions {
            sqlx::query(
                r#"
                INSERT INTO questions
                (id, text, options, category, correct_answer, weight, explanation)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(q.id)
            .bind(&q.text)
            .bind(Json(&q.options))
            .bind(&q.category)
            .bind(&q.correct_answer)
            .bind(q.weight)
            .bind(&q.explanation)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for PgRepository {
    async fn get(&self, email: &str) -> Result<Option<CandidateProgress>, StorageError> {
        let row = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT email, current_question_index, time_remaining, answers, start_time, last_updated
            FROM candidate_progress
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CandidateProgress::try_from).transpose()
    }

    async fn upsert(&self, progress: &CandidateProgress) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO candidate_progress
            (email, current_question_index, time_remaining, answers, start_time, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO UPDATE SET
                current_question_index = EXCLUDED.current_question_index,
                time_remaining = EXCLUDED.time_remaining,
                answers = EXCLUDED.answers,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(&progress.email)
        .bind(i32_from_u32(
            "current_question_index",
            progress.current_question_index,
        )?)
        .bind(i32_from_u32("time_remaining", progress.time_remaining)?)
        .bind(Json(&progress.answers))
        .bind(progress.start_time)
        .bind(progress.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_if_absent(&self, progress: &CandidateProgress) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO candidate_progress
            (email, current_question_index, time_remaining, answers, start_time, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(&progress.email)
        .bind(i32_from_u32(
            "current_question_index",
            progress.current_question_index,
        )?)
        .bind(i32_from_u32("time_remaining", progress.time_remaining)?)
        .bind(Json(&progress.answers))
        .bind(progress.start_time)
        .bind(progress.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, email: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM candidate_progress WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ResultRepository for PgRepository {
    async fn upsert(&self, record: &ResultRecord) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO result_records
            (email, applicant_name, responses, overall_score, correct_count,
             wrong_count, skipped_count, completed, assessment_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (email) DO UPDATE SET
                applicant_name = EXCLUDED.applicant_name,
                responses = EXCLUDED.responses,
                overall_score = EXCLUDED.overall_score,
                correct_count = EXCLUDED.correct_count,
                wrong_count = EXCLUDED.wrong_count,
                skipped_count = EXCLUDED.skipped_count,
                completed = EXCLUDED.completed,
                assessment_date = EXCLUDED.assessment_date
            "#,
        )
        .bind(&record.email)
        .bind(&record.applicant_name)
        .bind(Json(&record.responses))
        .bind(i32_from_u32("overall_score", record.overall_score)?)
        .bind(i32_from_u32("correct_count", record.correct_count)?)
        .bind(i32_from_u32("wrong_count", record.wrong_count)?)
        .bind(i32_from_u32("skipped_count", record.skipped_count)?)
        .bind(record.completed)
        .bind(record.assessment_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<ResultRecord>, StorageError> {
        let row = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM result_records WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ResultRecord::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<ResultRecord>, StorageError> {
        let rows = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM result_records ORDER BY assessment_date DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ResultRecord::try_from).collect()
    }

    async fn delete(&self, email: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM result_records WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CandidateRepository for PgRepository {
    async fn record_login(
        &self,
        email: &str,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<Candidate, StorageError> {
        let row = sqlx::query_as::<_, CandidateRow>(&format!(
            r#"
            INSERT INTO candidates (email, name, last_login)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE SET
                name = EXCLUDED.name,
                last_login = EXCLUDED.last_login
            RETURNING {CANDIDATE_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(name)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        Candidate::try_from(row)
    }

    async fn get(&self, email: &str) -> Result<Option<Candidate>, StorageError> {
        let row = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Candidate::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Candidate>, StorageError> {
        let rows = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates ORDER BY last_login DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Candidate::try_from).collect()
    }

    async fn apply_summary(
        &self,
        email: &str,
        summary: &CandidateSummary,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE candidates SET
                overall_score = $2,
                correct_count = $3,
                wrong_count = $4,
                skipped_count = $5,
                test_submitted = TRUE,
                last_login = $6
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(i32_from_u32("overall_score", summary.overall_score)?)
        .bind(i32_from_u32("correct_count", summary.correct_count)?)
        .bind(i32_from_u32("wrong_count", summary.wrong_count)?)
        .bind(i32_from_u32("skipped_count", summary.skipped_count)?)
        .bind(summary.submitted_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, email: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM candidates WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AdminRepository for PgRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>, StorageError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, username, email, password, role FROM admins WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Admin::from))
    }

    async fn create(&self, admin: &NewAdmin) -> Result<Admin, StorageError> {
        let row = sqlx::query_as::<_, AdminRow>(
            r#"
            INSERT INTO admins (username, email, password, role)
            VALUES ($1, $2, $3, 'admin')
            RETURNING id, username, email, password, role
            "#,
        )
        .bind(&admin.username)
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(Admin::from(row))
    }
}

#[async_trait]
impl AdminLogRepository for PgRepository {
    async fn append(&self, email: &str, at: DateTime<Utc>) -> Result<AdminLog, StorageError> {
        let row = sqlx::query_as::<_, AdminLogRow>(
            r#"
            INSERT INTO admin_logs (email, logged_at)
            VALUES ($1, $2)
            RETURNING id, email, logged_at, status
            "#,
        )
        .bind(email)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        Ok(AdminLog::from(row))
    }

    async fn list(&self) -> Result<Vec<AdminLog>, StorageError> {
        let rows = sqlx::query_as::<_, AdminLogRow>(
            "SELECT id, email, logged_at, status FROM admin_logs ORDER BY logged_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AdminLog::from).collect())
    }

    async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM admin_logs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
