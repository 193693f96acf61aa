// src/services/notifier.rs

use async_trait::async_trait;
use thiserror::Error;

use crate::models::result::ResultRecord;

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Optional side channel told about every finalized result (e.g. a results email).
/// Runs after the submit response is decided and can never fail a submission.
#[async_trait]
pub trait ResultNotifier: Send + Sync {
    async fn result_finalized(&self, record: &ResultRecord) -> Result<(), NotifyError>;
}

/// Dispatch is disabled: results are reviewed from the admin view instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl ResultNotifier for NoopNotifier {
    async fn result_finalized(&self, record: &ResultRecord) -> Result<(), NotifyError> {
        tracing::debug!(email = %record.email, "Result notification disabled, skipping");
        Ok(())
    }
}
