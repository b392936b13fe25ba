//! Login audit sink.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

use super::entities::login_log::ActiveModel;
use common::{AppError, AppResult};
use domain::AuditEntry;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Append-only destination for login events.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> AppResult<()>;
}

/// Writes audit entries to the `login_logs` table
pub struct AuditLogStore {
    db: DatabaseConnection,
}

impl AuditLogStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditSink for AuditLogStore {
    async fn record(&self, entry: AuditEntry) -> AppResult<()> {
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(entry.account_id),
            message: Set(entry.message),
            log_type: Set(entry.severity.as_str().to_string()),
            ip_address: Set(entry.client.ip_address),
            user_agent: Set(entry.client.user_agent),
            created_at: Set(chrono::Utc::now()),
        };

        active_model.insert(&self.db).await.map_err(AppError::from)?;
        Ok(())
    }
}
