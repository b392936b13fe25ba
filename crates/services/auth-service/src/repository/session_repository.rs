//! Session ledger: refresh session persistence and revocation.

use async_trait::async_trait;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use uuid::Uuid;

use super::entities::session::{self, ActiveModel, Entity as SessionEntity};
use common::{AppError, AppResult};
use domain::{NewSession, Session};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Tracks refresh session validity.
///
/// Sessions are never deleted; revocation only flips the revoked flag.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SessionLedger: Send + Sync {
    /// Persist a new, unrevoked session
    async fn create(&self, session: NewSession) -> AppResult<Session>;

    /// Find a session that is neither revoked nor expired.
    ///
    /// Returns `NotFound` for unknown, revoked and expired tokens alike.
    async fn find_valid(&self, token: &str) -> AppResult<Session>;

    /// Revoke a session. Unknown tokens are a no-op.
    async fn revoke(&self, token: &str) -> AppResult<()>;

    /// Revoke every unrevoked session of an account, returning how many changed
    async fn revoke_all_for_account(&self, account_id: Uuid) -> AppResult<u64>;
}

/// Concrete implementation of SessionLedger
pub struct SessionStore {
    db: DatabaseConnection,
}

impl SessionStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionLedger for SessionStore {
    async fn create(&self, session: NewSession) -> AppResult<Session> {
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(session.account_id),
            token: Set(session.token),
            expires_at: Set(session.expires_at),
            is_revoked: Set(false),
            created_at: Set(chrono::Utc::now()),
        };

        let model = active_model.insert(&self.db).await.map_err(AppError::from)?;
        Ok(Session::from(model))
    }

    async fn find_valid(&self, token: &str) -> AppResult<Session> {
        // Expiry is checked in Rust, not SQL: backends store timestamps differently
        let found = SessionEntity::find()
            .filter(session::Column::Token.eq(token))
            .filter(session::Column::IsRevoked.eq(false))
            .one(&self.db)
            .await
            .map_err(AppError::from)?
            .map(Session::from);

        match found {
            Some(session) if session.is_valid_at(chrono::Utc::now()) => Ok(session),
            _ => Err(AppError::NotFound),
        }
    }

    async fn revoke(&self, token: &str) -> AppResult<()> {
        SessionEntity::update_many()
            .col_expr(session::Column::IsRevoked, Expr::value(true))
            .filter(session::Column::Token.eq(token))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(())
    }

    async fn revoke_all_for_account(&self, account_id: Uuid) -> AppResult<u64> {
        let result = SessionEntity::update_many()
            .col_expr(session::Column::IsRevoked, Expr::value(true))
            .filter(session::Column::AccountId.eq(account_id))
            .filter(session::Column::IsRevoked.eq(false))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected)
    }
}
