//! Credential repository implementation.

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use common::AppResult;
use domain::Credential;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Read access to credentials. Writes only happen inside a transaction.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Find the active credential of an account
    async fn find_active_by_account(&self, account_id: Uuid) -> AppResult<Option<Credential>>;
}

/// Concrete implementation of CredentialRepository
pub struct CredentialStore {
    db: DatabaseConnection,
}

impl CredentialStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialRepository for CredentialStore {
    async fn find_active_by_account(&self, account_id: Uuid) -> AppResult<Option<Credential>> {
        queries::find_active_by_account(&self.db, account_id).await
    }
}

pub(crate) mod queries {
    use sea_orm::{
        sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
        QueryFilter, QueryOrder, Set, SqlErr,
    };
    use uuid::Uuid;

    use crate::repository::entities::credential::{self, ActiveModel, Entity as CredentialEntity};
    use common::{AppError, AppResult};
    use domain::{Credential, Password};

    pub async fn find_active_by_account<C: ConnectionTrait>(
        conn: &C,
        account_id: Uuid,
    ) -> AppResult<Option<Credential>> {
        let model = CredentialEntity::find()
            .filter(credential::Column::AccountId.eq(account_id))
            .filter(credential::Column::IsActive.eq(true))
            .order_by_desc(credential::Column::CreatedAt)
            .one(conn)
            .await?;

        Ok(model.map(Credential::from))
    }

    /// Mark every credential of the account inactive.
    pub async fn deactivate_all<C: ConnectionTrait>(conn: &C, account_id: Uuid) -> AppResult<u64> {
        let result = CredentialEntity::update_many()
            .col_expr(credential::Column::IsActive, Expr::value(false))
            .col_expr(credential::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(credential::Column::AccountId.eq(account_id))
            .filter(credential::Column::IsActive.eq(true))
            .exec(conn)
            .await?;

        Ok(result.rows_affected)
    }

    /// Insert a new active credential. Fails with `AlreadyExists` while
    /// another credential of the account is still active.
    pub async fn insert<C: ConnectionTrait>(
        conn: &C,
        account_id: Uuid,
        password: Password,
    ) -> AppResult<Credential> {
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(account_id),
            password_hash: Set(password.into_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(conn).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::already_exists("Active credential")
            }
            _ => AppError::from(e),
        })?;

        Ok(Credential::from(model))
    }
}
