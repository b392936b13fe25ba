//! Account repository implementation.

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use common::AppResult;
use domain::Account;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Account repository trait for dependency injection.
///
/// Creation is only exposed inside a transaction, see
/// `TransactionContext::accounts`.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find account by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>>;

    /// Find account by exact username
    async fn find_by_username(&self, username: &str) -> AppResult<Option<Account>>;

    /// Persist the mutable fields of an existing account
    async fn update(&self, account: Account) -> AppResult<Account>;
}

/// Concrete implementation of AccountRepository
pub struct AccountStore {
    db: DatabaseConnection,
}

impl AccountStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountRepository for AccountStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        queries::find_by_id(&self.db, id).await
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        queries::find_by_username(&self.db, username).await
    }

    async fn update(&self, account: Account) -> AppResult<Account> {
        queries::update(&self.db, account).await
    }
}

pub(crate) mod queries {
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
        SqlErr,
    };
    use uuid::Uuid;

    use crate::repository::entities::account::{self, ActiveModel, Entity as AccountEntity};
    use common::{AppError, AppResult};
    use domain::{Account, NewAccount};

    pub async fn find_by_id<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Option<Account>> {
        AccountEntity::find_by_id(id)
            .one(conn)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    pub async fn find_by_username<C: ConnectionTrait>(
        conn: &C,
        username: &str,
    ) -> AppResult<Option<Account>> {
        AccountEntity::find()
            .filter(account::Column::Username.eq(username))
            .one(conn)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    /// Insert a new account: active, not yet activated.
    pub async fn insert<C: ConnectionTrait>(conn: &C, new: NewAccount) -> AppResult<Account> {
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(new.username),
            role: Set(new.role.as_str().to_string()),
            is_active: Set(true),
            is_activated: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(conn).await.map_err(|e| {
            // A concurrent registration can pass the existence check
            match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => AppError::already_exists("Username"),
                _ => AppError::from(e),
            }
        })?;

        Account::try_from(model)
    }

    pub async fn update<C: ConnectionTrait>(conn: &C, account: Account) -> AppResult<Account> {
        let active_model = ActiveModel {
            id: Set(account.id),
            username: Set(account.username),
            role: Set(account.role.as_str().to_string()),
            is_active: Set(account.active),
            is_activated: Set(account.activated),
            created_at: Set(account.created_at),
            updated_at: Set(account.updated_at),
        };

        let model = active_model.update(conn).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => AppError::NotFound,
            other => AppError::from(other),
        })?;

        Account::try_from(model)
    }
}
