//! Unit of Work pattern implementation.
//!
//! Centralizes repository access and runs multi-write operations
//! (registration, password change) inside one database transaction.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    AccessMode, DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait,
};
use uuid::Uuid;

use crate::repository::{
    account_queries, credential_queries, AccountRepository, AccountStore, AuditLogStore,
    AuditSink, CredentialRepository, CredentialStore, SessionLedger, SessionStore,
};
use common::{AppError, AppResult};
use domain::{Account, Credential, NewAccount, Password};

/// Boxed future returned by transaction closures.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Unit of Work trait for dependency injection.
///
/// Not mockable directly because `transaction` is generic; tests provide
/// their own implementation over mocked repositories.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn accounts(&self) -> Arc<dyn AccountRepository>;

    fn credentials(&self) -> Arc<dyn CredentialRepository>;

    fn sessions(&self) -> Arc<dyn SessionLedger>;

    fn audit(&self) -> Arc<dyn AuditSink>;

    /// Execute a closure within a transaction.
    ///
    /// Committed when the closure returns `Ok`, rolled back otherwise.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send;
}

/// Transaction context providing repository access within a transaction.
///
/// Everything done through the context is part of the same transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub fn accounts(&self) -> TxAccountRepository<'a> {
        TxAccountRepository { txn: self.txn }
    }

    pub fn credentials(&self) -> TxCredentialRepository<'a> {
        TxCredentialRepository { txn: self.txn }
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    account_repo: Arc<AccountStore>,
    credential_repo: Arc<CredentialStore>,
    session_repo: Arc<SessionStore>,
    audit_repo: Arc<AuditLogStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            account_repo: Arc::new(AccountStore::new(db.clone())),
            credential_repo: Arc::new(CredentialStore::new(db.clone())),
            session_repo: Arc::new(SessionStore::new(db.clone())),
            audit_repo: Arc::new(AuditLogStore::new(db.clone())),
            db,
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn accounts(&self) -> Arc<dyn AccountRepository> {
        self.account_repo.clone()
    }

    fn credentials(&self) -> Arc<dyn CredentialRepository> {
        self.credential_repo.clone()
    }

    fn sessions(&self) -> Arc<dyn SessionLedger> {
        self.session_repo.clone()
    }

    fn audit(&self) -> Arc<dyn AuditSink> {
        self.audit_repo.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::ReadCommitted),
                Some(AccessMode::ReadWrite),
            )
            .await
            .map_err(AppError::from)?;

        match f(TransactionContext::new(&txn)).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// Transaction-aware account repository.
pub struct TxAccountRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxAccountRepository<'_> {
    /// Create an unactivated account. A username collision is `AlreadyExists`.
    pub async fn create(&self, new: NewAccount) -> AppResult<Account> {
        account_queries::insert(self.txn, new).await
    }
}

/// Transaction-aware credential repository.
pub struct TxCredentialRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxCredentialRepository<'_> {
    /// Deactivate every active credential of the account
    pub async fn deactivate_all(&self, account_id: Uuid) -> AppResult<u64> {
        credential_queries::deactivate_all(self.txn, account_id).await
    }

    /// Create the new active credential
    pub async fn create(&self, account_id: Uuid, password: Password) -> AppResult<Credential> {
        credential_queries::insert(self.txn, account_id, password).await
    }
}
