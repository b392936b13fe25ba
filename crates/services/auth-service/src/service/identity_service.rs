//! Identity service - registration, activation, login and logout.
//!
//! Orchestrates the credential verifier (`domain::Password`), the token
//! issuer and the session ledger over a unit of work.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::token_issuer::{IssuedTokens, TokenIssuer};
use crate::infra::UnitOfWork;
use common::{AppError, AppResult, OptionExt};
use domain::{
    Account, AuditEntry, ClientMetadata, NewAccount, Password, Severity, WorkFactor,
    AUDIT_INVALID_USERNAME, AUDIT_LOGIN_SUCCESSFUL,
};

/// Plain text hashed at startup so an unknown username costs one verification.
const DUMMY_PASSWORD: &str = "dummy-password-for-unknown-usernames";

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub account: Account,
    pub tokens: IssuedTokens,
}

/// Result of a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub account: Account,
    pub access_token: String,
}

/// Identity service trait for dependency injection.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Create an unactivated account with its first credential
    async fn register(&self, username: String, password: String, role: String)
        -> AppResult<Account>;

    /// Mark an account activated
    async fn activate(&self, account_id: Uuid) -> AppResult<()>;

    /// Verify credentials and mint an access/refresh pair
    async fn login(
        &self,
        username: String,
        password: String,
        client: ClientMetadata,
    ) -> AppResult<LoginOutcome>;

    /// Mint a new access token from a valid refresh session
    async fn refresh(&self, refresh_token: String) -> AppResult<RefreshOutcome>;

    /// Revoke a refresh session. An empty token is a no-op.
    async fn logout(&self, refresh_token: String) -> AppResult<()>;

    /// Replace the active credential after checking the current password
    async fn change_password(
        &self,
        account_id: Uuid,
        current_password: String,
        new_password: String,
    ) -> AppResult<()>;
}

/// Concrete implementation of IdentityService.
pub struct IdentityManager<U: UnitOfWork> {
    uow: Arc<U>,
    tokens: Arc<TokenIssuer>,
    work_factor: WorkFactor,
    dummy_hash: Password,
}

impl<U: UnitOfWork> IdentityManager<U> {
    /// Create the service. Fails if the work factor is rejected by Argon2.
    pub fn new(uow: Arc<U>, tokens: Arc<TokenIssuer>, work_factor: WorkFactor) -> AppResult<Self> {
        let dummy_hash = Password::new(DUMMY_PASSWORD, &work_factor)?;

        Ok(Self {
            uow,
            tokens,
            work_factor,
            dummy_hash,
        })
    }

    /// Hash on the blocking pool; Argon2 is deliberately slow.
    async fn hash_password(&self, plain_text: String) -> AppResult<Password> {
        let work_factor = self.work_factor;
        tokio::task::spawn_blocking(move || Password::new(&plain_text, &work_factor))
            .await
            .map_err(|e| AppError::internal(format!("Hashing task failed: {}", e)))?
            .map_err(AppError::from)
    }

    async fn verify_password(&self, hash: Password, plain_text: String) -> AppResult<bool> {
        tokio::task::spawn_blocking(move || hash.verify(&plain_text))
            .await
            .map_err(|e| AppError::internal(format!("Verification task failed: {}", e)))
    }

    /// Best-effort audit write.
    async fn record_audit(&self, entry: AuditEntry) {
        if let Err(e) = self.uow.audit().record(entry).await {
            warn!("Failed to write login audit entry: {}", e);
        }
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> IdentityService for IdentityManager<U> {
    async fn register(
        &self,
        username: String,
        password: String,
        role: String,
    ) -> AppResult<Account> {
        let new_account = NewAccount::parse(&username, &role)?;
        if password.is_empty() {
            return Err(AppError::validation("Password must not be empty"));
        }

        if self
            .uow
            .accounts()
            .find_by_username(&new_account.username)
            .await?
            .is_some()
        {
            return Err(AppError::already_exists("Username"));
        }

        let password = self.hash_password(password).await?;

        let account = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let account = ctx.accounts().create(new_account).await?;
                    ctx.credentials().deactivate_all(account.id).await?;
                    ctx.credentials().create(account.id, password).await?;
                    Ok(account)
                })
            })
            .await?;

        info!(account_id = %account.id, role = %account.role, "Account registered");
        Ok(account)
    }

    async fn activate(&self, account_id: Uuid) -> AppResult<()> {
        let mut account = self
            .uow
            .accounts()
            .find_by_id(account_id)
            .await?
            .ok_or_not_found()?;

        account.activate();
        self.uow.accounts().update(account).await?;

        info!(%account_id, "Account activated");
        Ok(())
    }

    async fn login(
        &self,
        username: String,
        password: String,
        client: ClientMetadata,
    ) -> AppResult<LoginOutcome> {
        let account = match self.uow.accounts().find_by_username(&username).await? {
            Some(account) => account,
            None => {
                // Same cost as a wrong password
                self.verify_password(self.dummy_hash.clone(), password).await?;
                self.record_audit(AuditEntry::new(
                    None,
                    AUDIT_INVALID_USERNAME,
                    Severity::Error,
                    client,
                ))
                .await;
                return Err(AppError::InvalidCredentials);
            }
        };

        if !account.can_login() {
            self.verify_password(self.dummy_hash.clone(), password).await?;
            debug!(account_id = %account.id, "Login refused for inactive account");
            return Err(AppError::UserInactive);
        }

        let credential = match self.uow.credentials().find_active_by_account(account.id).await {
            Ok(Some(credential)) => credential,
            Ok(None) => return Err(AppError::InvalidCredentials),
            Err(e) => {
                warn!(account_id = %account.id, "Credential lookup failed: {}", e);
                return Err(AppError::InvalidCredentials);
            }
        };

        if !self.verify_password(credential.password(), password).await? {
            return Err(AppError::InvalidCredentials);
        }

        let tokens = self.tokens.issue_tokens(&account).await?;

        self.record_audit(AuditEntry::new(
            Some(account.id),
            AUDIT_LOGIN_SUCCESSFUL,
            Severity::Success,
            client,
        ))
        .await;

        info!(account_id = %account.id, "Login successful");
        Ok(LoginOutcome { account, tokens })
    }

    async fn refresh(&self, refresh_token: String) -> AppResult<RefreshOutcome> {
        if refresh_token.is_empty() {
            return Err(AppError::Unauthenticated);
        }

        let session = self
            .uow
            .sessions()
            .find_valid(&refresh_token)
            .await
            .map_err(|e| match e {
                AppError::NotFound => AppError::Unauthenticated,
                other => other,
            })?;

        let account = self
            .uow
            .accounts()
            .find_by_id(session.account_id)
            .await?
            .ok_or(AppError::Unauthenticated)?;

        if !account.can_login() {
            return Err(AppError::UserInactive);
        }

        let access_token = self.tokens.issue_access_token(&account)?;
        Ok(RefreshOutcome {
            account,
            access_token,
        })
    }

    async fn logout(&self, refresh_token: String) -> AppResult<()> {
        if refresh_token.is_empty() {
            return Ok(());
        }

        self.uow.sessions().revoke(&refresh_token).await
    }

    async fn change_password(
        &self,
        account_id: Uuid,
        current_password: String,
        new_password: String,
    ) -> AppResult<()> {
        if new_password.is_empty() {
            return Err(AppError::validation("Password must not be empty"));
        }

        let credential = self
            .uow
            .credentials()
            .find_active_by_account(account_id)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !self
            .verify_password(credential.password(), current_password)
            .await?
        {
            return Err(AppError::InvalidCredentials);
        }

        let password = self.hash_password(new_password).await?;

        self.uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    ctx.credentials().deactivate_all(account_id).await?;
                    ctx.credentials().create(account_id, password).await?;
                    Ok(())
                })
            })
            .await?;

        info!(%account_id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{TransactionContext, TxFuture};
    use crate::repository::{
        AccountRepository, AuditSink, CredentialRepository, MockAccountRepository,
        MockAuditSink, MockCredentialRepository, MockSessionLedger, SessionLedger,
    };
    use chrono::{Duration, Utc};
    use common::{ErrorKind, JwtConfig};
    use domain::{AccountRole, Credential, Session};

    fn cheap() -> WorkFactor {
        WorkFactor::new(1024, 1, 1)
    }

    /// Unit of work over mocks. Transactions need a database and always fail.
    struct TestUnitOfWork {
        accounts: Arc<MockAccountRepository>,
        credentials: Arc<MockCredentialRepository>,
        sessions: Arc<MockSessionLedger>,
        audit: Arc<MockAuditSink>,
    }

    #[async_trait]
    impl UnitOfWork for TestUnitOfWork {
        fn accounts(&self) -> Arc<dyn AccountRepository> {
            self.accounts.clone()
        }

        fn credentials(&self) -> Arc<dyn CredentialRepository> {
            self.credentials.clone()
        }

        fn sessions(&self) -> Arc<dyn SessionLedger> {
            self.sessions.clone()
        }

        fn audit(&self) -> Arc<dyn AuditSink> {
            self.audit.clone()
        }

        async fn transaction<F, T>(&self, _f: F) -> AppResult<T>
        where
            F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
            T: Send,
        {
            Err(AppError::internal("no database in unit tests"))
        }
    }

    struct Mocks {
        accounts: MockAccountRepository,
        credentials: MockCredentialRepository,
        sessions: MockSessionLedger,
        audit: MockAuditSink,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                accounts: MockAccountRepository::new(),
                credentials: MockCredentialRepository::new(),
                sessions: MockSessionLedger::new(),
                audit: MockAuditSink::new(),
            }
        }

        fn build(self) -> IdentityManager<TestUnitOfWork> {
            let sessions = Arc::new(self.sessions);
            let issuer = TokenIssuer::new(
                JwtConfig {
                    secret: "unit-test-secret-that-is-long-enough".to_string(),
                    ..JwtConfig::default()
                },
                sessions.clone(),
            );
            let uow = TestUnitOfWork {
                accounts: Arc::new(self.accounts),
                credentials: Arc::new(self.credentials),
                sessions,
                audit: Arc::new(self.audit),
            };
            IdentityManager::new(Arc::new(uow), Arc::new(issuer), cheap()).unwrap()
        }
    }

    fn account(active: bool, activated: bool) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            role: AccountRole::User,
            active,
            activated,
            created_at: now,
            updated_at: now,
        }
    }

    fn credential_for(account_id: Uuid, plain: &str) -> Credential {
        let now = Utc::now();
        Credential {
            id: Uuid::new_v4(),
            account_id,
            password_hash: Password::new(plain, &cheap()).unwrap().into_string(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn session_for(account_id: Uuid, token: &str) -> Session {
        Session {
            id: Uuid::new_v4(),
            account_id,
            token: token.to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            revoked: false,
            created_at: Utc::now(),
        }
    }

    fn client() -> ClientMetadata {
        ClientMetadata {
            ip_address: Some("203.0.113.7".to_string()),
            user_agent: Some("test-agent".to_string()),
        }
    }

    #[tokio::test]
    async fn test_login_unknown_username_audits_and_fails() {
        let mut mocks = Mocks::new();
        mocks
            .accounts
            .expect_find_by_username()
            .returning(|_| Ok(None));
        mocks
            .audit
            .expect_record()
            .withf(|entry| {
                entry.account_id.is_none()
                    && entry.message == AUDIT_INVALID_USERNAME
                    && entry.severity == Severity::Error
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = mocks.build();
        let err = service
            .login("nobody".to_string(), "pw".to_string(), client())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_unactivated_account_is_inactive() {
        let mut mocks = Mocks::new();
        let acc = account(true, false);
        mocks
            .accounts
            .expect_find_by_username()
            .returning(move |_| Ok(Some(acc.clone())));
        mocks.audit.expect_record().times(0);

        let service = mocks.build();
        let err = service
            .login("alice".to_string(), "pw".to_string(), client())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UserInactive));
        let status = tonic::Status::from(err);
        assert_eq!(status.code(), tonic::Code::Unauthenticated);
        assert_eq!(status.message(), "Invalid credentials");
    }

    #[tokio::test]
    async fn test_login_disabled_account_is_inactive() {
        let mut mocks = Mocks::new();
        let acc = account(false, true);
        mocks
            .accounts
            .expect_find_by_username()
            .returning(move |_| Ok(Some(acc.clone())));

        let service = mocks.build();
        let err = service
            .login("alice".to_string(), "pw".to_string(), client())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UserInactive));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let mut mocks = Mocks::new();
        let acc = account(true, true);
        let cred = credential_for(acc.id, "correct horse");
        mocks
            .accounts
            .expect_find_by_username()
            .returning(move |_| Ok(Some(acc.clone())));
        mocks
            .credentials
            .expect_find_active_by_account()
            .returning(move |_| Ok(Some(cred.clone())));
        mocks.audit.expect_record().times(0);

        let service = mocks.build();
        let err = service
            .login("alice".to_string(), "battery staple".to_string(), client())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_missing_or_failing_credential_lookup() {
        for lookup_fails in [false, true] {
            let mut mocks = Mocks::new();
            let acc = account(true, true);
            mocks
                .accounts
                .expect_find_by_username()
                .returning(move |_| Ok(Some(acc.clone())));
            mocks
                .credentials
                .expect_find_active_by_account()
                .returning(move |_| {
                    if lookup_fails {
                        Err(AppError::internal("connection reset"))
                    } else {
                        Ok(None)
                    }
                });

            let service = mocks.build();
            let err = service
                .login("alice".to_string(), "pw".to_string(), client())
                .await
                .unwrap_err();

            assert!(matches!(err, AppError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn test_login_account_lookup_failure_is_internal() {
        let mut mocks = Mocks::new();
        mocks
            .accounts
            .expect_find_by_username()
            .returning(|_| Err(AppError::internal("pool exhausted")));

        let service = mocks.build();
        let err = service
            .login("alice".to_string(), "pw".to_string(), client())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_login_success_issues_tokens_and_audits() {
        let mut mocks = Mocks::new();
        let acc = account(true, true);
        let account_id = acc.id;
        let cred = credential_for(acc.id, "correct horse");
        mocks
            .accounts
            .expect_find_by_username()
            .returning(move |_| Ok(Some(acc.clone())));
        mocks
            .credentials
            .expect_find_active_by_account()
            .returning(move |_| Ok(Some(cred.clone())));
        mocks
            .sessions
            .expect_create()
            .times(1)
            .returning(|new| Ok(session_for(new.account_id, &new.token)));
        mocks
            .audit
            .expect_record()
            .withf(move |entry| {
                entry.account_id == Some(account_id)
                    && entry.message == AUDIT_LOGIN_SUCCESSFUL
                    && entry.severity == Severity::Success
                    && entry.client.ip_address.as_deref() == Some("203.0.113.7")
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = mocks.build();
        let outcome = service
            .login("alice".to_string(), "correct horse".to_string(), client())
            .await
            .unwrap();

        assert_eq!(outcome.account.id, account_id);
        assert!(!outcome.tokens.access_token.is_empty());
        assert!(!outcome.tokens.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn test_login_audit_failure_is_swallowed() {
        let mut mocks = Mocks::new();
        let acc = account(true, true);
        let cred = credential_for(acc.id, "correct horse");
        mocks
            .accounts
            .expect_find_by_username()
            .returning(move |_| Ok(Some(acc.clone())));
        mocks
            .credentials
            .expect_find_active_by_account()
            .returning(move |_| Ok(Some(cred.clone())));
        mocks
            .sessions
            .expect_create()
            .returning(|new| Ok(session_for(new.account_id, &new.token)));
        mocks
            .audit
            .expect_record()
            .returning(|_| Err(AppError::internal("audit table missing")));

        let service = mocks.build();
        let result = service
            .login("alice".to_string(), "correct horse".to_string(), client())
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_activate_missing_account() {
        let mut mocks = Mocks::new();
        mocks.accounts.expect_find_by_id().returning(|_| Ok(None));
        mocks.accounts.expect_update().times(0);

        let service = mocks.build();
        let err = service.activate(Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn test_activate_persists_flag() {
        let mut mocks = Mocks::new();
        let acc = account(true, false);
        let account_id = acc.id;
        mocks
            .accounts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(acc.clone())));
        mocks
            .accounts
            .expect_update()
            .withf(move |updated| updated.id == account_id && updated.activated)
            .times(1)
            .returning(|updated| Ok(updated));

        let service = mocks.build();
        service.activate(account_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_logout_empty_token_has_no_side_effects() {
        let mut mocks = Mocks::new();
        mocks.sessions.expect_revoke().times(0);

        let service = mocks.build();
        assert!(service.logout(String::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_propagates_ledger_error() {
        let mut mocks = Mocks::new();
        mocks
            .sessions
            .expect_revoke()
            .withf(|token| token == "refresh-token")
            .times(1)
            .returning(|_| Err(AppError::internal("write failed")));

        let service = mocks.build();
        let err = service.logout("refresh-token".to_string()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_refresh_unknown_session_is_unauthenticated() {
        let mut mocks = Mocks::new();
        mocks
            .sessions
            .expect_find_valid()
            .returning(|_| Err(AppError::NotFound));

        let service = mocks.build();
        let err = service.refresh("stale".to_string()).await.unwrap_err();

        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_refresh_rechecks_account_state() {
        let mut mocks = Mocks::new();
        let acc = account(false, true);
        let account_id = acc.id;
        mocks
            .sessions
            .expect_find_valid()
            .returning(move |token| Ok(session_for(account_id, token)));
        mocks
            .accounts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(acc.clone())));

        let service = mocks.build();
        let err = service.refresh("token".to_string()).await.unwrap_err();

        assert!(matches!(err, AppError::UserInactive));
    }

    #[tokio::test]
    async fn test_refresh_mints_access_token() {
        let mut mocks = Mocks::new();
        let acc = account(true, true);
        let account_id = acc.id;
        mocks
            .sessions
            .expect_find_valid()
            .returning(move |token| Ok(session_for(account_id, token)));
        mocks
            .accounts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(acc.clone())));
        mocks.sessions.expect_create().times(0);

        let service = mocks.build();
        let outcome = service.refresh("token".to_string()).await.unwrap();

        assert_eq!(outcome.account.id, account_id);
        assert!(!outcome.access_token.is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_input_before_io() {
        let mut mocks = Mocks::new();
        mocks.accounts.expect_find_by_username().times(0);

        let service = mocks.build();

        let err = service
            .register("alice".to_string(), "pw".to_string(), "owner".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = service
            .register(String::new(), "pw".to_string(), "user".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = service
            .register("alice".to_string(), String::new(), "user".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_register_existing_username() {
        let mut mocks = Mocks::new();
        let acc = account(true, true);
        mocks
            .accounts
            .expect_find_by_username()
            .withf(|username| username == "alice")
            .returning(move |_| Ok(Some(acc.clone())));

        let service = mocks.build();
        let err = service
            .register("alice".to_string(), "pw".to_string(), "user".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_change_password_wrong_current() {
        let mut mocks = Mocks::new();
        let account_id = Uuid::new_v4();
        let cred = credential_for(account_id, "correct horse");
        mocks
            .credentials
            .expect_find_active_by_account()
            .returning(move |_| Ok(Some(cred.clone())));

        let service = mocks.build();
        let err = service
            .change_password(account_id, "wrong".to_string(), "new-pass".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[test]
    fn test_invalid_work_factor_rejected_at_construction() {
        let uow = TestUnitOfWork {
            accounts: Arc::new(MockAccountRepository::new()),
            credentials: Arc::new(MockCredentialRepository::new()),
            sessions: Arc::new(MockSessionLedger::new()),
            audit: Arc::new(MockAuditSink::new()),
        };
        let issuer = TokenIssuer::new(JwtConfig::default(), Arc::new(MockSessionLedger::new()));

        let result = IdentityManager::new(Arc::new(uow), Arc::new(issuer), WorkFactor::new(0, 0, 0));
        assert!(result.is_err());
    }
}
