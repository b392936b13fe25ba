//! Request authentication gate.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::context::{Access, CallMetadata, Identity, Operation, RequestContext};
use super::pipeline::Stage;
use crate::service::TokenIssuer;
use common::{AppError, AppResult};
use domain::ACCESS_TOKEN_COOKIE;

/// `auth.AuthService` methods reachable without an access token.
///
/// Refresh authenticates with the refresh token itself.
pub const DEFAULT_PUBLIC_METHODS: &[&str] = &["Register", "Login", "Activate", "Refresh"];

/// Verifies the caller's access token for every non-public operation.
pub struct AuthenticationGate {
    tokens: Arc<TokenIssuer>,
    public: HashSet<Operation>,
}

impl AuthenticationGate {
    pub fn new(tokens: Arc<TokenIssuer>) -> Self {
        Self::with_public_operations(
            tokens,
            DEFAULT_PUBLIC_METHODS.iter().map(|m| Operation::auth(m)),
        )
    }

    pub fn with_public_operations(
        tokens: Arc<TokenIssuer>,
        public: impl IntoIterator<Item = Operation>,
    ) -> Self {
        Self {
            tokens,
            public: public.into_iter().collect(),
        }
    }

    pub fn is_public(&self, operation: &Operation) -> bool {
        self.public.contains(operation)
    }
}

impl Stage for AuthenticationGate {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn apply(&self, ctx: RequestContext, metadata: &CallMetadata) -> AppResult<RequestContext> {
        if self.is_public(ctx.operation()) {
            return Ok(ctx.with_access(Access::Public));
        }

        let token = metadata
            .bearer_token()
            .or_else(|| metadata.cookie(ACCESS_TOKEN_COOKIE))
            .ok_or(AppError::Unauthenticated)?;

        let claims = self
            .tokens
            .verify_access_token(token)
            .map_err(|_| AppError::Unauthenticated)?;

        debug!(account_id = %claims.sub, operation = %ctx.operation(), "Caller authenticated");
        Ok(ctx.with_access(Access::Authenticated(Identity::from(claims))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockSessionLedger;
    use chrono::Utc;
    use common::JwtConfig;
    use domain::{Account, AccountRole, ClientMetadata};
    use uuid::Uuid;

    fn issuer() -> Arc<TokenIssuer> {
        Arc::new(TokenIssuer::new(
            JwtConfig {
                secret: "gate-test-secret-that-is-long-enough".to_string(),
                ..JwtConfig::default()
            },
            Arc::new(MockSessionLedger::new()),
        ))
    }

    fn account() -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            role: AccountRole::User,
            active: true,
            activated: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn ctx(method: &str) -> RequestContext {
        RequestContext::new(Operation::auth(method), ClientMetadata::default())
    }

    #[test]
    fn test_public_operation_needs_no_token() {
        let gate = AuthenticationGate::new(issuer());
        for method in DEFAULT_PUBLIC_METHODS {
            let admitted = gate.apply(ctx(method), &CallMetadata::default()).unwrap();
            assert!(admitted.is_public());
        }
    }

    #[test]
    fn test_protected_operation_without_token() {
        let gate = AuthenticationGate::new(issuer());
        let result = gate.apply(ctx("Logout"), &CallMetadata::default());
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }

    #[test]
    fn test_bearer_token_attaches_identity() {
        let tokens = issuer();
        let acc = account();
        let token = tokens.issue_access_token(&acc).unwrap();
        let gate = AuthenticationGate::new(tokens);

        let metadata = CallMetadata {
            authorization: Some(format!("Bearer {}", token)),
            ..CallMetadata::default()
        };
        let admitted = gate.apply(ctx("Logout"), &metadata).unwrap();

        let identity = admitted.identity().unwrap();
        assert_eq!(identity.account_id, acc.id);
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.role, AccountRole::User);
    }

    #[test]
    fn test_cookie_fallback() {
        let tokens = issuer();
        let token = tokens.issue_access_token(&account()).unwrap();
        let gate = AuthenticationGate::new(tokens);

        let metadata = CallMetadata {
            authorization: Some("Basic dXNlcjpwdw==".to_string()),
            cookies: vec![format!("access_token={}", token)],
            ..CallMetadata::default()
        };

        assert!(gate.apply(ctx("ChangePassword"), &metadata).is_ok());
    }

    #[test]
    fn test_invalid_token_is_unauthenticated() {
        let gate = AuthenticationGate::new(issuer());
        let metadata = CallMetadata {
            authorization: Some("Bearer not-a-token".to_string()),
            ..CallMetadata::default()
        };

        let result = gate.apply(ctx("Logout"), &metadata);
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }

    #[test]
    fn test_expired_token_is_unauthenticated() {
        let expired = TokenIssuer::new(
            JwtConfig {
                secret: "gate-test-secret-that-is-long-enough".to_string(),
                access_ttl_minutes: -5,
                ..JwtConfig::default()
            },
            Arc::new(MockSessionLedger::new()),
        );
        let token = expired.issue_access_token(&account()).unwrap();
        let gate = AuthenticationGate::new(issuer());

        let metadata = CallMetadata {
            authorization: Some(format!("Bearer {}", token)),
            ..CallMetadata::default()
        };

        let result = gate.apply(ctx("Logout"), &metadata);
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }

    #[test]
    fn test_custom_allowlist() {
        let gate = AuthenticationGate::with_public_operations(
            issuer(),
            [Operation::auth("Register"), Operation::auth("Login")],
        );

        assert!(gate.apply(ctx("Login"), &CallMetadata::default()).is_ok());
        assert!(gate.apply(ctx("Activate"), &CallMetadata::default()).is_err());
    }
}
