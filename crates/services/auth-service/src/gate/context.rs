//! Request-scoped values shared by the gates and handlers.

use uuid::Uuid;

use crate::service::AccessClaims;
use domain::{AccountRole, ClientMetadata, BEARER_SCHEME};

/// Fully qualified RPC name, e.g. `/auth.AuthService/Login`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operation(String);

impl Operation {
    pub const AUTH_SERVICE: &'static str = "auth.AuthService";

    pub fn new(service: &str, method: &str) -> Self {
        Self(format!("/{}/{}", service, method))
    }

    /// Operation on `auth.AuthService`.
    pub fn auth(method: &str) -> Self {
        Self::new(Self::AUTH_SERVICE, method)
    }

    pub fn full_name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated caller, taken from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub account_id: Uuid,
    pub username: String,
    pub role: AccountRole,
}

impl From<AccessClaims> for Identity {
    fn from(claims: AccessClaims) -> Self {
        Self {
            account_id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

/// How far the call got through authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// No stage has looked at the call yet
    Anonymous,
    /// Operation is on the public allowlist
    Public,
    Authenticated(Identity),
}

/// Per-call context produced by the pipeline.
///
/// Stages return a new context; handlers only ever read it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    operation: Operation,
    access: Access,
    client: ClientMetadata,
}

impl RequestContext {
    pub fn new(operation: Operation, client: ClientMetadata) -> Self {
        Self {
            operation,
            access: Access::Anonymous,
            client,
        }
    }

    pub(crate) fn with_access(self, access: Access) -> Self {
        Self { access, ..self }
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn access(&self) -> &Access {
        &self.access
    }

    pub fn client(&self) -> &ClientMetadata {
        &self.client
    }

    pub fn is_public(&self) -> bool {
        matches!(self.access, Access::Public)
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.access {
            Access::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Transport-neutral view of the inbound call metadata.
#[derive(Debug, Clone, Default)]
pub struct CallMetadata {
    /// Raw `authorization` value, if any
    pub authorization: Option<String>,
    /// Every raw `cookie` value, in arrival order
    pub cookies: Vec<String>,
    pub client: ClientMetadata,
}

impl CallMetadata {
    /// Token from `authorization: Bearer <token>`; the scheme is case-insensitive.
    pub fn bearer_token(&self) -> Option<&str> {
        let header = self.authorization.as_deref()?;
        let (scheme, token) = header.split_once(' ')?;
        let token = token.trim();

        (scheme.eq_ignore_ascii_case(BEARER_SCHEME) && !token.is_empty()).then_some(token)
    }

    /// First non-empty value of the named cookie.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, value)| *key == name && !value.is_empty())
            .map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_auth(value: &str) -> CallMetadata {
        CallMetadata {
            authorization: Some(value.to_string()),
            ..CallMetadata::default()
        }
    }

    #[test]
    fn test_operation_full_name() {
        assert_eq!(Operation::auth("Login").full_name(), "/auth.AuthService/Login");
    }

    #[test]
    fn test_bearer_scheme_is_case_insensitive() {
        assert_eq!(with_auth("Bearer abc").bearer_token(), Some("abc"));
        assert_eq!(with_auth("bearer abc").bearer_token(), Some("abc"));
        assert_eq!(with_auth("BEARER abc").bearer_token(), Some("abc"));
    }

    #[test]
    fn test_malformed_authorization_ignored() {
        assert_eq!(with_auth("Basic abc").bearer_token(), None);
        assert_eq!(with_auth("Bearer").bearer_token(), None);
        assert_eq!(with_auth("Bearer ").bearer_token(), None);
        assert_eq!(CallMetadata::default().bearer_token(), None);
    }

    #[test]
    fn test_cookie_lookup() {
        let metadata = CallMetadata {
            cookies: vec![
                "theme=dark; access_token=".to_string(),
                "session=1; access_token=tok; refresh_token=ref".to_string(),
            ],
            ..CallMetadata::default()
        };

        assert_eq!(metadata.cookie("access_token"), Some("tok"));
        assert_eq!(metadata.cookie("refresh_token"), Some("ref"));
        assert_eq!(metadata.cookie("missing"), None);
    }

    #[test]
    fn test_context_starts_anonymous() {
        let ctx = RequestContext::new(Operation::auth("Logout"), ClientMetadata::default());
        assert_eq!(ctx.access(), &Access::Anonymous);
        assert!(ctx.identity().is_none());
        assert!(!ctx.is_public());
    }
}
