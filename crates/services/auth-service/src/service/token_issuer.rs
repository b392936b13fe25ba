//! Token issuer - signed access tokens and refresh sessions.
//!
//! Access tokens are short-lived HS256 JWTs verified without I/O. Refresh
//! tokens are also signed, but carry only a random `jti` and are otherwise
//! treated as opaque strings: their validity lives in the session ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::SessionLedger;
use common::{AppError, AppResult, JwtConfig};
use domain::{Account, AccountRole, NewSession};

/// Access token claims payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub username: String,
    pub role: AccountRole,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Refresh token claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub jti: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Tokens minted by a successful login.
#[derive(Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for IssuedTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish()
    }
}

pub struct TokenIssuer {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    sessions: Arc<dyn SessionLedger>,
}

impl TokenIssuer {
    pub fn new(config: JwtConfig, sessions: Arc<dyn SessionLedger>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_bytes()),
            validation,
            config,
            sessions,
        }
    }

    /// Mint an access/refresh pair and record the refresh session.
    pub async fn issue_tokens(&self, account: &Account) -> AppResult<IssuedTokens> {
        let now = Utc::now();
        let access_token = self.sign_access(account, now)?;

        let refresh_expires_at = now + self.config.refresh_ttl();
        let refresh_claims = RefreshClaims {
            jti: Uuid::new_v4(),
            iss: self.config.issuer.clone(),
            iat: now.timestamp(),
            exp: refresh_expires_at.timestamp(),
        };
        let refresh_token = self.sign(&refresh_claims)?;

        self.sessions
            .create(NewSession {
                account_id: account.id,
                token: refresh_token.clone(),
                expires_at: refresh_expires_at,
            })
            .await?;

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            refresh_expires_at,
        })
    }

    /// Mint an access token only. No session is recorded.
    pub fn issue_access_token(&self, account: &Account) -> AppResult<String> {
        self.sign_access(account, Utc::now())
    }

    /// Verify signature, algorithm, issuer and expiry of an access token.
    pub fn verify_access_token(&self, token: &str) -> AppResult<AccessClaims> {
        let claims = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!("Access token rejected: {}", e);
                AppError::TokenInvalid
            })?
            .claims;

        // The library accepts exp == now; a token is dead at its expiry instant
        if claims.exp <= Utc::now().timestamp() {
            return Err(AppError::TokenInvalid);
        }

        Ok(claims)
    }

    fn sign_access(&self, account: &Account, now: DateTime<Utc>) -> AppResult<String> {
        let claims = AccessClaims {
            sub: account.id,
            username: account.username.clone(),
            role: account.role,
            iss: self.config.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.config.access_ttl()).timestamp(),
        };
        self.sign(&claims)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(AppError::Signing)
    }
}
