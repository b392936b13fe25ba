//! Refresh session entity.
//!
//! A session backs one refresh token. It only ever transitions from valid to
//! revoked and is never deleted.

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    pub account_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// A session is valid iff it is not revoked and `now < expires_at`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }
}

/// Data needed to open a new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub account_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
