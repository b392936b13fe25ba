//! Credential entity: a stored password hash owned by one account.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::password::Password;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: Uuid,
    pub account_id: Uuid,
    pub password_hash: String,
    /// At most one active credential exists per account
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    /// View the stored hash as a verifiable password.
    pub fn password(&self) -> Password {
        Password::from_hash(self.password_hash.as_str())
    }
}
