//! Account domain entity and role enumeration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{MAX_USERNAME_LENGTH, ROLE_ADMIN, ROLE_SUPER_ADMIN, ROLE_USER};
use crate::error::{DomainError, DomainResult};

/// Account roles enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountRole {
    User,
    Admin,
    SuperAdmin,
}

impl AccountRole {
    /// Wire/storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::User => ROLE_USER,
            AccountRole::Admin => ROLE_ADMIN,
            AccountRole::SuperAdmin => ROLE_SUPER_ADMIN,
        }
    }
}

impl std::str::FromStr for AccountRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_USER => Ok(AccountRole::User),
            ROLE_ADMIN => Ok(AccountRole::Admin),
            ROLE_SUPER_ADMIN => Ok(AccountRole::SuperAdmin),
            other => Err(DomainError::validation(format!("Unknown role: {}", other))),
        }
    }
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account domain entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub role: AccountRole,
    /// Enabled/disabled switch
    pub active: bool,
    /// Set once by activation; gates login
    pub activated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether this account may log in.
    pub fn can_login(&self) -> bool {
        self.active && self.activated
    }

    /// Mark the account activated. Calling this on an activated account only
    /// bumps `updated_at`.
    pub fn activate(&mut self) {
        self.activated = true;
        self.updated_at = Utc::now();
    }
}

/// Validated registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub role: AccountRole,
}

impl NewAccount {
    /// Validate raw registration fields.
    pub fn parse(username: &str, role: &str) -> DomainResult<Self> {
        if username.is_empty() {
            return Err(DomainError::validation("Username must not be empty"));
        }
        if username.chars().count() > MAX_USERNAME_LENGTH {
            return Err(DomainError::validation(format!(
                "Username must be at most {} characters",
                MAX_USERNAME_LENGTH
            )));
        }

        Ok(Self {
            username: username.to_string(),
            role: role.parse()?,
        })
    }
}
