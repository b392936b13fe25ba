//! Login audit records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit severity, stored as its lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
    Success,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Success => "success",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller details captured from request metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub account_id: Option<Uuid>,
    pub message: String,
    pub severity: Severity,
    pub client: ClientMetadata,
}

impl AuditEntry {
    pub fn new(
        account_id: Option<Uuid>,
        message: impl Into<String>,
        severity: Severity,
        client: ClientMetadata,
    ) -> Self {
        Self {
            account_id,
            message: message.into(),
            severity,
            client,
        }
    }
}
