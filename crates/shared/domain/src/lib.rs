//! Domain layer - Core identity entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! Accounts, credentials, refresh sessions and audit entries are defined here
//! and shared by the persistence, service and transport layers.

pub mod account;
pub mod audit;
pub mod constants;
pub mod credential;
pub mod error;
pub mod password;
pub mod session;

pub use account::{Account, AccountRole, NewAccount};
pub use audit::{AuditEntry, ClientMetadata, Severity};
pub use constants::*;
pub use credential::Credential;
pub use error::{DomainError, DomainResult};
pub use password::{Password, WorkFactor};
pub use session::{NewSession, Session};
