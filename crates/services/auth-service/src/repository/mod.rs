//! Repository layer for data access.
//!
//! Each repository exposes an `async_trait` for injection plus a SeaORM
//! store. The query functions are generic over `ConnectionTrait` so the
//! transactional repositories in `infra::unit_of_work` run the same SQL.

mod account_repository;
mod audit_repository;
mod credential_repository;
pub mod entities;
mod session_repository;

pub use account_repository::{AccountRepository, AccountStore};
pub use audit_repository::{AuditLogStore, AuditSink};
pub use credential_repository::{CredentialRepository, CredentialStore};
pub use session_repository::{SessionLedger, SessionStore};

pub(crate) use account_repository::queries as account_queries;
pub(crate) use credential_repository::queries as credential_queries;

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use account_repository::MockAccountRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use audit_repository::MockAuditSink;
#[cfg(any(test, feature = "test-utils"))]
pub use credential_repository::MockCredentialRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use session_repository::MockSessionLedger;
