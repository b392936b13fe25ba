//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod account;
pub mod credential;
pub mod login_log;
pub mod session;
