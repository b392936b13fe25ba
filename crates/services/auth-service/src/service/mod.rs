//! Identity business logic and token issuance.

mod identity_service;
mod token_issuer;

pub use identity_service::{IdentityManager, IdentityService, LoginOutcome, RefreshOutcome};
pub use token_issuer::{AccessClaims, IssuedTokens, RefreshClaims, TokenIssuer};
