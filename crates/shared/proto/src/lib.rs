//! gRPC protocol buffer definitions.
//!
//! This crate contains the generated gRPC service definitions for
//! AuthService: registration, activation, login, token refresh, logout and
//! password change.

/// Authentication service definitions.
pub mod auth {
    tonic::include_proto!("auth");
}

// Re-export commonly used items
pub use auth::auth_service_client::AuthServiceClient;
pub use auth::auth_service_server::{AuthService, AuthServiceServer};
