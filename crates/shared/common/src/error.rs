//! Unified error handling for the identity services.
//!
//! Every `AppError` belongs to exactly one `ErrorKind`. The kind is what
//! callers see: it is mapped once, at the transport boundary, to a tonic
//! `Status` code. Details of internal failures are logged and never returned.

use domain::DomainError;
use thiserror::Error;
use tonic::{Code, Status};

/// Closed set of error classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AlreadyExists,
    NotFound,
    InvalidCredentials,
    UserInactive,
    Unauthenticated,
    PermissionDenied,
    InvalidArgument,
    Internal,
}

impl ErrorKind {
    /// gRPC status code for this kind.
    ///
    /// Credential failures and inactive accounts share `Unauthenticated` with
    /// token failures so a caller cannot probe which usernames exist.
    pub fn grpc_code(&self) -> Code {
        match self {
            ErrorKind::AlreadyExists => Code::AlreadyExists,
            ErrorKind::NotFound => Code::NotFound,
            ErrorKind::InvalidCredentials
            | ErrorKind::UserInactive
            | ErrorKind::Unauthenticated => Code::Unauthenticated,
            ErrorKind::PermissionDenied => Code::PermissionDenied,
            ErrorKind::InvalidArgument => Code::InvalidArgument,
            ErrorKind::Internal => Code::Internal,
        }
    }
}

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Access denied")]
    PermissionDenied,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User is inactive")]
    UserInactive,

    #[error("Invalid or expired token")]
    TokenInvalid,

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    #[error("{0} already exists")]
    AlreadyExists(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    // External service errors
    #[cfg(feature = "database")]
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[cfg(feature = "jwt")]
    #[error("Token signing error")]
    Signing(jsonwebtoken::errors::Error),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Error class exposed to callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Unauthenticated | AppError::TokenInvalid => ErrorKind::Unauthenticated,
            AppError::PermissionDenied => ErrorKind::PermissionDenied,
            AppError::InvalidCredentials => ErrorKind::InvalidCredentials,
            AppError::UserInactive => ErrorKind::UserInactive,
            AppError::NotFound => ErrorKind::NotFound,
            AppError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            AppError::Validation(_) => ErrorKind::InvalidArgument,
            #[cfg(feature = "database")]
            AppError::Database(_) => ErrorKind::Internal,
            #[cfg(feature = "jwt")]
            AppError::Signing(_) => ErrorKind::Internal,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),

            // Inactive accounts must read like a bad password
            AppError::InvalidCredentials | AppError::UserInactive => {
                AppError::InvalidCredentials.to_string()
            }

            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            #[cfg(feature = "jwt")]
            AppError::Signing(e) => {
                tracing::error!("Token signing error: {:?}", e);
                "An internal error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            _ => self.to_string(),
        }
    }
}

// =============================================================================
// gRPC Status (Tonic)
// =============================================================================

impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        Status::new(err.kind().grpc_code(), err.user_message())
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::Password(msg) | DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn already_exists(entity: impl Into<String>) -> Self {
        AppError::AlreadyExists(entity.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
