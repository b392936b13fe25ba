//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// Account Roles
// =============================================================================

/// Default role for self-registered accounts
pub const ROLE_USER: &str = "user";

/// Administrator role
pub const ROLE_ADMIN: &str = "admin";

/// Super administrator role
pub const ROLE_SUPER_ADMIN: &str = "super-admin";

/// All valid role values
pub const VALID_ROLES: &[&str] = &[ROLE_USER, ROLE_ADMIN, ROLE_SUPER_ADMIN];

/// Check if a role value is valid
pub fn is_valid_role(role: &str) -> bool {
    VALID_ROLES.contains(&role)
}

// =============================================================================
// Validation
// =============================================================================

/// Maximum username length (matches the `accounts.username` column width)
pub const MAX_USERNAME_LENGTH: usize = 150;

// =============================================================================
// Authentication
// =============================================================================

/// Default access token lifetime in minutes
pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

/// Default refresh token lifetime in hours (7 days)
pub const DEFAULT_REFRESH_TOKEN_TTL_HOURS: i64 = 7 * 24;

/// Default `iss` claim
pub const DEFAULT_TOKEN_ISSUER: &str = "auth-service";

/// Minimum JWT secret length (security requirement)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Authorization scheme for Bearer tokens (compared case-insensitively)
pub const BEARER_SCHEME: &str = "bearer";

// =============================================================================
// Token cookies
// =============================================================================

/// Cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Cookie carrying the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Path scope of the access token cookie
pub const ACCESS_TOKEN_COOKIE_PATH: &str = "/";

/// Path scope of the refresh token cookie
pub const REFRESH_TOKEN_COOKIE_PATH: &str = "/auth/refresh";

// =============================================================================
// Audit messages
// =============================================================================

/// Audit message written when a login names an unknown username
pub const AUDIT_INVALID_USERNAME: &str = "Invalid username";

/// Audit message written on successful login
pub const AUDIT_LOGIN_SUCCESSFUL: &str = "Login successful";
