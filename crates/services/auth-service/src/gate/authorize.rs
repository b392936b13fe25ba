//! Authorization gate over an externally supplied role policy.

use std::collections::{HashMap, HashSet};

use super::context::{CallMetadata, Operation, RequestContext};
use super::pipeline::Stage;
use common::{AppError, AppResult};
use domain::AccountRole;

/// Roles allowed per operation.
///
/// Operations without an entry admit any authenticated role.
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    required: HashMap<Operation, HashSet<AccountRole>>,
}

impl RolePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `operation` to `roles`.
    pub fn require(
        mut self,
        operation: Operation,
        roles: impl IntoIterator<Item = AccountRole>,
    ) -> Self {
        self.required
            .entry(operation)
            .or_default()
            .extend(roles);
        self
    }

    pub fn allows(&self, operation: &Operation, role: AccountRole) -> bool {
        self.required
            .get(operation)
            .map_or(true, |roles| roles.contains(&role))
    }
}

pub struct AuthorizationGate {
    policy: RolePolicy,
}

impl AuthorizationGate {
    pub fn new(policy: RolePolicy) -> Self {
        Self { policy }
    }
}

impl Stage for AuthorizationGate {
    fn name(&self) -> &'static str {
        "authorize"
    }

    fn apply(&self, ctx: RequestContext, _metadata: &CallMetadata) -> AppResult<RequestContext> {
        if ctx.is_public() {
            return Ok(ctx);
        }

        let role = ctx.identity().map(|identity| identity.role);
        match role {
            Some(role) if self.policy.allows(ctx.operation(), role) => Ok(ctx),
            _ => Err(AppError::PermissionDenied),
        }
    }
}
