//! Per-call admission: authentication then authorization.
//!
//! The transport adapter turns incoming metadata into a `CallMetadata`, runs
//! the `Pipeline`, and hands the resulting `RequestContext` to the handler.

mod authenticate;
mod authorize;
mod context;
mod pipeline;

pub use authenticate::{AuthenticationGate, DEFAULT_PUBLIC_METHODS};
pub use authorize::{AuthorizationGate, RolePolicy};
pub use context::{Access, CallMetadata, Identity, Operation, RequestContext};
pub use pipeline::{Pipeline, Stage};
