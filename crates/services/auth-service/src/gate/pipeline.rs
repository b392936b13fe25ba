//! Ordered admission stages run before every handler.

use std::sync::Arc;

use tracing::debug;

use super::context::{CallMetadata, Operation, RequestContext};
use common::AppResult;

/// One admission step. Stages do no I/O.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, ctx: RequestContext, metadata: &CallMetadata) -> AppResult<RequestContext>;
}

/// Stages applied in order; the first failure rejects the call.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Run every stage for a call to `operation`.
    pub fn admit(&self, operation: Operation, metadata: &CallMetadata) -> AppResult<RequestContext> {
        let mut ctx = RequestContext::new(operation, metadata.client.clone());

        for stage in &self.stages {
            ctx = stage.apply(ctx, metadata).map_err(|e| {
                debug!(stage = stage.name(), "Call rejected: {}", e);
                e
            })?;
        }

        Ok(ctx)
    }
}
