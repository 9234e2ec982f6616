//! Compute dispatch pass

use super::COMPUTE_PASS;
use crate::commands::ComputeDispatch;
use crate::pass::{PassContext, PassDescriptor, RenderPass};

/// Dispatches compute work instead of drawing.
///
/// Uses the default begin and end; its target is never cleared.
///
/// Runs its recurring dispatches every frame, followed by whatever was queued
/// with [`RenderManager::queue_compute`](crate::RenderManager::queue_compute)
/// since the last compute pass.
pub struct ComputePass {
    desc: PassDescriptor,
    recurring: Vec<ComputeDispatch>,
}

impl ComputePass {
    pub fn new() -> Self {
        Self {
            desc: PassDescriptor::new(COMPUTE_PASS).with_clear(false),
            recurring: Vec::new(),
        }
    }

    /// Dispatch `dispatch` every frame
    pub fn with_dispatch(mut self, dispatch: ComputeDispatch) -> Self {
        self.recurring.push(dispatch);
        self
    }

    pub fn recurring(&self) -> &[ComputeDispatch] {
        &self.recurring
    }
}

impl Default for ComputePass {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPass for ComputePass {
    fn descriptor(&self) -> &PassDescriptor {
        &self.desc
    }

    fn descriptor_mut(&mut self) -> &mut PassDescriptor {
        &mut self.desc
    }

    fn render(&mut self, ctx: &mut PassContext<'_>) {
        for dispatch in &self.recurring {
            ctx.submit(dispatch.clone());
        }
        for dispatch in ctx.take_compute_work() {
            ctx.submit(dispatch);
        }
    }
}
