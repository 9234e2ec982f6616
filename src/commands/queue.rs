//! FIFO queue of pending render commands

use std::collections::VecDeque;

use super::{ExecuteContext, RenderCommand};
use crate::backend::GraphicsBackend;
use crate::manager::RenderState;
use crate::resources::RenderAssets;

/// Ordered buffer of commands waiting to be executed.
#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: VecDeque<RenderCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a command and append it
    pub fn submit(&mut self, command: impl Into<RenderCommand>) {
        self.commands.push_back(command.into());
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop every pending command without executing it; returns how many
    /// were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.commands.len();
        self.commands.clear();
        dropped
    }

    pub(crate) fn pop(&mut self) -> Option<RenderCommand> {
        self.commands.pop_front()
    }
}

/// Execute every queued command in FIFO order.
///
/// Each command is removed before it runs, so commands it submits land at the
/// tail and run after everything that was already queued.
pub(crate) fn flush_queue(
    queue: &mut CommandQueue,
    state: &mut RenderState,
    backend: &mut dyn GraphicsBackend,
    assets: &RenderAssets,
) -> usize {
    let mut executed = 0;
    while let Some(command) = queue.pop() {
        log::trace!("executing {:?}", command);
        let mut ctx = ExecuteContext {
            backend: &mut *backend,
            assets,
            state: &mut *state,
            queue: &mut *queue,
        };
        command.execute(&mut ctx);
        executed += 1;
    }
    state.stats.commands_executed += executed;
    executed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CustomCommand;

    #[test]
    fn test_clear_drops_without_executing() {
        let mut queue = CommandQueue::new();
        queue.submit(RenderCommand::UpdateGlobals);
        queue.submit(RenderCommand::PopCamera);
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_submit_converts_variants() {
        let mut queue = CommandQueue::new();
        queue.submit(CustomCommand::new(|_| {}));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().map(|c| c.name()), Some("Custom"));
    }
}
