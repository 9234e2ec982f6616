//! Framebuffer and camera stacks

use crate::resources::{CameraHandle, FramebufferHandle, RenderAssets};
use crate::scene::Camera;

/// One pushed render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FramebufferEntry {
    /// `None` is the window surface
    pub target: Option<FramebufferHandle>,
    /// Whether the push opened a debug group the pop has to close
    pub debug_group: bool,
}

#[derive(Debug, Default)]
pub(crate) struct FramebufferStack {
    entries: Vec<FramebufferEntry>,
}

impl FramebufferStack {
    pub fn push(&mut self, entry: FramebufferEntry) {
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Option<FramebufferEntry> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Topmost entry that is still bindable: the surface, or a framebuffer
    /// that resolves. Placeholders left by expired pushes are skipped.
    pub fn current_target(&self, assets: &RenderAssets) -> Option<FramebufferEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.target.map_or(true, |handle| assets.contains(handle)))
            .copied()
    }
}

#[derive(Debug, Default)]
pub(crate) struct CameraStack {
    entries: Vec<CameraHandle>,
}

impl CameraStack {
    pub fn push(&mut self, camera: CameraHandle) {
        self.entries.push(camera);
    }

    pub fn pop(&mut self) -> Option<CameraHandle> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Topmost camera that still resolves
    pub fn top<'r>(&self, assets: &'r RenderAssets) -> Option<&'r Camera> {
        self.entries
            .iter()
            .rev()
            .find_map(|handle| assets.resolve(*handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_current_target_skips_expired_entries() {
        let mut assets = RenderAssets::new();
        let mut backend = crate::backend::DummyBackend::default();
        let live = assets
            .create_framebuffer(
                &mut backend,
                crate::backend::FramebufferDescriptor::color_depth("live", 64, 64),
            )
            .unwrap();
        let dead = assets
            .create_framebuffer(
                &mut backend,
                crate::backend::FramebufferDescriptor::color_depth("dead", 64, 64),
            )
            .unwrap();
        assets.remove_framebuffer(&mut backend, dead);

        let mut stack = FramebufferStack::default();
        stack.push(FramebufferEntry { target: Some(live), debug_group: true });
        stack.push(FramebufferEntry { target: Some(dead), debug_group: false });

        assert_eq!(stack.current_target(&assets).and_then(|e| e.target), Some(live));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_camera_top_is_last_live_push() {
        let mut assets = RenderAssets::new();
        let first = assets.add_camera(Camera::new(Vec3::Z, Vec3::ZERO));
        let second = assets.add_camera(Camera::new(Vec3::X, Vec3::ZERO));

        let mut stack = CameraStack::default();
        stack.push(first);
        stack.push(second);
        assert_eq!(stack.top(&assets).map(|c| c.position), Some(Vec3::X));

        assets.remove_camera(second);
        assert_eq!(stack.top(&assets).map(|c| c.position), Some(Vec3::Z));
        assert_eq!(stack.pop(), Some(second));
        assert!(!stack.is_empty());
    }
}
