//! Debug line drawing
//!
//! Lines are collected during the frame and submitted after the passes ran,
//! so they land on top of whatever the last pass rendered. A line without a
//! duration lives for one frame; a timed line is redrawn until its duration
//! runs out.

use glam::{Mat4, Vec3, Vec4};

use crate::backend::{BackendResult, GraphicsBackend};
use crate::commands::DrawLines;
use crate::manager::RenderManager;
use crate::resources::{MaterialHandle, Mesh, RenderAssets, VertexArrayHandle};
use crate::scene::Transform;

#[derive(Debug, Clone, Copy)]
struct DebugLine {
    transform: Mat4,
    color: Vec4,
    /// Seconds left, `None` for single-frame lines
    remaining: Option<f32>,
}

pub struct DebugLines {
    vertex_array: VertexArrayHandle,
    material: MaterialHandle,
    lines: Vec<DebugLine>,
}

impl DebugLines {
    /// Upload the unit line mesh and draw every line through `material`
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        assets: &mut RenderAssets,
        material: MaterialHandle,
    ) -> BackendResult<Self> {
        let vertex_array = assets.create_vertex_array(backend, &Mesh::line())?;
        Ok(Self::with_handles(vertex_array, material))
    }

    pub fn with_handles(vertex_array: VertexArrayHandle, material: MaterialHandle) -> Self {
        Self {
            vertex_array,
            material,
            lines: Vec::new(),
        }
    }

    pub fn draw_line(&mut self, start: Vec3, end: Vec3, color: Vec4, duration: Option<f32>) {
        self.lines.push(DebugLine {
            transform: Transform::segment(start, end).matrix(),
            color,
            remaining: duration,
        });
    }

    /// Submit every live line to `manager` and age the timed ones by `delta`.
    pub fn submit(&mut self, manager: &mut RenderManager, delta: f32) {
        let mut submitted = 0;
        self.lines.retain_mut(|line| {
            if let Some(remaining) = line.remaining.as_mut() {
                if *remaining <= 0.0 {
                    return false;
                }
                *remaining -= delta;
            }

            manager.submit(
                DrawLines::new(self.vertex_array, self.material)
                    .with_transform(line.transform)
                    .with_color(line.color),
            );
            submitted += 1;
            line.remaining.is_some()
        });
        log::trace!("Submitted {} debug lines", submitted);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::RendererConfig;

    fn setup() -> (DummyBackend, RenderManager, DebugLines) {
        let mut backend = DummyBackend::default();
        let manager = RenderManager::new(&mut backend, RendererConfig::default()).unwrap();
        let lines = DebugLines::with_handles(VertexArrayHandle::default(), MaterialHandle::default());
        (backend, manager, lines)
    }

    #[test]
    fn test_single_frame_line_dropped_after_submit() {
        let (_backend, mut manager, mut lines) = setup();
        lines.draw_line(Vec3::ZERO, Vec3::X, Vec4::ONE, None);

        lines.submit(&mut manager, 0.016);
        assert_eq!(manager.pending_commands(), 1);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_timed_line_expires() {
        let (_backend, mut manager, mut lines) = setup();
        lines.draw_line(Vec3::ZERO, Vec3::Y, Vec4::ONE, Some(0.25));

        lines.submit(&mut manager, 0.2);
        lines.submit(&mut manager, 0.2);
        assert_eq!(manager.pending_commands(), 2);
        assert_eq!(lines.len(), 1);

        lines.submit(&mut manager, 0.2);
        assert_eq!(manager.pending_commands(), 2);
        assert!(lines.is_empty());
    }
}
