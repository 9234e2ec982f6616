//! State shared between the manager, passes and executing commands

use glam::{Mat4, Vec3};

use super::stack::{CameraStack, FramebufferEntry, FramebufferStack};
use super::{PassOutputs, RenderMode, RenderStats};
use crate::backend::{BufferId, ClearFlags, CompareFunction, GraphicsBackend, Viewport};
use crate::commands::ComputeDispatch;
use crate::pass::PassDescriptor;
use crate::resources::{CameraHandle, FramebufferHandle, MaterialHandle, RenderAssets};
use crate::scene::{Camera, DirectionalLight};
use crate::RendererConfig;

/// What commands may ask about the pass being rendered
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PassInfo {
    pub name: String,
    pub override_material: Option<MaterialHandle>,
    pub depth_compare: Option<CompareFunction>,
}

impl From<&PassDescriptor> for PassInfo {
    fn from(desc: &PassDescriptor) -> Self {
        Self {
            name: desc.name.clone(),
            override_material: desc.override_material,
            depth_compare: desc.depth_compare,
        }
    }
}

/// Render state owned by the manager.
///
/// Stacks are only changed while commands execute, so their effects stay in
/// submission order relative to draws.
pub(crate) struct RenderState {
    pub(crate) config: RendererConfig,
    pub(crate) framebuffers: FramebufferStack,
    pub(crate) cameras: CameraStack,
    pub(crate) outputs: PassOutputs,
    pub(crate) current_pass_index: usize,
    pub(crate) current: Option<PassInfo>,
    pub(crate) render_mode: RenderMode,
    pub(crate) light_space_matrix: Mat4,
    pub(crate) viewport: Viewport,
    pub(crate) scene_camera: Option<CameraHandle>,
    pub(crate) shadow_light: Option<DirectionalLight>,
    pub(crate) elapsed: f32,
    pub(crate) globals_buffer: BufferId,
    pub(crate) stats: RenderStats,
    /// Target of the last pass that ended, `None` for the surface
    pub(crate) last_framebuffer: Option<FramebufferHandle>,
    pub(crate) compute_queue: Vec<ComputeDispatch>,
    pub(crate) frame_index: u64,
}

impl RenderState {
    pub(crate) fn new(config: RendererConfig, globals_buffer: BufferId, viewport: Viewport) -> Self {
        Self {
            render_mode: config.render_mode,
            config,
            framebuffers: FramebufferStack::default(),
            cameras: CameraStack::default(),
            outputs: PassOutputs::new(),
            current_pass_index: 0,
            current: None,
            light_space_matrix: Mat4::IDENTITY,
            viewport,
            scene_camera: None,
            shadow_light: None,
            elapsed: 0.0,
            globals_buffer,
            stats: RenderStats::default(),
            last_framebuffer: None,
            compute_queue: Vec::new(),
            frame_index: 0,
        }
    }

    pub fn current_pass_name(&self) -> &str {
        self.current.as_ref().map_or("", |pass| pass.name.as_str())
    }

    pub fn current_pass_override_material(&self) -> Option<MaterialHandle> {
        self.current.as_ref().and_then(|pass| pass.override_material)
    }

    pub(crate) fn current_pass_depth_compare(&self) -> Option<CompareFunction> {
        self.current.as_ref().and_then(|pass| pass.depth_compare)
    }

    pub(crate) fn in_shadow_pass(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|pass| pass.name == self.config.shadow_pass_name)
    }

    /// Top of the camera stack, else the scene camera
    pub fn active_camera<'r>(&self, assets: &'r RenderAssets) -> Option<&'r Camera> {
        self.cameras
            .top(assets)
            .or_else(|| self.scene_camera.and_then(|camera| assets.resolve(camera)))
    }

    /// Push a render target and make it current.
    ///
    /// Returns `false` when the framebuffer has expired; a placeholder entry is
    /// still pushed so the matching pop stays balanced.
    pub(crate) fn push_framebuffer(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        assets: &RenderAssets,
        target: Option<FramebufferHandle>,
        name: &str,
        clear: bool,
    ) -> bool {
        let (framebuffer, viewport, clear_color) = match target {
            Some(handle) => match assets.resolve(handle) {
                Some(framebuffer) => (
                    Some(framebuffer.id()),
                    framebuffer.viewport(),
                    framebuffer.clear_color(),
                ),
                None => {
                    self.framebuffers.push(FramebufferEntry {
                        target,
                        debug_group: false,
                    });
                    return false;
                }
            },
            None => (
                None,
                surface_viewport(backend),
                self.config.clear_color,
            ),
        };

        let debug_group = self.config.debug_groups;
        if debug_group {
            backend.push_debug_group(name);
        }
        backend.bind_framebuffer(framebuffer);
        backend.set_viewport(viewport);
        self.viewport = viewport;
        if clear {
            backend.clear(clear_color, ClearFlags::COLOR | ClearFlags::DEPTH);
        }
        self.framebuffers.push(FramebufferEntry { target, debug_group });
        self.update_light_space(assets);
        true
    }

    /// Pop the current render target and rebind the one below it.
    pub(crate) fn pop_framebuffer(&mut self, backend: &mut dyn GraphicsBackend, assets: &RenderAssets) {
        debug_assert!(
            !self.framebuffers.is_empty(),
            "PopFramebuffer with an empty framebuffer stack"
        );
        let Some(entry) = self.framebuffers.pop() else {
            log::error!("PopFramebuffer with an empty framebuffer stack, binding the window surface");
            self.bind_surface(backend);
            return;
        };
        if entry.debug_group {
            backend.pop_debug_group();
        }

        let top = self
            .framebuffers
            .current_target(assets)
            .and_then(|entry| entry.target)
            .and_then(|handle| assets.resolve(handle));
        match top {
            Some(framebuffer) => {
                let viewport = framebuffer.viewport();
                backend.bind_framebuffer(Some(framebuffer.id()));
                backend.set_viewport(viewport);
                self.viewport = viewport;
            }
            None => self.bind_surface(backend),
        }
    }

    /// Push a camera. Returns `false` when it has expired; the placeholder
    /// stays on the stack but is never active.
    pub(crate) fn push_camera(&mut self, assets: &RenderAssets, camera: CameraHandle) -> bool {
        self.cameras.push(camera);
        assets.contains(camera)
    }

    pub(crate) fn pop_camera(&mut self) {
        debug_assert!(!self.cameras.is_empty(), "PopCamera with an empty camera stack");
        if self.cameras.pop().is_none() {
            log::error!("PopCamera with an empty camera stack, using the scene camera");
        }
    }

    fn bind_surface(&mut self, backend: &mut dyn GraphicsBackend) {
        let viewport = surface_viewport(backend);
        backend.bind_framebuffer(None);
        backend.set_viewport(viewport);
        self.viewport = viewport;
    }

    /// Aim the shadow volume at what the active camera looks at
    fn update_light_space(&mut self, assets: &RenderAssets) {
        let Some(light) = self.shadow_light else {
            return;
        };
        let focus = self
            .active_camera(assets)
            .map_or(Vec3::ZERO, |camera| camera.target);
        self.light_space_matrix = light.light_space_matrix(focus);
        self.stats.light_space_updates += 1;
    }
}

fn surface_viewport(backend: &dyn GraphicsBackend) -> Viewport {
    let (width, height) = backend.surface_size();
    Viewport::from_size(width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BufferId, DummyBackend, FramebufferDescriptor};

    fn state(backend: &DummyBackend) -> RenderState {
        let (width, height) = backend.surface_size();
        RenderState::new(
            RendererConfig::default(),
            BufferId(0),
            Viewport::from_size(width, height),
        )
    }

    #[test]
    fn test_pop_restores_previous_viewport() {
        let mut backend = DummyBackend::new(800, 600);
        let mut assets = RenderAssets::new();
        let small = assets
            .create_framebuffer(&mut backend, FramebufferDescriptor::color_depth("small", 64, 32))
            .unwrap();
        let mut state = state(&backend);

        assert!(state.push_framebuffer(&mut backend, &assets, None, "Surface", true));
        assert!(state.push_framebuffer(&mut backend, &assets, Some(small), "Small", true));
        assert_eq!(backend.viewport(), Viewport::from_size(64, 32));

        state.pop_framebuffer(&mut backend, &assets);
        assert_eq!(backend.viewport(), Viewport::from_size(800, 600));
        assert_eq!(backend.bound_framebuffer(), None);
        assert_eq!(state.framebuffers.len(), 1);
        assert_eq!(backend.debug_group_depth(), 1);
    }

    #[test]
    fn test_expired_push_leaves_placeholder_without_backend_calls() {
        let mut backend = DummyBackend::default();
        let mut assets = RenderAssets::new();
        let framebuffer = assets
            .create_framebuffer(&mut backend, FramebufferDescriptor::color_depth("gone", 8, 8))
            .unwrap();
        assets.remove_framebuffer(&mut backend, framebuffer);
        backend.clear_calls();

        let mut state = state(&backend);
        assert!(!state.push_framebuffer(&mut backend, &assets, Some(framebuffer), "Gone", true));
        assert_eq!(backend.render_call_count(), 0);
        assert_eq!(state.framebuffers.len(), 1);

        state.pop_framebuffer(&mut backend, &assets);
        assert!(state.framebuffers.is_empty());
        assert_eq!(backend.debug_group_depth(), 0);
    }

    #[test]
    fn test_light_space_updates_once_per_push() {
        let mut backend = DummyBackend::default();
        let assets = RenderAssets::new();
        let mut state = state(&backend);
        state.shadow_light = Some(DirectionalLight::default());

        state.push_framebuffer(&mut backend, &assets, None, "Main", false);
        assert_eq!(state.stats.light_space_updates, 1);
        assert_ne!(state.light_space_matrix, Mat4::IDENTITY);
    }

    #[test]
    fn test_current_pass_name_empty_outside_passes() {
        let backend = DummyBackend::default();
        let mut state = state(&backend);
        assert_eq!(state.current_pass_name(), "");
        assert!(!state.in_shadow_pass());

        state.current = Some(PassInfo {
            name: "ShadowDepthPass".to_string(),
            override_material: None,
            depth_compare: None,
        });
        assert!(state.in_shadow_pass());
    }
}
