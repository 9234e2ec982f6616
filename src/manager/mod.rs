//! Render manager: pass list, command queue and per-frame loop

mod outputs;
mod stack;
mod state;

pub use outputs::PassOutputs;
pub(crate) use state::{PassInfo, RenderState};

use crate::backend::{
    BackendResult, BlendState, BufferDescriptor, BufferUsage, GlobalUniforms, GraphicsBackend,
    TextureId, Viewport, GLOBALS_BINDING,
};
use crate::commands::{flush_queue, CommandQueue, ComputeDispatch, RenderCommand};
use crate::pass::{PassContext, PassInjectionPoint, RenderPass};
use crate::pipeline::UiLayer;
use crate::resources::{MaterialHandle, RenderAssets};
use crate::scene::{Camera, SceneSource};
use crate::RendererConfig;

/// Global shading mode, uploaded with the per-pass globals
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    #[default]
    Normal = 0,
    Wireframe = 1,
    Overdraw = 2,
}

/// Counters for the current frame, reset by [`RenderManager::begin_frame`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub commands_executed: usize,
    pub draw_calls: usize,
    pub dispatches: usize,
    /// Commands skipped because a handle had expired
    pub expired_resources: usize,
    pub light_space_updates: usize,
    pub passes_rendered: usize,
}

/// Owns the ordered passes and drives them once per frame.
///
/// Frame loop:
/// 1. [`begin_frame`](Self::begin_frame)
/// 2. [`render_passes`](Self::render_passes): per pass begin, `UpdateGlobals`,
///    render, end (which flushes)
/// 3. out-of-pass submissions such as debug lines
/// 4. [`end_frame`](Self::end_frame): flush and present
pub struct RenderManager {
    queue: CommandQueue,
    state: RenderState,
    passes: Vec<Box<dyn RenderPass>>,
    injection_allowed: bool,
}

impl RenderManager {
    /// Create the manager and put the backend in its initial render state.
    pub fn new(backend: &mut dyn GraphicsBackend, config: RendererConfig) -> BackendResult<Self> {
        let globals_buffer = backend.create_buffer(&BufferDescriptor {
            label: Some("globals".to_string()),
            size: std::mem::size_of::<GlobalUniforms>() as u64,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        })?;
        backend.bind_uniform_buffer(GLOBALS_BINDING, globals_buffer);

        let (width, height) = backend.surface_size();
        let viewport = Viewport::from_size(width, height);
        backend.set_viewport(viewport);
        backend.set_depth_test(true);
        backend.set_depth_compare(config.depth_compare);
        backend.set_blend_state(config.blending.then(BlendState::alpha_blending));

        log::info!(
            "Render manager created on '{}' ({}x{})",
            backend.name(),
            width,
            height
        );

        Ok(Self {
            queue: CommandQueue::new(),
            state: RenderState::new(config, globals_buffer, viewport),
            passes: Vec::new(),
            injection_allowed: true,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.state.config
    }

    // Queue

    pub fn submit(&mut self, command: impl Into<RenderCommand>) {
        self.queue.submit(command);
    }

    /// Execute every pending command in submission order
    pub fn flush(&mut self, backend: &mut dyn GraphicsBackend, assets: &RenderAssets) -> usize {
        flush_queue(&mut self.queue, &mut self.state, backend, assets)
    }

    /// Drop pending commands without executing them
    pub fn clear(&mut self) -> usize {
        self.queue.clear()
    }

    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    // Pass list

    /// Insert a pass at `index`, or append it when `index` is `None`.
    ///
    /// Fails while a frame is in flight or when `index` is past the end.
    pub fn inject_pass(&mut self, pass: Box<dyn RenderPass>, index: Option<usize>) -> bool {
        if !self.injection_allowed {
            log::warn!(
                "Cannot inject pass '{}' while a frame is rendering",
                pass.name()
            );
            return false;
        }

        let index = index.unwrap_or(self.passes.len());
        if index > self.passes.len() {
            log::warn!(
                "Cannot inject pass '{}' at {}: only {} passes",
                pass.name(),
                index,
                self.passes.len()
            );
            return false;
        }

        log::debug!("Injecting pass '{}' at {}", pass.name(), index);
        self.passes.insert(index, pass);
        true
    }

    /// Insert a pass in front of the default pass `point` names, or at the
    /// point's default index when that pass is not in the list
    pub fn inject_pass_at(&mut self, pass: Box<dyn RenderPass>, point: PassInjectionPoint) -> bool {
        let anchor = point.anchor(&self.state.config);
        let index = self
            .passes
            .iter()
            .position(|existing| existing.name() == anchor)
            .unwrap_or_else(|| point.index().min(self.passes.len()));
        self.inject_pass(pass, Some(index))
    }

    /// Remove and return the pass at `index`.
    pub fn remove_pass(&mut self, index: usize) -> Option<Box<dyn RenderPass>> {
        if !self.injection_allowed {
            log::warn!("Cannot remove pass {} while a frame is rendering", index);
            return None;
        }
        if index >= self.passes.len() {
            log::warn!(
                "Cannot remove pass {}: only {} passes",
                index,
                self.passes.len()
            );
            return None;
        }

        let pass = self.passes.remove(index);
        log::debug!("Removed pass '{}'", pass.name());
        Some(pass)
    }

    pub fn remove_pass_at(&mut self, index: usize) -> bool {
        self.remove_pass(index).is_some()
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    pub fn pass(&self, index: usize) -> Option<&dyn RenderPass> {
        self.passes.get(index).map(|pass| pass.as_ref())
    }

    pub fn pass_mut(&mut self, index: usize) -> Option<&mut (dyn RenderPass + 'static)> {
        self.passes.get_mut(index).map(|pass| pass.as_mut())
    }

    pub fn injection_allowed(&self) -> bool {
        self.injection_allowed
    }

    // Introspection

    /// Name of the pass being rendered, empty outside passes
    pub fn current_pass_name(&self) -> &str {
        self.state.current_pass_name()
    }

    pub fn current_pass_override_material(&self) -> Option<MaterialHandle> {
        self.state.current_pass_override_material()
    }

    pub fn current_pass_index(&self) -> usize {
        self.state.current_pass_index
    }

    pub fn active_camera<'r>(&self, assets: &'r RenderAssets) -> Option<&'r Camera> {
        self.state.active_camera(assets)
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.state.render_mode = mode;
    }

    pub fn render_mode(&self) -> RenderMode {
        self.state.render_mode
    }

    pub fn stats(&self) -> RenderStats {
        self.state.stats
    }

    pub fn outputs(&self) -> &PassOutputs {
        &self.state.outputs
    }

    pub fn output(&self, name: &str) -> Option<TextureId> {
        self.state.outputs.get(name)
    }

    pub fn framebuffer_stack_depth(&self) -> usize {
        self.state.framebuffers.len()
    }

    pub fn camera_stack_depth(&self) -> usize {
        self.state.cameras.len()
    }

    pub fn frame_index(&self) -> u64 {
        self.state.frame_index
    }

    /// Queue compute work for the next compute pass
    pub fn queue_compute(&mut self, dispatch: ComputeDispatch) {
        self.state.compute_queue.push(dispatch);
    }

    pub fn pending_compute(&self) -> usize {
        self.state.compute_queue.len()
    }

    // Frame loop

    /// Start a frame: drop leftover commands and pick up the scene's camera
    /// and shadow light. The pass list is locked until [`end_frame`](Self::end_frame).
    pub fn begin_frame(&mut self, scene: &dyn SceneSource, elapsed: f32) {
        let leftover = self.queue.clear();
        if leftover > 0 {
            log::warn!("Dropped {} commands left over from the previous frame", leftover);
        }

        self.state.stats = RenderStats::default();
        self.state.current_pass_index = 0;
        self.state.current = None;
        self.state.last_framebuffer = None;
        self.state.scene_camera = scene.active_camera();
        self.state.shadow_light = scene.shadow_light();
        self.state.elapsed = elapsed;
        self.injection_allowed = false;
    }

    /// Run every pass in order. Each pass flushes its own commands before the
    /// next one begins, so its outputs are visible to later passes.
    pub fn render_passes(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        assets: &RenderAssets,
        scene: &dyn SceneSource,
        ui: Option<&dyn UiLayer>,
    ) {
        for index in 0..self.passes.len() {
            let pass = &mut self.passes[index];
            self.state.current_pass_index = index;
            self.state.current = Some(PassInfo::from(pass.descriptor()));
            log::debug!("Rendering pass {} '{}'", index, pass.name());

            let mut ctx = PassContext::new(
                &mut self.queue,
                &mut self.state,
                &mut *backend,
                assets,
                scene,
                ui,
            );
            pass.begin_render(&mut ctx);
            ctx.submit(RenderCommand::UpdateGlobals);
            pass.render(&mut ctx);
            pass.end_render(&mut ctx);
            self.state.stats.passes_rendered += 1;
        }

        self.state.current_pass_index = self.passes.len();
        self.state.current = None;
        self.queue.submit(RenderCommand::UpdateGlobals);
    }

    /// Flush out-of-pass commands, present, and unlock the pass list.
    pub fn end_frame(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        assets: &RenderAssets,
    ) -> BackendResult<()> {
        self.flush(backend, assets);
        self.injection_allowed = true;
        self.state.frame_index += 1;
        backend.present()
    }

    /// Run a whole frame with no out-of-pass submissions
    pub fn render_frame(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        assets: &RenderAssets,
        scene: &dyn SceneSource,
        ui: Option<&dyn UiLayer>,
        elapsed: f32,
    ) -> BackendResult<()> {
        self.begin_frame(scene, elapsed);
        self.render_passes(backend, assets, scene, ui);
        self.end_frame(backend, assets)
    }

    /// Follow a window resize
    pub fn resize(&mut self, backend: &mut dyn GraphicsBackend, width: u32, height: u32) {
        backend.resize(width, height);
        if self.state.framebuffers.is_empty() {
            let viewport = Viewport::from_size(width, height);
            backend.set_viewport(viewport);
            self.state.viewport = viewport;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, DummyBackend};
    use crate::pass::PassDescriptor;
    use crate::pipeline::ScenePass;
    use crate::scene::Scene;

    fn manager(backend: &mut DummyBackend) -> RenderManager {
        RenderManager::new(backend, RendererConfig::default()).unwrap()
    }

    #[test]
    fn test_new_sets_initial_state() {
        let mut backend = DummyBackend::default();
        let _manager = manager(&mut backend);
        assert!(backend
            .calls()
            .iter()
            .any(|call| matches!(call, BackendCall::SetDepthTest(true))));
        assert_eq!(backend.blend_state(), Some(BlendState::alpha_blending()));
    }

    #[test]
    fn test_inject_append_and_index_bounds() {
        let mut backend = DummyBackend::default();
        let mut manager = manager(&mut backend);
        assert!(manager.inject_pass(Box::new(ScenePass::new(PassDescriptor::new("A"))), None));
        assert!(manager.inject_pass(Box::new(ScenePass::new(PassDescriptor::new("B"))), Some(0)));
        assert!(!manager.inject_pass(Box::new(ScenePass::new(PassDescriptor::new("C"))), Some(5)));
        assert_eq!(manager.pass_names(), vec!["B", "A"]);
    }

    #[test]
    fn test_pass_list_locked_during_frame() {
        let mut backend = DummyBackend::default();
        let assets = RenderAssets::new();
        let scene = Scene::new();
        let mut manager = manager(&mut backend);
        manager.inject_pass(Box::new(ScenePass::new(PassDescriptor::new("A"))), None);

        manager.begin_frame(&scene, 0.0);
        assert!(!manager.remove_pass_at(0));
        assert!(!manager.inject_pass(Box::new(ScenePass::new(PassDescriptor::new("B"))), None));
        assert_eq!(manager.pass_count(), 1);

        manager.render_passes(&mut backend, &assets, &scene, None);
        manager.end_frame(&mut backend, &assets).unwrap();
        assert!(manager.remove_pass_at(0));
        assert_eq!(manager.pass_count(), 0);
    }

    #[test]
    fn test_pass_index_past_end_after_loop() {
        let mut backend = DummyBackend::default();
        let assets = RenderAssets::new();
        let scene = Scene::new();
        let mut manager = manager(&mut backend);
        manager.inject_pass(Box::new(ScenePass::new(PassDescriptor::new("A"))), None);
        manager.inject_pass(Box::new(ScenePass::new(PassDescriptor::new("B"))), None);

        manager.begin_frame(&scene, 0.0);
        assert_eq!(manager.current_pass_index(), 0);
        manager.render_passes(&mut backend, &assets, &scene, None);
        assert_eq!(manager.current_pass_index(), 2);
        assert_eq!(manager.current_pass_name(), "");
        assert_eq!(manager.stats().passes_rendered, 2);
    }

    #[test]
    fn test_leftover_commands_dropped_at_frame_start() {
        let mut backend = DummyBackend::default();
        let scene = Scene::new();
        let mut manager = manager(&mut backend);
        manager.submit(RenderCommand::PopCamera);
        manager.begin_frame(&scene, 0.0);
        assert_eq!(manager.pending_commands(), 0);
    }
}
