//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It hands out fresh ids,
//! tracks the bound state the way a GL context would and records every call,
//! so tests and headless tools can inspect exactly what a frame did.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use glam::Vec4;

use super::traits::*;
use super::types::*;

/// A single recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateBuffer(BufferId),
    WriteBuffer { buffer: BufferId, offset: u64, len: usize },
    CreateTexture(TextureId),
    WriteTexture(TextureId),
    CreateShader(ShaderId),
    CreateVertexArray(VertexArrayId),
    CreateFramebuffer(FramebufferId),
    DestroyBuffer(BufferId),
    DestroyTexture(TextureId),
    DestroyShader(ShaderId),
    DestroyVertexArray(VertexArrayId),
    DestroyFramebuffer(FramebufferId),
    BindFramebuffer(Option<FramebufferId>),
    SetViewport(Viewport),
    Clear { color: Vec4, flags: ClearFlags },
    SetDepthTest(bool),
    SetDepthCompare(CompareFunction),
    SetBlendState(Option<BlendState>),
    SetPolygonMode(PolygonMode),
    PushDebugGroup(String),
    PopDebugGroup,
    BindShader(ShaderId),
    SetUniform { name: String, value: UniformValue },
    BindUniformBuffer { binding: u32, buffer: BufferId },
    BindTexture { unit: u32, texture: TextureId },
    BindVertexArray(VertexArrayId),
    Draw(DrawRecord),
    DispatchCompute { shader: Option<ShaderId>, groups: [u32; 3] },
    Resize { width: u32, height: u32 },
    Present,
}

impl BackendCall {
    /// Whether the call mutates render state or issues work, as opposed to
    /// creating or destroying resources.
    pub fn is_render_call(&self) -> bool {
        !matches!(
            self,
            BackendCall::CreateBuffer(_)
                | BackendCall::CreateTexture(_)
                | BackendCall::WriteTexture(_)
                | BackendCall::CreateShader(_)
                | BackendCall::CreateVertexArray(_)
                | BackendCall::CreateFramebuffer(_)
                | BackendCall::DestroyBuffer(_)
                | BackendCall::DestroyTexture(_)
                | BackendCall::DestroyShader(_)
                | BackendCall::DestroyVertexArray(_)
                | BackendCall::DestroyFramebuffer(_)
        )
    }
}

/// Snapshot of the state a draw call was issued with.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub shader: Option<ShaderId>,
    pub vertex_array: Option<VertexArrayId>,
    pub framebuffer: Option<FramebufferId>,
    pub topology: PrimitiveTopology,
    pub indexed: bool,
    pub elements: Range<u32>,
    pub instances: Range<u32>,
    pub depth_compare: CompareFunction,
    /// Texture units bound since the previous draw
    pub textures: Vec<(u32, TextureId)>,
    /// Uniforms set since the previous draw
    pub uniforms: Vec<(String, UniformValue)>,
}

impl DrawRecord {
    pub fn bound_texture_ids(&self) -> Vec<TextureId> {
        self.textures.iter().map(|(_, texture)| *texture).collect()
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, value)| *value)
    }
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    surface: (u32, u32),
    next_id: u64,
    calls: Vec<BackendCall>,
    buffers: HashMap<BufferId, Vec<u8>>,
    live_textures: HashSet<TextureId>,
    shader: Option<ShaderId>,
    vertex_array: Option<VertexArrayId>,
    framebuffer: Option<FramebufferId>,
    viewport: Viewport,
    depth_compare: CompareFunction,
    polygon_mode: PolygonMode,
    blend: Option<BlendState>,
    debug_groups: Vec<String>,
    pending_textures: Vec<(u32, TextureId)>,
    pending_uniforms: Vec<(String, UniformValue)>,
    fail_creation: bool,
}

impl DummyBackend {
    /// Create a new dummy backend with the given surface size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: (width, height),
            next_id: 1,
            calls: Vec::new(),
            buffers: HashMap::new(),
            live_textures: HashSet::new(),
            shader: None,
            vertex_array: None,
            framebuffer: None,
            viewport: Viewport::from_size(width, height),
            depth_compare: CompareFunction::default(),
            polygon_mode: PolygonMode::Fill,
            blend: None,
            debug_groups: Vec::new(),
            pending_textures: Vec::new(),
            pending_uniforms: Vec::new(),
            fail_creation: false,
        }
    }

    /// Make every subsequent resource creation fail.
    pub fn set_fail_creation(&mut self, fail: bool) {
        self.fail_creation = fail;
    }

    /// All calls recorded so far.
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Forget recorded calls; bound state is kept.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded render-state and draw calls.
    pub fn render_call_count(&self) -> usize {
        self.calls.iter().filter(|c| c.is_render_call()).count()
    }

    /// Recorded draw calls in issue order.
    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> {
        self.calls.iter().filter_map(|call| match call {
            BackendCall::Draw(record) => Some(record),
            _ => None,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.draws().count()
    }

    pub fn dispatch_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::DispatchCompute { .. }))
            .count()
    }

    pub fn present_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Present))
            .count()
    }

    /// Labels of the debug groups opened, in order.
    pub fn debug_group_labels(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::PushDebugGroup(label) => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of debug groups currently open.
    pub fn debug_group_depth(&self) -> usize {
        self.debug_groups.len()
    }

    pub fn bound_framebuffer(&self) -> Option<FramebufferId> {
        self.framebuffer
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn depth_compare(&self) -> CompareFunction {
        self.depth_compare
    }

    pub fn polygon_mode(&self) -> PolygonMode {
        self.polygon_mode
    }

    pub fn blend_state(&self) -> Option<BlendState> {
        self.blend
    }

    /// Last bytes written to a buffer.
    pub fn buffer_data(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    pub fn is_texture_alive(&self, texture: TextureId) -> bool {
        self.live_textures.contains(&texture)
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn check_creation(&self, what: &str) -> Result<(), String> {
        if self.fail_creation {
            Err(format!("{what} creation disabled on dummy backend"))
        } else {
            Ok(())
        }
    }

    fn record_draw(
        &mut self,
        topology: PrimitiveTopology,
        indexed: bool,
        elements: Range<u32>,
        instances: Range<u32>,
    ) {
        let record = DrawRecord {
            shader: self.shader,
            vertex_array: self.vertex_array,
            framebuffer: self.framebuffer,
            topology,
            indexed,
            elements,
            instances,
            depth_compare: self.depth_compare,
            textures: std::mem::take(&mut self.pending_textures),
            uniforms: std::mem::take(&mut self.pending_uniforms),
        };
        self.calls.push(BackendCall::Draw(record));
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl GraphicsBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    fn resize(&mut self, width: u32, height: u32) {
        log::trace!("DummyBackend: resize surface to {}x{}", width, height);
        self.surface = (width, height);
        self.calls.push(BackendCall::Resize { width, height });
    }

    fn present(&mut self) -> BackendResult<()> {
        log::trace!("DummyBackend: present");
        self.calls.push(BackendCall::Present);
        Ok(())
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferId> {
        self.check_creation("buffer")
            .map_err(BackendError::BufferCreationFailed)?;
        let id = BufferId(self.next());
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            desc.label,
            desc.size
        );
        self.buffers.insert(id, vec![0; desc.size as usize]);
        self.calls.push(BackendCall::CreateBuffer(id));
        Ok(id)
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) {
        log::trace!("DummyBackend: write {} bytes to {:?}", data.len(), buffer);
        let storage = self.buffers.entry(buffer).or_default();
        let start = offset as usize;
        if storage.len() < start + data.len() {
            storage.resize(start + data.len(), 0);
        }
        storage[start..start + data.len()].copy_from_slice(data);
        self.calls.push(BackendCall::WriteBuffer {
            buffer,
            offset,
            len: data.len(),
        });
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureId> {
        self.check_creation("texture")
            .map_err(BackendError::TextureCreationFailed)?;
        let id = TextureId(self.next());
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{})",
            desc.label,
            desc.width,
            desc.height
        );
        self.live_textures.insert(id);
        self.calls.push(BackendCall::CreateTexture(id));
        Ok(id)
    }

    fn write_texture(&mut self, texture: TextureId, data: &[u8], width: u32, height: u32) {
        log::trace!(
            "DummyBackend: write {} bytes ({}x{}) to {:?}",
            data.len(),
            width,
            height,
            texture
        );
        self.calls.push(BackendCall::WriteTexture(texture));
    }

    fn create_shader(&mut self, desc: &ShaderDescriptor) -> BackendResult<ShaderId> {
        self.check_creation("shader")
            .map_err(BackendError::ShaderCreationFailed)?;
        let id = ShaderId(self.next());
        log::trace!(
            "DummyBackend: creating {:?} shader {:?}",
            desc.source.stage(),
            desc.label
        );
        self.calls.push(BackendCall::CreateShader(id));
        Ok(id)
    }

    fn create_vertex_array(
        &mut self,
        desc: &VertexArrayDescriptor<'_>,
    ) -> BackendResult<VertexArrayId> {
        self.check_creation("vertex array")
            .map_err(BackendError::VertexArrayCreationFailed)?;
        let id = VertexArrayId(self.next());
        log::trace!(
            "DummyBackend: creating vertex array {:?} ({} vertices, {} indices)",
            desc.label,
            desc.vertex_count,
            desc.indices.map_or(0, <[u32]>::len)
        );
        self.calls.push(BackendCall::CreateVertexArray(id));
        Ok(id)
    }

    fn create_framebuffer(
        &mut self,
        desc: &FramebufferDescriptor,
        color_attachments: &[TextureId],
        _depth_attachment: Option<TextureId>,
    ) -> BackendResult<FramebufferId> {
        self.check_creation("framebuffer")
            .map_err(BackendError::FramebufferCreationFailed)?;
        let id = FramebufferId(self.next());
        log::trace!(
            "DummyBackend: creating framebuffer {:?} ({}x{}, {} color attachments)",
            desc.label,
            desc.width,
            desc.height,
            color_attachments.len()
        );
        self.calls.push(BackendCall::CreateFramebuffer(id));
        Ok(id)
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        self.calls.push(BackendCall::DestroyBuffer(buffer));
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.live_textures.remove(&texture);
        self.calls.push(BackendCall::DestroyTexture(texture));
    }

    fn destroy_shader(&mut self, shader: ShaderId) {
        self.calls.push(BackendCall::DestroyShader(shader));
    }

    fn destroy_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.calls.push(BackendCall::DestroyVertexArray(vertex_array));
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.calls.push(BackendCall::DestroyFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        log::trace!("DummyBackend: bind framebuffer {:?}", framebuffer);
        self.framebuffer = framebuffer;
        self.calls.push(BackendCall::BindFramebuffer(framebuffer));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.calls.push(BackendCall::SetViewport(viewport));
    }

    fn clear(&mut self, color: Vec4, flags: ClearFlags) {
        self.calls.push(BackendCall::Clear { color, flags });
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.calls.push(BackendCall::SetDepthTest(enabled));
    }

    fn set_depth_compare(&mut self, compare: CompareFunction) {
        self.depth_compare = compare;
        self.calls.push(BackendCall::SetDepthCompare(compare));
    }

    fn set_blend_state(&mut self, blend: Option<BlendState>) {
        self.blend = blend;
        self.calls.push(BackendCall::SetBlendState(blend));
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.polygon_mode = mode;
        self.calls.push(BackendCall::SetPolygonMode(mode));
    }

    fn push_debug_group(&mut self, label: &str) {
        log::trace!("DummyBackend: push debug group '{}'", label);
        self.debug_groups.push(label.to_string());
        self.calls.push(BackendCall::PushDebugGroup(label.to_string()));
    }

    fn pop_debug_group(&mut self) {
        if self.debug_groups.pop().is_none() {
            log::error!("DummyBackend: pop_debug_group without an open group");
        }
        self.calls.push(BackendCall::PopDebugGroup);
    }

    fn bind_shader(&mut self, shader: ShaderId) {
        self.shader = Some(shader);
        self.calls.push(BackendCall::BindShader(shader));
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.pending_uniforms.push((name.to_string(), value));
        self.calls.push(BackendCall::SetUniform {
            name: name.to_string(),
            value,
        });
    }

    fn bind_uniform_buffer(&mut self, binding: u32, buffer: BufferId) {
        self.calls
            .push(BackendCall::BindUniformBuffer { binding, buffer });
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.pending_textures.push((unit, texture));
        self.calls.push(BackendCall::BindTexture { unit, texture });
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_array = Some(vertex_array);
        self.calls.push(BackendCall::BindVertexArray(vertex_array));
    }

    fn draw(
        &mut self,
        topology: PrimitiveTopology,
        vertices: Range<u32>,
        instances: Range<u32>,
    ) {
        log::trace!(
            "DummyBackend: draw {:?} vertices {:?} instances {:?}",
            topology,
            vertices,
            instances
        );
        self.record_draw(topology, false, vertices, instances);
    }

    fn draw_indexed(
        &mut self,
        topology: PrimitiveTopology,
        indices: Range<u32>,
        _base_vertex: i32,
        instances: Range<u32>,
    ) {
        log::trace!(
            "DummyBackend: draw indexed {:?} indices {:?} instances {:?}",
            topology,
            indices,
            instances
        );
        self.record_draw(topology, true, indices, instances);
    }

    fn dispatch_compute(&mut self, x: u32, y: u32, z: u32) {
        log::trace!("DummyBackend: dispatch compute ({}, {}, {})", x, y, z);
        self.calls.push(BackendCall::DispatchCompute {
            shader: self.shader,
            groups: [x, y, z],
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let mut backend = DummyBackend::default();
        let a = backend
            .create_texture(&TextureDescriptor::default())
            .unwrap();
        let b = backend
            .create_texture(&TextureDescriptor::default())
            .unwrap();
        assert_ne!(a, b);
        assert!(backend.is_texture_alive(a));
        backend.destroy_texture(a);
        assert!(!backend.is_texture_alive(a));
    }

    #[test]
    fn test_draw_captures_pending_bindings() {
        let mut backend = DummyBackend::default();
        backend.bind_texture(0, TextureId(7));
        backend.set_uniform("albedo", UniformValue::Int(0));
        backend.draw(PrimitiveTopology::TriangleList, 0..3, 0..1);
        backend.draw(PrimitiveTopology::TriangleList, 0..3, 0..1);

        let draws: Vec<_> = backend.draws().collect();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].bound_texture_ids(), vec![TextureId(7)]);
        assert_eq!(draws[0].uniform("albedo"), Some(UniformValue::Int(0)));
        assert!(draws[1].textures.is_empty());
    }

    #[test]
    fn test_failing_creation() {
        let mut backend = DummyBackend::default();
        backend.set_fail_creation(true);
        let result = backend.create_buffer(&BufferDescriptor {
            label: None,
            size: 16,
            usage: BufferUsage::UNIFORM,
        });
        assert!(matches!(result, Err(BackendError::BufferCreationFailed(_))));
    }

    #[test]
    fn test_write_buffer_keeps_bytes() {
        let mut backend = DummyBackend::default();
        let buffer = backend
            .create_buffer(&BufferDescriptor {
                label: None,
                size: 8,
                usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            })
            .unwrap();
        backend.write_buffer(buffer, 4, &[1, 2, 3, 4]);
        assert_eq!(backend.buffer_data(buffer), Some(&[0, 0, 0, 0, 1, 2, 3, 4][..]));
    }
}
