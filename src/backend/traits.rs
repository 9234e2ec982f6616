//! Core backend abstraction traits
//!
//! Commands never talk to a graphics API directly. Everything they do to the
//! GPU goes through [`GraphicsBackend`], which keeps the command pipeline
//! independent of any particular binding model.

use crate::backend::types::*;
use glam::Vec4;
use std::ops::Range;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("Failed to present: {0}")]
    PresentFailed(String),
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create shader: {0}")]
    ShaderCreationFailed(String),
    #[error("Failed to create vertex array: {0}")]
    VertexArrayCreationFailed(String),
    #[error("Failed to create framebuffer: {0}")]
    FramebufferCreationFailed(String),
    #[error("Surface lost")]
    SurfaceLost,
    #[error("Out of memory")]
    OutOfMemory,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Identifier of a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Identifier of a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Identifier of a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u64);

/// Identifier of a vertex array (vertex buffer plus optional element buffer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexArrayId(pub u64);

/// Identifier of an off-screen framebuffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferId(pub u64);

/// Main graphics backend trait
///
/// Binding calls are immediate-mode: state set here stays in effect until it
/// is set again, the same way a GL context behaves.
pub trait GraphicsBackend {
    /// Human-readable backend name
    fn name(&self) -> &'static str;

    /// Size of the window surface in pixels
    fn surface_size(&self) -> (u32, u32);

    /// Resize the window surface
    fn resize(&mut self, width: u32, height: u32);

    /// Present the window surface
    fn present(&mut self) -> BackendResult<()>;

    // Resource creation

    /// Create a buffer
    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferId>;

    /// Write data to a buffer
    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]);

    /// Create a texture
    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureId>;

    /// Write data to a texture
    fn write_texture(&mut self, texture: TextureId, data: &[u8], width: u32, height: u32);

    /// Compile and link a shader program
    fn create_shader(&mut self, desc: &ShaderDescriptor) -> BackendResult<ShaderId>;

    /// Create a vertex array with its vertex and element buffers
    fn create_vertex_array(
        &mut self,
        desc: &VertexArrayDescriptor<'_>,
    ) -> BackendResult<VertexArrayId>;

    /// Create a framebuffer over already created attachments
    fn create_framebuffer(
        &mut self,
        desc: &FramebufferDescriptor,
        color_attachments: &[TextureId],
        depth_attachment: Option<TextureId>,
    ) -> BackendResult<FramebufferId>;

    // Resource cleanup

    /// Destroy a buffer
    fn destroy_buffer(&mut self, buffer: BufferId);

    /// Destroy a texture
    fn destroy_texture(&mut self, texture: TextureId);

    /// Destroy a shader program
    fn destroy_shader(&mut self, shader: ShaderId);

    /// Destroy a vertex array
    fn destroy_vertex_array(&mut self, vertex_array: VertexArrayId);

    /// Destroy a framebuffer (attachments are destroyed separately)
    fn destroy_framebuffer(&mut self, framebuffer: FramebufferId);

    // Render state

    /// Bind a framebuffer as the render target, `None` for the window surface
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    /// Set viewport
    fn set_viewport(&mut self, viewport: Viewport);

    /// Clear the bound render target
    fn clear(&mut self, color: Vec4, flags: ClearFlags);

    /// Enable or disable depth testing
    fn set_depth_test(&mut self, enabled: bool);

    /// Set the depth comparison function
    fn set_depth_compare(&mut self, compare: CompareFunction);

    /// Set blending, `None` disables it
    fn set_blend_state(&mut self, blend: Option<BlendState>);

    /// Set rasterizer fill mode
    fn set_polygon_mode(&mut self, mode: PolygonMode);

    /// Open a named debug group for GPU profilers
    fn push_debug_group(&mut self, label: &str);

    /// Close the innermost debug group
    fn pop_debug_group(&mut self);

    // Binding and drawing

    /// Bind a shader program
    fn bind_shader(&mut self, shader: ShaderId);

    /// Set a uniform on the bound shader program
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    /// Bind a uniform buffer to a binding slot
    fn bind_uniform_buffer(&mut self, binding: u32, buffer: BufferId);

    /// Bind a texture to a texture unit
    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    /// Bind a vertex array
    fn bind_vertex_array(&mut self, vertex_array: VertexArrayId);

    /// Draw primitives
    fn draw(
        &mut self,
        topology: PrimitiveTopology,
        vertices: Range<u32>,
        instances: Range<u32>,
    );

    /// Draw indexed primitives
    fn draw_indexed(
        &mut self,
        topology: PrimitiveTopology,
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    );

    /// Dispatch compute work with the bound compute program
    fn dispatch_compute(&mut self, x: u32, y: u32, z: u32);
}
