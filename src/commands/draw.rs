//! Draw commands

use std::ops::Range;

use glam::{Mat4, Vec2, Vec4};

use super::uniform_names as names;
use super::ExecuteContext;
use crate::backend::{
    CompareFunction, GraphicsBackend, PrimitiveTopology, ShaderId, TextureId, UniformValue,
};
use crate::manager::PassOutputs;
use crate::resources::{
    AssetHandle, Material, MaterialHandle, RenderAssets, ShaderHandle, TextureHandle,
    VertexArray, VertexArrayHandle,
};

/// Draw a vertex array with a bare shader
#[derive(Debug, Clone)]
pub struct DrawPlain {
    pub vertex_array: VertexArrayHandle,
    pub shader: ShaderHandle,
    pub transform: Mat4,
}

impl DrawPlain {
    pub fn new(vertex_array: VertexArrayHandle, shader: ShaderHandle) -> Self {
        Self {
            vertex_array,
            shader,
            transform: Mat4::IDENTITY,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub(crate) fn execute(self, ctx: &mut ExecuteContext<'_>) {
        let assets = ctx.assets;
        let (Some(vertex_array), Some(shader)) = (
            assets.resolve(self.vertex_array),
            assets.resolve(self.shader),
        ) else {
            ctx.report_expired("DrawPlain", first_expired(&[
                expired(assets, self.vertex_array),
                expired(assets, self.shader),
            ]));
            return;
        };

        let (projection, view) = camera_matrices(ctx);
        let backend = &mut *ctx.backend;
        backend.bind_shader(shader.id());
        backend.set_uniform(names::PROJECTION, UniformValue::Mat4(projection));
        backend.set_uniform(names::VIEW, UniformValue::Mat4(view));
        backend.set_uniform(names::MODEL, UniformValue::Mat4(self.transform));
        backend.bind_vertex_array(vertex_array.id());
        draw_vertex_array(backend, vertex_array, 0..1);
        ctx.state.stats.draw_calls += 1;
    }
}

/// Draw a vertex array with a shader and a single texture on unit 0
#[derive(Debug, Clone)]
pub struct DrawTextured {
    pub vertex_array: VertexArrayHandle,
    pub texture: TextureHandle,
    pub shader: ShaderHandle,
    pub transform: Mat4,
}

impl DrawTextured {
    pub fn new(vertex_array: VertexArrayHandle, texture: TextureHandle, shader: ShaderHandle) -> Self {
        Self {
            vertex_array,
            texture,
            shader,
            transform: Mat4::IDENTITY,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub(crate) fn execute(self, ctx: &mut ExecuteContext<'_>) {
        let assets = ctx.assets;
        let (Some(vertex_array), Some(texture), Some(shader)) = (
            assets.resolve(self.vertex_array),
            assets.resolve(self.texture),
            assets.resolve(self.shader),
        ) else {
            ctx.report_expired("DrawTextured", first_expired(&[
                expired(assets, self.vertex_array),
                expired(assets, self.texture),
                expired(assets, self.shader),
            ]));
            return;
        };

        let (projection, view) = camera_matrices(ctx);
        let backend = &mut *ctx.backend;
        backend.bind_shader(shader.id());
        backend.set_uniform(names::TEXTURE0, UniformValue::Int(0));
        backend.bind_texture(0, texture.id());
        backend.set_uniform(names::PROJECTION, UniformValue::Mat4(projection));
        backend.set_uniform(names::VIEW, UniformValue::Mat4(view));
        backend.set_uniform(names::MODEL, UniformValue::Mat4(self.transform));
        backend.bind_vertex_array(vertex_array.id());
        draw_vertex_array(backend, vertex_array, 0..1);
        ctx.state.stats.draw_calls += 1;
    }
}

/// Draw a vertex array through a material, the general-purpose draw
#[derive(Debug, Clone)]
pub struct DrawMaterial {
    pub vertex_array: VertexArrayHandle,
    pub material: MaterialHandle,
    pub transform: Mat4,
    /// Used unless the current pass requests its own comparison
    pub depth_compare: CompareFunction,
    pub instanced: bool,
    pub instance_count: u32,
    pub first_instance: u32,
}

impl DrawMaterial {
    pub fn new(vertex_array: VertexArrayHandle, material: MaterialHandle) -> Self {
        Self {
            vertex_array,
            material,
            transform: Mat4::IDENTITY,
            depth_compare: CompareFunction::LessEqual,
            instanced: false,
            instance_count: 0,
            first_instance: 0,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_depth_compare(mut self, depth_compare: CompareFunction) -> Self {
        self.depth_compare = depth_compare;
        self
    }

    /// Draw `count` instances starting at `first_instance`
    pub fn instanced(mut self, count: u32, first_instance: u32) -> Self {
        self.instanced = true;
        self.instance_count = count;
        self.first_instance = first_instance;
        self
    }

    /// Instance range to draw, `None` when it runs past `u32::MAX`
    fn instances(&self) -> Option<Range<u32>> {
        if !self.instanced {
            return Some(0..1);
        }
        let end = self.first_instance.checked_add(self.instance_count)?;
        Some(self.first_instance..end)
    }

    pub(crate) fn execute(self, ctx: &mut ExecuteContext<'_>) {
        let Some(instances) = self.instances() else {
            log::warn!(
                "DrawMaterial skipped: {} instances from {} overflow the instance range",
                self.instance_count,
                self.first_instance
            );
            return;
        };

        let assets = ctx.assets;
        let (Some(vertex_array), Some(material)) = (
            assets.resolve(self.vertex_array),
            assets.resolve(self.material),
        ) else {
            ctx.report_expired("DrawMaterial", first_expired(&[
                expired(assets, self.vertex_array),
                expired(assets, self.material),
            ]));
            return;
        };

        let material = match ctx.current_pass_override_material() {
            Some(override_material) if material.cast_shadows => {
                match assets.resolve(override_material) {
                    Some(override_material) => override_material,
                    None => {
                        ctx.report_expired("DrawMaterial", "override material");
                        return;
                    }
                }
            }
            _ => material,
        };

        let Some(bound) = resolve_material(ctx, "DrawMaterial", material) else {
            return;
        };

        let depth_compare = ctx
            .state
            .current_pass_depth_compare()
            .unwrap_or(self.depth_compare);
        let bind_outputs = !ctx.state.in_shadow_pass();
        let light_space = ctx.state.light_space_matrix;
        let default_depth = ctx.state.config.depth_compare;

        let backend = &mut *ctx.backend;
        backend.set_depth_compare(depth_compare);
        bound.bind(backend);
        if bind_outputs {
            bind_outputs_after(backend, &ctx.state.outputs, bound.textures.len() as u32);
        }
        backend.set_uniform(names::MODEL, UniformValue::Mat4(self.transform));
        backend.set_uniform(names::LIGHT_SPACE_MATRIX, UniformValue::Mat4(light_space));
        for (name, value) in material.uniforms() {
            backend.set_uniform(name, *value);
        }
        backend.bind_vertex_array(vertex_array.id());
        draw_vertex_array(backend, vertex_array, instances);
        backend.set_depth_compare(default_depth);
        ctx.state.stats.draw_calls += 1;
    }
}

/// Draw a line vertex array through a material, never substituted by a
/// pass override
#[derive(Debug, Clone)]
pub struct DrawLines {
    pub vertex_array: VertexArrayHandle,
    pub material: MaterialHandle,
    pub transform: Mat4,
    pub color: Vec4,
}

impl DrawLines {
    pub fn new(vertex_array: VertexArrayHandle, material: MaterialHandle) -> Self {
        Self {
            vertex_array,
            material,
            transform: Mat4::IDENTITY,
            color: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    pub(crate) fn execute(self, ctx: &mut ExecuteContext<'_>) {
        let assets = ctx.assets;
        let (Some(vertex_array), Some(material)) = (
            assets.resolve(self.vertex_array),
            assets.resolve(self.material),
        ) else {
            ctx.report_expired("DrawLines", first_expired(&[
                expired(assets, self.vertex_array),
                expired(assets, self.material),
            ]));
            return;
        };
        let Some(bound) = resolve_material(ctx, "DrawLines", material) else {
            return;
        };

        let backend = &mut *ctx.backend;
        bound.bind(backend);
        for (name, value) in material.uniforms() {
            backend.set_uniform(name, *value);
        }
        backend.set_uniform(names::MODEL, UniformValue::Mat4(self.transform));
        backend.set_uniform(names::LINE_COLOR, UniformValue::Vec4(self.color));
        backend.bind_vertex_array(vertex_array.id());
        backend.draw(PrimitiveTopology::LineList, 0..vertex_array.vertex_count(), 0..1);
        ctx.state.stats.draw_calls += 1;
    }
}

/// Draw a full-screen quad through a post-process material
#[derive(Debug, Clone)]
pub struct DrawPostProcess {
    pub vertex_array: VertexArrayHandle,
    pub material: MaterialHandle,
}

impl DrawPostProcess {
    pub fn new(vertex_array: VertexArrayHandle, material: MaterialHandle) -> Self {
        Self {
            vertex_array,
            material,
        }
    }

    pub(crate) fn execute(self, ctx: &mut ExecuteContext<'_>) {
        let assets = ctx.assets;
        let (Some(vertex_array), Some(material)) = (
            assets.resolve(self.vertex_array),
            assets.resolve(self.material),
        ) else {
            ctx.report_expired("DrawPostProcess", first_expired(&[
                expired(assets, self.vertex_array),
                expired(assets, self.material),
            ]));
            return;
        };
        let Some(bound) = resolve_material(ctx, "DrawPostProcess", material) else {
            return;
        };

        let bind_outputs = !ctx.state.in_shadow_pass();
        let default_depth = ctx.state.config.depth_compare;
        let backend = &mut *ctx.backend;
        backend.set_depth_compare(CompareFunction::Always);
        bound.bind(backend);
        if bind_outputs {
            bind_outputs_after(backend, &ctx.state.outputs, bound.textures.len() as u32);
        }
        for (name, value) in material.uniforms() {
            backend.set_uniform(name, *value);
        }
        backend.bind_vertex_array(vertex_array.id());
        draw_vertex_array(backend, vertex_array, 0..1);
        backend.set_depth_compare(default_depth);
        ctx.state.stats.draw_calls += 1;
    }
}

/// Draw a UI element in pixel space over the current viewport
#[derive(Debug, Clone)]
pub struct DrawUi {
    pub vertex_array: VertexArrayHandle,
    pub shader: ShaderHandle,
    /// Raw texture owned by the UI system, `None` for untextured elements
    pub texture: Option<TextureId>,
    pub transform: Mat4,
    pub translation: Vec2,
}

impl DrawUi {
    pub fn new(vertex_array: VertexArrayHandle, shader: ShaderHandle) -> Self {
        Self {
            vertex_array,
            shader,
            texture: None,
            transform: Mat4::IDENTITY,
            translation: Vec2::ZERO,
        }
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_translation(mut self, translation: Vec2) -> Self {
        self.translation = translation;
        self
    }

    pub(crate) fn execute(self, ctx: &mut ExecuteContext<'_>) {
        let assets = ctx.assets;
        let (Some(vertex_array), Some(shader)) = (
            assets.resolve(self.vertex_array),
            assets.resolve(self.shader),
        ) else {
            ctx.report_expired("DrawUi", first_expired(&[
                expired(assets, self.vertex_array),
                expired(assets, self.shader),
            ]));
            return;
        };

        let viewport = ctx.state.viewport;
        let projection = Mat4::orthographic_rh(
            0.0,
            viewport.width as f32,
            viewport.height as f32,
            0.0,
            -1.0,
            1.0,
        );

        let backend = &mut *ctx.backend;
        backend.bind_shader(shader.id());
        backend.set_uniform(names::PROJECTION, UniformValue::Mat4(projection));
        backend.set_uniform(names::UI_TRANSFORM, UniformValue::Mat4(self.transform));
        backend.set_uniform(names::UI_TRANSLATION, UniformValue::Vec2(self.translation));
        if let Some(texture) = self.texture {
            backend.set_uniform(names::TEXTURE0, UniformValue::Int(0));
            backend.bind_texture(0, texture);
        }
        backend.bind_vertex_array(vertex_array.id());
        draw_vertex_array(backend, vertex_array, 0..1);
        ctx.state.stats.draw_calls += 1;
    }
}

/// A material with its shader and textures resolved, ready to bind
struct BoundMaterial<'m> {
    shader: ShaderId,
    textures: Vec<(&'m str, TextureId)>,
}

impl BoundMaterial<'_> {
    /// Bind the shader and the material textures to units 0..n
    fn bind(&self, backend: &mut dyn GraphicsBackend) {
        backend.bind_shader(self.shader);
        for (unit, (sampler, texture)) in self.textures.iter().enumerate() {
            backend.set_uniform(sampler, UniformValue::Int(unit as i32));
            backend.bind_texture(unit as u32, *texture);
        }
    }
}

/// Resolve a material's shader and every texture, all or nothing.
fn resolve_material<'m>(
    ctx: &mut ExecuteContext<'_>,
    command: &str,
    material: &'m Material,
) -> Option<BoundMaterial<'m>> {
    let assets = ctx.assets;
    let Some(shader) = material.shader else {
        debug_assert!(
            material.shader.is_some(),
            "material '{}' has no shader",
            material.name
        );
        log::error!("{} skipped: material '{}' has no shader", command, material.name);
        return None;
    };
    let Some(shader) = assets.resolve(shader) else {
        ctx.report_expired(command, "material shader");
        return None;
    };

    let mut textures = Vec::with_capacity(material.texture_count());
    for binding in material.textures() {
        match assets.resolve(binding.texture) {
            Some(texture) => textures.push((binding.sampler.as_str(), texture.id())),
            None => {
                ctx.report_expired(command, "material texture");
                return None;
            }
        }
    }

    Some(BoundMaterial {
        shader: shader.id(),
        textures,
    })
}

/// Bind every published pass output after the material's own texture units,
/// addressing each sampler by the output's name
fn bind_outputs_after(backend: &mut dyn GraphicsBackend, outputs: &PassOutputs, first_unit: u32) {
    for (unit, (name, texture)) in (first_unit..).zip(outputs.iter()) {
        backend.set_uniform(name, UniformValue::Int(unit as i32));
        backend.bind_texture(unit, texture);
    }
}

/// Indexed draw when the vertex array has an element buffer, array draw
/// otherwise
pub(crate) fn draw_vertex_array(
    backend: &mut dyn GraphicsBackend,
    vertex_array: &VertexArray,
    instances: Range<u32>,
) {
    match vertex_array.element_count() {
        Some(count) => backend.draw_indexed(vertex_array.topology(), 0..count, 0, instances),
        None => backend.draw(
            vertex_array.topology(),
            0..vertex_array.vertex_count(),
            instances,
        ),
    }
}

fn camera_matrices(ctx: &ExecuteContext<'_>) -> (Mat4, Mat4) {
    ctx.active_camera().map_or((Mat4::IDENTITY, Mat4::IDENTITY), |camera| {
        (camera.projection_matrix(), camera.view_matrix())
    })
}

fn expired<H: AssetHandle>(assets: &RenderAssets, handle: H) -> Option<&'static str> {
    (!assets.contains(handle)).then_some(H::KIND)
}

fn first_expired(kinds: &[Option<&'static str>]) -> &'static str {
    kinds.iter().flatten().next().copied().unwrap_or("resource")
}
