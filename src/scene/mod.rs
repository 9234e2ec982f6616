//! Scene management
//!
//! The renderer only sees a scene through [`SceneSource`]. [`Scene`] is a
//! small entity list that implements it.

mod camera;
mod light;
mod transform;

pub use camera::*;
pub use light::*;
pub use transform::*;

use slotmap::{new_key_type, SlotMap};

use crate::commands::{CommandQueue, DrawMaterial};
use crate::resources::{CameraHandle, MaterialHandle, RenderAssets, RenderFlags, VertexArrayHandle};

/// What the renderer needs from a scene.
pub trait SceneSource {
    /// Camera used when no pass or command pushed one
    fn active_camera(&self) -> Option<CameraHandle>;

    /// Light the shadow volume follows
    fn shadow_light(&self) -> Option<DirectionalLight> {
        None
    }

    /// Submit one draw per active drawable whose blend class is in `flags`.
    fn render_scene(&self, flags: RenderFlags, assets: &RenderAssets, queue: &mut CommandQueue);
}

new_key_type! {
    pub struct EntityId;
}

/// Kind of drawable, which decides draw order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drawable {
    /// Drawn first, ordered by `sort_order`
    Sprite { sort_order: i32 },
    Model,
    StaticMesh,
    Text,
}

#[derive(Debug, Clone)]
pub struct SceneEntity {
    pub name: String,
    pub transform: Transform,
    pub active: bool,
    pub drawable: Drawable,
    pub vertex_array: VertexArrayHandle,
    pub material: MaterialHandle,
}

impl SceneEntity {
    pub fn new(
        name: &str,
        drawable: Drawable,
        vertex_array: VertexArrayHandle,
        material: MaterialHandle,
    ) -> Self {
        Self {
            name: name.to_string(),
            transform: Transform::default(),
            active: true,
            drawable,
            vertex_array,
            material,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Submit this entity's draw
    pub fn draw(&self, queue: &mut CommandQueue) {
        queue.submit(
            DrawMaterial::new(self.vertex_array, self.material)
                .with_transform(self.transform.matrix()),
        );
    }

    /// Whether the entity belongs in a pass drawing `flags`. Entities whose
    /// material has expired are kept so their draw reports it.
    fn matches(&self, flags: RenderFlags, assets: &RenderAssets) -> bool {
        assets
            .resolve(self.material)
            .map_or(true, |material| flags.intersects(material.blend_mode.render_flag()))
    }
}

/// Entities plus the camera and light they are viewed with
#[derive(Debug, Default)]
pub struct Scene {
    entities: SlotMap<EntityId, SceneEntity>,
    camera: Option<CameraHandle>,
    light: Option<DirectionalLight>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, entity: SceneEntity) -> EntityId {
        self.entities.insert(entity)
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<SceneEntity> {
        self.entities.remove(id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&SceneEntity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut SceneEntity> {
        self.entities.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn set_camera(&mut self, camera: Option<CameraHandle>) {
        self.camera = camera;
    }

    pub fn set_light(&mut self, light: Option<DirectionalLight>) {
        self.light = light;
    }

    fn drawables<'s>(
        &'s self,
        flags: RenderFlags,
        assets: &'s RenderAssets,
    ) -> impl Iterator<Item = &'s SceneEntity> + 's {
        self.entities
            .values()
            .filter(move |entity| entity.active && entity.matches(flags, assets))
    }
}

impl SceneSource for Scene {
    fn active_camera(&self) -> Option<CameraHandle> {
        self.camera
    }

    fn shadow_light(&self) -> Option<DirectionalLight> {
        self.light
    }

    /// Sprites by sort order, then models, static meshes and text in
    /// registry order.
    fn render_scene(&self, flags: RenderFlags, assets: &RenderAssets, queue: &mut CommandQueue) {
        let mut sprites: Vec<(i32, &SceneEntity)> = self
            .drawables(flags, assets)
            .filter_map(|entity| match entity.drawable {
                Drawable::Sprite { sort_order } => Some((sort_order, entity)),
                _ => None,
            })
            .collect();
        sprites.sort_by_key(|(sort_order, _)| *sort_order);
        for (_, sprite) in sprites {
            sprite.draw(queue);
        }

        for kind in [Drawable::Model, Drawable::StaticMesh, Drawable::Text] {
            for entity in self.drawables(flags, assets).filter(|e| e.drawable == kind) {
                entity.draw(queue);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::RenderCommand;
    use crate::resources::{BlendMode, Material};

    #[test]
    fn test_render_order_and_filter() {
        let mut assets = RenderAssets::new();
        let opaque = assets.add_material(Material::new("opaque"));
        let glass =
            assets.add_material(Material::new("glass").with_blend_mode(BlendMode::Translucent));
        let va = VertexArrayHandle::default();

        let mut scene = Scene::new();
        scene.spawn(SceneEntity::new("model", Drawable::Model, va, opaque));
        scene.spawn(SceneEntity::new("back", Drawable::Sprite { sort_order: 5 }, va, opaque));
        scene.spawn(SceneEntity::new("front", Drawable::Sprite { sort_order: -1 }, va, opaque));
        scene.spawn(SceneEntity::new("window", Drawable::StaticMesh, va, glass));
        let mut hidden = SceneEntity::new("hidden", Drawable::Text, va, opaque);
        hidden.active = false;
        scene.spawn(hidden);

        let mut queue = CommandQueue::new();
        scene.render_scene(RenderFlags::DRAW_OPAQUE, &assets, &mut queue);
        assert_eq!(queue.len(), 3);

        let mut queue = CommandQueue::new();
        scene.render_scene(RenderFlags::DRAW_ALL, &assets, &mut queue);
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn test_sprites_sorted_before_models() {
        let mut assets = RenderAssets::new();
        let material = assets.add_material(Material::new("m"));
        let va = VertexArrayHandle::default();
        let mut scene = Scene::new();
        let model = SceneEntity::new("model", Drawable::Model, va, material)
            .with_transform(Transform::from_position(glam::Vec3::X));
        scene.spawn(model);
        scene.spawn(
            SceneEntity::new("late", Drawable::Sprite { sort_order: 2 }, va, material)
                .with_transform(Transform::from_position(glam::Vec3::Z)),
        );
        scene.spawn(
            SceneEntity::new("early", Drawable::Sprite { sort_order: 1 }, va, material)
                .with_transform(Transform::from_position(glam::Vec3::Y)),
        );

        let mut queue = CommandQueue::new();
        scene.render_scene(RenderFlags::DRAW_ALL, &assets, &mut queue);
        let positions: Vec<glam::Vec3> = std::iter::from_fn(|| queue.pop())
            .map(|command| match command {
                RenderCommand::DrawMaterial(draw) => draw.transform.w_axis.truncate(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(positions, vec![glam::Vec3::Y, glam::Vec3::Z, glam::Vec3::X]);
    }
}
