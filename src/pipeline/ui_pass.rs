//! User interface pass

use glam::{Mat4, Vec2};

use super::UI_PASS;
use crate::backend::TextureId;
use crate::commands::{CommandQueue, DrawUi, RenderCommand};
use crate::pass::{PassContext, PassDescriptor, PassTarget, RenderPass};
use crate::resources::{RenderAssets, ShaderHandle, VertexArrayHandle};

/// Source of the UI draw commands for a frame.
pub trait UiLayer {
    fn render_ui(&self, assets: &RenderAssets, queue: &mut CommandQueue);
}

/// Draws the UI layer over whatever the previous pass rendered.
pub struct UiPass {
    desc: PassDescriptor,
}

impl UiPass {
    pub fn new() -> Self {
        Self {
            desc: PassDescriptor::new(UI_PASS)
                .with_target(PassTarget::Previous)
                .with_clear(false),
        }
    }
}

impl Default for UiPass {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPass for UiPass {
    fn descriptor(&self) -> &PassDescriptor {
        &self.desc
    }

    fn descriptor_mut(&mut self) -> &mut PassDescriptor {
        &mut self.desc
    }

    fn render(&mut self, ctx: &mut PassContext<'_>) {
        let Some(ui) = ctx.ui() else {
            return;
        };
        ctx.submit(RenderCommand::SetBlending(true));
        ui.render_ui(ctx.assets(), ctx.queue());
    }
}

/// A textured or flat rectangle in pixel space
#[derive(Debug, Clone)]
pub struct UiElement {
    pub vertex_array: VertexArrayHandle,
    pub shader: ShaderHandle,
    pub texture: Option<TextureId>,
    /// Top-left corner in pixels
    pub position: Vec2,
    pub size: Vec2,
    pub visible: bool,
}

/// Minimal retained UI layer: a flat list of elements drawn in order
#[derive(Debug, Default)]
pub struct UiCanvas {
    elements: Vec<UiElement>,
}

impl UiCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, element: UiElement) -> usize {
        self.elements.push(element);
        self.elements.len() - 1
    }

    pub fn element_mut(&mut self, index: usize) -> Option<&mut UiElement> {
        self.elements.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl UiLayer for UiCanvas {
    fn render_ui(&self, _assets: &RenderAssets, queue: &mut CommandQueue) {
        for element in self.elements.iter().filter(|e| e.visible) {
            let mut draw = DrawUi::new(element.vertex_array, element.shader)
                .with_transform(Mat4::from_scale(element.size.extend(1.0)))
                .with_translation(element.position);
            if let Some(texture) = element.texture {
                draw = draw.with_texture(texture);
            }
            queue.submit(draw);
        }
    }
}

impl UiElement {
    pub fn new(vertex_array: VertexArrayHandle, shader: ShaderHandle, position: Vec2, size: Vec2) -> Self {
        Self {
            vertex_array,
            shader,
            texture: None,
            position,
            size,
            visible: true,
        }
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Whether `point` (pixels) falls inside the element
    pub fn contains(&self, point: Vec2) -> bool {
        let max = self.position + self.size;
        point.cmpge(self.position).all() && point.cmplt(max).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_skips_hidden_elements() {
        let mut canvas = UiCanvas::new();
        let shown = UiElement::new(Default::default(), Default::default(), Vec2::ZERO, Vec2::ONE);
        let mut hidden = shown.clone();
        hidden.visible = false;
        canvas.add(shown);
        canvas.add(hidden);

        let mut queue = CommandQueue::new();
        canvas.render_ui(&RenderAssets::new(), &mut queue);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_element_contains() {
        let element = UiElement::new(
            Default::default(),
            Default::default(),
            Vec2::new(10.0, 10.0),
            Vec2::new(20.0, 5.0),
        );
        assert!(element.contains(Vec2::new(15.0, 12.0)));
        assert!(!element.contains(Vec2::new(31.0, 12.0)));
    }
}
