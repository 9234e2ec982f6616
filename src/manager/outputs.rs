//! Named pass outputs

use std::collections::HashMap;

use crate::backend::TextureId;

#[derive(Debug, Clone, PartialEq)]
struct PublishedOutput {
    texture: TextureId,
    pass: String,
    frame: u64,
}

/// Table of textures passes have published by name.
///
/// A name maps to whichever pass published it last. Entries persist across
/// frames, so a pass reading an output published later in the list sees the
/// previous frame's texture.
#[derive(Debug, Default)]
pub struct PassOutputs {
    entries: HashMap<String, PublishedOutput>,
}

impl PassOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `texture` under `name`, replacing any previous entry.
    ///
    /// Returns `true` when a different pass had already published the same
    /// name during `frame`.
    pub fn publish(&mut self, name: &str, texture: TextureId, pass: &str, frame: u64) -> bool {
        let collision = self
            .entries
            .get(name)
            .is_some_and(|previous| previous.frame == frame && previous.pass != pass);
        if collision {
            log::warn!(
                "Output '{}' published by pass '{}' replaces the one from another pass this frame",
                name,
                pass
            );
        }

        self.entries.insert(
            name.to_string(),
            PublishedOutput {
                texture,
                pass: pass.to_string(),
                frame,
            },
        );
        collision
    }

    pub fn get(&self, name: &str) -> Option<TextureId> {
        self.entries.get(name).map(|output| output.texture)
    }

    /// Name of the pass that published `name` last
    pub fn publisher(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|output| output.pass.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every output in table order, which is unspecified
    pub fn iter(&self) -> impl Iterator<Item = (&str, TextureId)> {
        self.entries
            .iter()
            .map(|(name, output)| (name.as_str(), output.texture))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_republish_is_idempotent() {
        let mut outputs = PassOutputs::new();
        assert!(!outputs.publish("SceneColor", TextureId(4), "MainPass", 0));
        assert!(!outputs.publish("SceneColor", TextureId(4), "MainPass", 0));
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs.get("SceneColor"), Some(TextureId(4)));
    }

    #[test]
    fn test_collision_last_writer_wins() {
        let mut outputs = PassOutputs::new();
        outputs.publish("SceneColor", TextureId(4), "MainPass", 3);
        assert!(outputs.publish("SceneColor", TextureId(9), "OtherPass", 3));
        assert_eq!(outputs.get("SceneColor"), Some(TextureId(9)));
        assert_eq!(outputs.publisher("SceneColor"), Some("OtherPass"));
    }

    #[test]
    fn test_next_frame_is_not_a_collision() {
        let mut outputs = PassOutputs::new();
        outputs.publish("ShadowMap", TextureId(1), "ShadowDepthPass", 0);
        assert!(!outputs.publish("ShadowMap", TextureId(2), "AnotherPass", 1));
    }
}
