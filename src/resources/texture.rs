//! Texture resources

use crate::backend::traits::*;
use crate::backend::types::*;

/// A GPU texture registered in [`RenderAssets`](super::RenderAssets).
#[derive(Debug, Clone)]
pub struct Texture {
    id: TextureId,
    label: String,
    width: u32,
    height: u32,
    format: TextureFormat,
}

impl Texture {
    pub(crate) fn create(
        backend: &mut dyn GraphicsBackend,
        desc: &TextureDescriptor,
        pixels: Option<&[u8]>,
    ) -> BackendResult<Self> {
        if let Some(pixels) = pixels {
            let expected = (desc.width * desc.height * desc.format.bytes_per_pixel()) as usize;
            if pixels.len() != expected {
                return Err(BackendError::TextureCreationFailed(format!(
                    "{:?}: expected {} bytes of pixel data, got {}",
                    desc.label,
                    expected,
                    pixels.len()
                )));
            }
        }

        let id = backend.create_texture(desc)?;
        if let Some(pixels) = pixels {
            backend.write_texture(id, pixels, desc.width, desc.height);
        }

        Ok(Self {
            id,
            label: desc.label.clone().unwrap_or_default(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
        })
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }
}

/// Descriptor for a 1x1 texture of a single color
pub fn solid_color_descriptor(name: &str) -> TextureDescriptor {
    TextureDescriptor {
        label: Some(name.to_string()),
        width: 1,
        height: 1,
        format: TextureFormat::Rgba8UnormSrgb,
        filter: FilterMode::Nearest,
        usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    #[test]
    fn test_pixel_size_mismatch_is_rejected() {
        let mut backend = DummyBackend::default();
        let result = Texture::create(&mut backend, &solid_color_descriptor("white"), Some(&[255; 3]));
        assert!(matches!(result, Err(BackendError::TextureCreationFailed(_))));
    }

    #[test]
    fn test_solid_color_upload() {
        let mut backend = DummyBackend::default();
        let texture =
            Texture::create(&mut backend, &solid_color_descriptor("white"), Some(&[255; 4])).unwrap();
        assert_eq!(texture.size(), (1, 1));
        assert_eq!(texture.label(), "white");
    }
}
