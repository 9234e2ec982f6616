//! Shader programs

use crate::backend::traits::*;
use crate::backend::types::*;

/// A linked shader program.
#[derive(Debug, Clone)]
pub struct Shader {
    id: ShaderId,
    label: String,
    stage: ShaderStage,
}

impl Shader {
    pub(crate) fn create(
        backend: &mut dyn GraphicsBackend,
        desc: &ShaderDescriptor,
    ) -> BackendResult<Self> {
        let id = backend.create_shader(desc)?;
        Ok(Self {
            id,
            label: desc.label.clone().unwrap_or_default(),
            stage: desc.source.stage(),
        })
    }

    pub fn id(&self) -> ShaderId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn is_compute(&self) -> bool {
        self.stage == ShaderStage::Compute
    }
}
