use std::fmt;

use crate::error::{ensure_valid, RenderResult};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    TessControl,
    TessEval,
    Compute,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Geometry => "geometry",
            ShaderStage::TessControl => "tessellation control",
            ShaderStage::TessEval => "tessellation evaluation",
            ShaderStage::Compute => "compute",
        };
        f.write_str(s)
    }
}

/// One shader stage compiled from source text.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ShaderDesc<'a> {
    pub stage: ShaderStage,
    pub source: &'a str,
}

impl<'a> ShaderDesc<'a> {
    #[inline]
    pub const fn new(stage: ShaderStage, source: &'a str) -> Self {
        Self { stage, source }
    }

    pub(crate) fn validate(&self) -> RenderResult<()> {
        ensure_valid!(
            !self.source.trim().is_empty(),
            "{} shader source is empty",
            self.stage
        );
        Ok(())
    }

    pub(crate) fn create_info(&self) -> ShaderCreateInfo<'a> {
        ShaderCreateInfo { stage: self.stage, source: self.source }
    }
}

/// Backend form of a [`ShaderDesc`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ShaderCreateInfo<'a> {
    pub stage: ShaderStage,
    pub source: &'a str,
}

/// Metadata kept for a live shader.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ShaderInfo {
    pub stage: ShaderStage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_source_is_rejected() {
        assert!(ShaderDesc::new(ShaderStage::Vertex, "  \n\t").validate().is_err());
        assert!(ShaderDesc::new(ShaderStage::Vertex, "void main() {}").validate().is_ok());
    }

    #[test]
    fn stage_names_read_naturally() {
        let err = ShaderDesc::new(ShaderStage::TessEval, "").validate().unwrap_err();
        assert!(err.message.starts_with("tessellation evaluation shader"));
    }
}
