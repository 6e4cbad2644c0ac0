use crate::backend::RenderLimits;
use crate::error::{ensure_valid, RenderResult};
use crate::handle::{RawHandle, TextureHandle};

use super::common::{ClearState, Extent2d, Rect2d};
use super::texture::{TextureFormat, TextureInfo, TextureKind};

/// A texture level (and layer) rendered into.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FramebufferAttachment {
    pub texture: TextureHandle,
    pub layer: u32,
    pub level: u32,
}

impl FramebufferAttachment {
    #[inline]
    pub const fn new(texture: TextureHandle) -> Self {
        Self { texture, layer: 0, level: 0 }
    }
}

/// Framebuffer creation parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FramebufferDesc<'a> {
    pub extent: Extent2d,
    /// Defaults to the full extent.
    pub viewport: Option<Rect2d>,
    pub clear: ClearState,
    pub color: &'a [FramebufferAttachment],
    pub depth: Option<FramebufferAttachment>,
}

impl<'a> FramebufferDesc<'a> {
    pub fn new(extent: Extent2d, color: &'a [FramebufferAttachment]) -> Self {
        Self { extent, viewport: None, clear: ClearState::default(), color, depth: None }
    }

    pub fn with_depth(mut self, depth: FramebufferAttachment) -> Self {
        self.depth = Some(depth);
        self
    }

    pub(crate) fn validate(&self, limits: &RenderLimits) -> RenderResult<()> {
        ensure_valid!(!self.extent.is_empty(), "framebuffer extent {:?} is empty", self.extent);
        ensure_valid!(
            !self.color.is_empty() || self.depth.is_some(),
            "framebuffer has no attachments"
        );
        ensure_valid!(
            self.color.len() <= limits.max_color_attachments as usize,
            "{} color attachments exceed the limit of {}",
            self.color.len(),
            limits.max_color_attachments
        );
        if let Some(vp) = self.viewport {
            ensure_valid!(vp.width > 0 && vp.height > 0, "framebuffer viewport {vp:?} is empty");
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn resolved_viewport(&self) -> Rect2d {
        self.viewport.unwrap_or(Rect2d::from_extent(self.extent))
    }
}

/// Checks one attachment against the texture it names.
pub(crate) fn check_attachment(
    extent: Extent2d,
    texture: &TextureInfo,
    attachment: &FramebufferAttachment,
    depth: bool,
) -> RenderResult<()> {
    let what = if depth { "depth attachment" } else { "color attachment" };
    ensure_valid!(
        attachment.level < texture.levels,
        "{what} level {} out of range (texture has {})",
        attachment.level,
        texture.levels
    );
    let layers = match texture.kind {
        TextureKind::D3 => texture.level_extent(attachment.level).depth,
        _ => texture.layers,
    };
    ensure_valid!(
        attachment.layer < layers,
        "{what} layer {} out of range (texture has {layers})",
        attachment.layer
    );
    let at_level = texture.level_extent(attachment.level).to_2d();
    ensure_valid!(
        at_level == extent,
        "{what} extent {at_level:?} does not match framebuffer extent {extent:?}"
    );
    ensure_valid!(
        texture.format.is_depth() == depth,
        "{what} cannot use format {:?}",
        texture.format
    );
    Ok(())
}

/// Attachment with its texture resolved to a backend handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ResolvedAttachment {
    pub texture: RawHandle,
    pub kind: TextureKind,
    pub format: TextureFormat,
    pub layer: u32,
    pub level: u32,
}

/// Backend form of a [`FramebufferDesc`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FramebufferCreateInfo<'a> {
    pub extent: Extent2d,
    pub color: &'a [ResolvedAttachment],
    pub depth: Option<ResolvedAttachment>,
}

/// State kept for a framebuffer, including the default one.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FramebufferInfo {
    pub extent: Extent2d,
    pub viewport: Rect2d,
    pub clear: ClearState,
    pub color_attachments: u32,
    pub has_depth: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Extent3d, SamplerOptions};

    fn texture(format: TextureFormat, w: u32, h: u32, levels: u32) -> TextureInfo {
        TextureInfo {
            kind: TextureKind::D2,
            format,
            extent: Extent3d::flat(w, h),
            layers: 1,
            levels,
            sampler: SamplerOptions::default(),
        }
    }

    fn attachment() -> FramebufferAttachment {
        FramebufferAttachment::new(TextureHandle::new(0, 0))
    }

    #[test]
    fn framebuffer_needs_an_attachment() {
        let desc = FramebufferDesc::new(Extent2d::new(64, 64), &[]);
        assert!(desc.validate(&RenderLimits::default()).is_err());
        assert!(desc.with_depth(attachment()).validate(&RenderLimits::default()).is_ok());
    }

    #[test]
    fn attachment_extent_must_match() {
        let tex = texture(TextureFormat::Rgba8, 128, 128, 2);
        let extent = Extent2d::new(64, 64);
        assert!(check_attachment(extent, &tex, &attachment(), false).is_err());

        let level1 = FramebufferAttachment { level: 1, ..attachment() };
        assert!(check_attachment(extent, &tex, &level1, false).is_ok());

        let level2 = FramebufferAttachment { level: 2, ..attachment() };
        assert!(check_attachment(extent, &tex, &level2, false).is_err());
    }

    #[test]
    fn formats_must_match_attachment_slot() {
        let extent = Extent2d::new(32, 32);
        let color = texture(TextureFormat::Rgba8, 32, 32, 1);
        let depth = texture(TextureFormat::Depth24Stencil8, 32, 32, 1);
        assert!(check_attachment(extent, &color, &attachment(), true).is_err());
        assert!(check_attachment(extent, &depth, &attachment(), true).is_ok());
        assert!(check_attachment(extent, &depth, &attachment(), false).is_err());
    }

    #[test]
    fn layer_must_exist() {
        let mut tex = texture(TextureFormat::Rgba8, 16, 16, 1);
        tex.kind = TextureKind::D2Array;
        tex.layers = 4;
        let extent = Extent2d::new(16, 16);
        let l3 = FramebufferAttachment { layer: 3, ..attachment() };
        let l4 = FramebufferAttachment { layer: 4, ..attachment() };
        assert!(check_attachment(extent, &tex, &l3, false).is_ok());
        assert!(check_attachment(extent, &tex, &l4, false).is_err());
    }
}
