use crate::backend::RenderLimits;
use crate::error::{ensure_valid, RenderResult};

use super::common::{Color, Extent3d};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureKind {
    D2,
    D2Array,
    D3,
    Cubemap,
}

impl TextureKind {
    /// Whether `layers` addresses separate images (array slices or cube faces).
    #[inline]
    pub fn is_layered(self) -> bool {
        matches!(self, TextureKind::D2Array | TextureKind::Cubemap)
    }
}

/// Texel storage format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
    Srgb8,
    Srgba8,
    R16F,
    Rg16F,
    Rgba16F,
    R32F,
    Rg32F,
    Rgb32F,
    Rgba32F,
    R32U,
    R32I,
    Depth16,
    Depth24,
    Depth32F,
    Depth24Stencil8,
}

impl TextureFormat {
    pub const fn bytes_per_texel(self) -> usize {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::Rg8 | TextureFormat::R16F | TextureFormat::Depth16 => 2,
            TextureFormat::Rgb8 | TextureFormat::Srgb8 | TextureFormat::Depth24 => 3,
            TextureFormat::Rgba8
            | TextureFormat::Srgba8
            | TextureFormat::Rg16F
            | TextureFormat::R32F
            | TextureFormat::R32U
            | TextureFormat::R32I
            | TextureFormat::Depth32F
            | TextureFormat::Depth24Stencil8 => 4,
            TextureFormat::Rgba16F | TextureFormat::Rg32F => 8,
            TextureFormat::Rgb32F => 12,
            TextureFormat::Rgba32F => 16,
        }
    }

    #[inline]
    pub const fn is_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16
                | TextureFormat::Depth24
                | TextureFormat::Depth32F
                | TextureFormat::Depth24Stencil8
        )
    }

    /// Texels are read as unnormalized integers.
    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(self, TextureFormat::R32U | TextureFormat::R32I)
    }

    #[inline]
    pub const fn has_stencil(self) -> bool {
        matches!(self, TextureFormat::Depth24Stencil8)
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TextureAddress {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

/// Sampling and addressing options.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct SamplerOptions {
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    /// Filter between mip levels; `None` samples level 0 only.
    pub mip_filter: Option<TextureFilter>,
    pub address_u: TextureAddress,
    pub address_v: TextureAddress,
    pub address_w: TextureAddress,
    pub border_color: Color,
}

impl SamplerOptions {
    pub fn nearest() -> Self {
        Self {
            min_filter: TextureFilter::Nearest,
            mag_filter: TextureFilter::Nearest,
            ..Default::default()
        }
    }

    pub fn clamped(mut self) -> Self {
        self.address_u = TextureAddress::ClampToEdge;
        self.address_v = TextureAddress::ClampToEdge;
        self.address_w = TextureAddress::ClampToEdge;
        self
    }
}

/// Pixels as produced by an image or font loader.
///
/// Rows are padded to `alignment` bytes; layers (array slices, cube faces)
/// follow each other.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureImage<'a> {
    pub pixels: &'a [u8],
    pub extent: Extent3d,
    pub format: TextureFormat,
    pub alignment: u32,
}

impl<'a> TextureImage<'a> {
    /// Tightly packed image (alignment 1).
    pub fn packed(pixels: &'a [u8], extent: Extent3d, format: TextureFormat) -> Self {
        Self { pixels, extent, format, alignment: 1 }
    }

    fn validate_shape(&self, layers: u32) -> RenderResult<()> {
        ensure_valid!(
            matches!(self.alignment, 1 | 2 | 4 | 8),
            "image row alignment must be 1, 2, 4 or 8 (got {})",
            self.alignment
        );
        ensure_valid!(!self.extent.is_empty(), "image extent {:?} is empty", self.extent);
        let expected = image_byte_size(self.extent, self.format, self.alignment, layers);
        ensure_valid!(
            expected == Some(self.pixels.len()),
            "image payload is {} bytes, expected {} for {:?} {:?} x{} layer(s) (align {})",
            self.pixels.len(),
            expected.unwrap_or(usize::MAX),
            self.extent,
            self.format,
            layers,
            self.alignment
        );
        Ok(())
    }
}

/// Texel offset inside a mip level.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Origin3d {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

/// Pixel update for part of one level of one layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureUpload<'a> {
    pub image: TextureImage<'a>,
    pub origin: Origin3d,
    pub layer: u32,
    pub level: u32,
}

impl<'a> TextureUpload<'a> {
    /// Whole-image upload to level 0 of layer 0.
    pub fn full(image: TextureImage<'a>) -> Self {
        Self { image, origin: Origin3d::default(), layer: 0, level: 0 }
    }
}

/// Texture creation parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextureDesc<'a> {
    pub kind: TextureKind,
    pub format: TextureFormat,
    pub extent: Extent3d,
    pub layers: u32,
    pub levels: u32,
    pub sampler: SamplerOptions,
    /// Level 0 contents for every layer.
    pub data: Option<TextureImage<'a>>,
    /// Fill levels `1..levels` from level 0 after the initial upload.
    pub generate_mipmaps: bool,
}

impl<'a> TextureDesc<'a> {
    /// Single-level 2D texture filled from `image`.
    pub fn from_image(image: TextureImage<'a>, sampler: SamplerOptions) -> Self {
        Self {
            kind: TextureKind::D2,
            format: image.format,
            extent: image.extent,
            layers: 1,
            levels: 1,
            sampler,
            data: Some(image),
            generate_mipmaps: false,
        }
    }

    /// Empty 2D texture, typically a render target.
    pub fn render_target(format: TextureFormat, width: u32, height: u32) -> Self {
        Self {
            kind: TextureKind::D2,
            format,
            extent: Extent3d::flat(width, height),
            layers: 1,
            levels: 1,
            sampler: SamplerOptions::default().clamped(),
            data: None,
            generate_mipmaps: false,
        }
    }

    pub(crate) fn validate(&self, limits: &RenderLimits) -> RenderResult<()> {
        let e = self.extent;
        ensure_valid!(!e.is_empty(), "texture extent {e:?} is empty");
        ensure_valid!(self.layers >= 1, "texture must have at least one layer");

        match self.kind {
            TextureKind::D2 => {
                ensure_valid!(e.depth == 1, "2D texture depth must be 1 (got {})", e.depth);
                ensure_valid!(self.layers == 1, "2D texture must have exactly one layer");
            }
            TextureKind::D2Array => {
                ensure_valid!(e.depth == 1, "2D array texture depth must be 1 (got {})", e.depth);
                ensure_valid!(
                    self.layers <= limits.max_array_layers,
                    "{} layers exceed the limit of {}",
                    self.layers,
                    limits.max_array_layers
                );
            }
            TextureKind::D3 => {
                ensure_valid!(self.layers == 1, "3D texture must have exactly one layer");
                ensure_valid!(
                    e.width.max(e.height).max(e.depth) <= limits.max_3d_texture_size,
                    "3D extent {e:?} exceeds the limit of {}",
                    limits.max_3d_texture_size
                );
            }
            TextureKind::Cubemap => {
                ensure_valid!(e.width == e.height, "cubemap faces must be square (got {e:?})");
                ensure_valid!(e.depth == 1, "cubemap depth must be 1 (got {})", e.depth);
                ensure_valid!(self.layers == 6, "cubemap must have 6 layers (got {})", self.layers);
            }
        }

        ensure_valid!(
            e.width.max(e.height) <= limits.max_texture_size,
            "texture extent {e:?} exceeds the limit of {}",
            limits.max_texture_size
        );

        let max_levels = mip_levels(e);
        ensure_valid!(
            (1..=max_levels).contains(&self.levels),
            "texture levels must be within 1..={max_levels} (got {})",
            self.levels
        );
        ensure_valid!(
            !self.generate_mipmaps || self.levels > 1,
            "mipmap generation requested for a single-level texture"
        );
        ensure_valid!(
            !(self.generate_mipmaps && self.format.is_depth()),
            "mipmaps cannot be generated for depth format {:?}",
            self.format
        );
        ensure_valid!(
            !(self.generate_mipmaps && self.format.is_integer()),
            "mipmaps cannot be generated for integer format {:?}",
            self.format
        );

        if let Some(image) = &self.data {
            ensure_valid!(
                image.format == self.format,
                "image format {:?} does not match texture format {:?}",
                image.format,
                self.format
            );
            ensure_valid!(
                image.extent == e,
                "image extent {:?} does not match texture extent {e:?}",
                image.extent
            );
            image.validate_shape(self.layers)?;
        }
        Ok(())
    }

    pub(crate) fn create_info(&self) -> TextureCreateInfo<'a> {
        TextureCreateInfo {
            kind: self.kind,
            format: self.format,
            extent: self.extent,
            layers: self.layers,
            levels: self.levels,
            sampler: self.sampler,
            data: self.data,
            generate_mipmaps: self.generate_mipmaps,
        }
    }
}

/// Backend form of a [`TextureDesc`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextureCreateInfo<'a> {
    pub kind: TextureKind,
    pub format: TextureFormat,
    pub extent: Extent3d,
    pub layers: u32,
    pub levels: u32,
    pub sampler: SamplerOptions,
    pub data: Option<TextureImage<'a>>,
    pub generate_mipmaps: bool,
}

/// Metadata kept for a live texture.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextureInfo {
    pub kind: TextureKind,
    pub format: TextureFormat,
    pub extent: Extent3d,
    pub layers: u32,
    pub levels: u32,
    pub sampler: SamplerOptions,
}

impl TextureInfo {
    /// Extent of mip `level`.
    #[inline]
    pub fn level_extent(&self, level: u32) -> Extent3d {
        level_extent(self.extent, level)
    }

    pub(crate) fn validate_upload(&self, upload: &TextureUpload<'_>) -> RenderResult<()> {
        ensure_valid!(
            upload.level < self.levels,
            "upload level {} out of range (texture has {})",
            upload.level,
            self.levels
        );
        ensure_valid!(
            upload.layer < self.layers,
            "upload layer {} out of range (texture has {})",
            upload.layer,
            self.layers
        );
        ensure_valid!(
            upload.image.format == self.format,
            "upload format {:?} does not match texture format {:?}",
            upload.image.format,
            self.format
        );
        upload.image.validate_shape(1)?;

        let lvl = self.level_extent(upload.level);
        let o = upload.origin;
        let ie = upload.image.extent;
        let fits = |origin: u32, len: u32, max: u32| origin.checked_add(len).is_some_and(|end| end <= max);
        ensure_valid!(
            fits(o.x, ie.width, lvl.width) && fits(o.y, ie.height, lvl.height) && fits(o.z, ie.depth, lvl.depth),
            "upload region {o:?} + {ie:?} exceeds level {} extent {lvl:?}",
            upload.level
        );
        Ok(())
    }
}

/// Number of levels in a full mip chain for `extent`.
pub fn mip_levels(extent: Extent3d) -> u32 {
    let largest = extent.width.max(extent.height).max(extent.depth).max(1);
    32 - largest.leading_zeros()
}

/// Extent of mip `level`, never smaller than one texel per axis.
pub fn level_extent(extent: Extent3d, level: u32) -> Extent3d {
    let shrink = |v: u32| v.checked_shr(level).unwrap_or(0).max(1);
    Extent3d::new(shrink(extent.width), shrink(extent.height), shrink(extent.depth))
}

/// Bytes needed for `layers` images of `extent` in `format` with padded rows.
pub fn image_byte_size(
    extent: Extent3d,
    format: TextureFormat,
    alignment: u32,
    layers: u32,
) -> Option<usize> {
    let align = alignment.max(1) as usize;
    let row = (extent.width as usize).checked_mul(format.bytes_per_texel())?;
    let row = row.checked_add(align - 1)? / align * align;
    row.checked_mul(extent.height as usize)?
        .checked_mul(extent.depth as usize)?
        .checked_mul(layers as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> RenderLimits {
        RenderLimits::default()
    }

    // ── sizes ─────────────────────────────────────────────────────────────

    #[test]
    fn mip_chain_lengths() {
        assert_eq!(mip_levels(Extent3d::flat(1, 1)), 1);
        assert_eq!(mip_levels(Extent3d::flat(256, 256)), 9);
        assert_eq!(mip_levels(Extent3d::flat(300, 17)), 9);
        assert_eq!(level_extent(Extent3d::flat(300, 17), 5), Extent3d::flat(9, 1));
    }

    #[test]
    fn row_alignment_pads_rows() {
        // 3 RGB texels = 9 bytes, padded to 12 with alignment 4.
        let size = image_byte_size(Extent3d::flat(3, 2), TextureFormat::Rgb8, 4, 1);
        assert_eq!(size, Some(24));
        let packed = image_byte_size(Extent3d::flat(3, 2), TextureFormat::Rgb8, 1, 1);
        assert_eq!(packed, Some(18));
    }

    // ── creation ──────────────────────────────────────────────────────────

    #[test]
    fn payload_size_must_match_extent_and_format() {
        let pixels = [0u8; 16];
        let img = TextureImage::packed(&pixels, Extent3d::flat(2, 2), TextureFormat::Rgba8);
        let desc = TextureDesc::from_image(img, SamplerOptions::default());
        assert!(desc.validate(&limits()).is_ok());

        let short = TextureImage { pixels: &pixels[..12], ..img };
        let desc = TextureDesc::from_image(short, SamplerOptions::default());
        assert!(desc.validate(&limits()).is_err());
    }

    #[test]
    fn array_payload_covers_all_layers() {
        let pixels = vec![0u8; 4 * 4 * 3];
        let img = TextureImage::packed(&pixels, Extent3d::flat(2, 2), TextureFormat::Rgba8);
        let mut desc = TextureDesc::from_image(img, SamplerOptions::default());
        desc.kind = TextureKind::D2Array;
        desc.layers = 3;
        assert!(desc.validate(&limits()).is_ok());
        desc.layers = 2;
        assert!(desc.validate(&limits()).is_err());
    }

    #[test]
    fn cubemap_shape_rules() {
        let mut desc = TextureDesc::render_target(TextureFormat::Rgba8, 64, 64);
        desc.kind = TextureKind::Cubemap;
        assert!(desc.validate(&limits()).is_err());
        desc.layers = 6;
        assert!(desc.validate(&limits()).is_ok());
        desc.extent.height = 32;
        assert!(desc.validate(&limits()).is_err());
    }

    #[test]
    fn level_count_is_bounded_by_extent() {
        let mut desc = TextureDesc::render_target(TextureFormat::Rgba8, 8, 8);
        desc.levels = 4;
        assert!(desc.validate(&limits()).is_ok());
        desc.levels = 5;
        assert!(desc.validate(&limits()).is_err());
        desc.levels = 0;
        assert!(desc.validate(&limits()).is_err());
    }

    #[test]
    fn mipmap_generation_needs_a_filterable_format() {
        let mut desc = TextureDesc::render_target(TextureFormat::Rgba8, 8, 8);
        desc.levels = 4;
        desc.generate_mipmaps = true;
        assert!(desc.validate(&limits()).is_ok());

        for format in [TextureFormat::R32U, TextureFormat::R32I, TextureFormat::Depth24] {
            desc.format = format;
            let err = desc.validate(&limits()).unwrap_err();
            assert!(err.message.contains("mipmaps cannot be generated"), "{}", err.message);
        }
    }

    #[test]
    fn oversized_texture_is_rejected() {
        let l = limits();
        let desc = TextureDesc::render_target(TextureFormat::R8, l.max_texture_size + 1, 1);
        assert!(desc.validate(&l).is_err());
    }

    // ── uploads ───────────────────────────────────────────────────────────

    #[test]
    fn upload_region_must_fit_level() {
        let info = TextureInfo {
            kind: TextureKind::D2,
            format: TextureFormat::R8,
            extent: Extent3d::flat(8, 8),
            layers: 1,
            levels: 2,
            sampler: SamplerOptions::default(),
        };
        let px = [0u8; 16];
        let img = TextureImage::packed(&px, Extent3d::flat(4, 4), TextureFormat::R8);

        let ok = TextureUpload { image: img, origin: Origin3d { x: 4, y: 4, z: 0 }, layer: 0, level: 0 };
        assert!(info.validate_upload(&ok).is_ok());

        let level1 = TextureUpload { level: 1, origin: Origin3d::default(), ..ok };
        assert!(info.validate_upload(&level1).is_ok());

        let spill = TextureUpload { level: 1, origin: Origin3d { x: 1, y: 0, z: 0 }, ..ok };
        assert!(info.validate_upload(&spill).is_err());

        let bad_layer = TextureUpload { layer: 1, ..ok };
        assert!(info.validate_upload(&bad_layer).is_err());
    }
}
