//! Core enums to GL constants.

use shogle_core::{BackendError, BackendResult};
use shogle_core::render::IndexFormat;
use shogle_core::resource::{
    BlendFactor, BlendOp, BufferUsage, ClearFlags, CompareFunc, ComponentType, CullMode,
    FrontFace, MapAccess, PolygonMode, PrimitiveMode, ShaderStage, StencilOp, TextureAddress,
    TextureFilter, TextureFormat, TextureKind, VertexFormat,
};

/// Converts a size or offset to the `GLint` the API expects.
pub(crate) fn gl_int<T: TryInto<i32>>(value: T) -> BackendResult<i32> {
    value
        .try_into()
        .map_err(|_| BackendError::Api("value exceeds the GLint range".to_owned()))
}

/// Storage and transfer formats of a texel format.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct PixelFormat {
    pub internal: u32,
    pub format: u32,
    pub ty: u32,
    /// Whether host pixels in this format can be uploaded as-is.
    pub uploadable: bool,
}

pub(crate) const fn pixel_format(format: TextureFormat) -> PixelFormat {
    let (internal, format, ty, uploadable) = match format {
        TextureFormat::R8 => (glow::R8, glow::RED, glow::UNSIGNED_BYTE, true),
        TextureFormat::Rg8 => (glow::RG8, glow::RG, glow::UNSIGNED_BYTE, true),
        TextureFormat::Rgb8 => (glow::RGB8, glow::RGB, glow::UNSIGNED_BYTE, true),
        TextureFormat::Rgba8 => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE, true),
        TextureFormat::Srgb8 => (glow::SRGB8, glow::RGB, glow::UNSIGNED_BYTE, true),
        TextureFormat::Srgba8 => (glow::SRGB8_ALPHA8, glow::RGBA, glow::UNSIGNED_BYTE, true),
        TextureFormat::R16F => (glow::R16F, glow::RED, glow::HALF_FLOAT, true),
        TextureFormat::Rg16F => (glow::RG16F, glow::RG, glow::HALF_FLOAT, true),
        TextureFormat::Rgba16F => (glow::RGBA16F, glow::RGBA, glow::HALF_FLOAT, true),
        TextureFormat::R32F => (glow::R32F, glow::RED, glow::FLOAT, true),
        TextureFormat::Rg32F => (glow::RG32F, glow::RG, glow::FLOAT, true),
        TextureFormat::Rgb32F => (glow::RGB32F, glow::RGB, glow::FLOAT, true),
        TextureFormat::Rgba32F => (glow::RGBA32F, glow::RGBA, glow::FLOAT, true),
        TextureFormat::R32U => (glow::R32UI, glow::RED_INTEGER, glow::UNSIGNED_INT, true),
        TextureFormat::R32I => (glow::R32I, glow::RED_INTEGER, glow::INT, true),
        TextureFormat::Depth16 => {
            (glow::DEPTH_COMPONENT16, glow::DEPTH_COMPONENT, glow::UNSIGNED_SHORT, true)
        }
        // Three packed bytes have no GL transfer type.
        TextureFormat::Depth24 => {
            (glow::DEPTH_COMPONENT24, glow::DEPTH_COMPONENT, glow::UNSIGNED_INT, false)
        }
        TextureFormat::Depth32F => {
            (glow::DEPTH_COMPONENT32F, glow::DEPTH_COMPONENT, glow::FLOAT, true)
        }
        TextureFormat::Depth24Stencil8 => {
            (glow::DEPTH24_STENCIL8, glow::DEPTH_STENCIL, glow::UNSIGNED_INT_24_8, true)
        }
    };
    PixelFormat { internal, format, ty, uploadable }
}

pub(crate) const fn texture_target(kind: TextureKind) -> u32 {
    match kind {
        TextureKind::D2 => glow::TEXTURE_2D,
        TextureKind::D2Array => glow::TEXTURE_2D_ARRAY,
        TextureKind::D3 => glow::TEXTURE_3D,
        TextureKind::Cubemap => glow::TEXTURE_CUBE_MAP,
    }
}

/// Target of one cubemap face.
#[inline]
pub(crate) const fn cube_face(layer: u32) -> u32 {
    glow::TEXTURE_CUBE_MAP_POSITIVE_X + layer
}

pub(crate) const fn min_filter(min: TextureFilter, mip: Option<TextureFilter>) -> u32 {
    match (min, mip) {
        (TextureFilter::Nearest, None) => glow::NEAREST,
        (TextureFilter::Linear, None) => glow::LINEAR,
        (TextureFilter::Nearest, Some(TextureFilter::Nearest)) => glow::NEAREST_MIPMAP_NEAREST,
        (TextureFilter::Nearest, Some(TextureFilter::Linear)) => glow::NEAREST_MIPMAP_LINEAR,
        (TextureFilter::Linear, Some(TextureFilter::Nearest)) => glow::LINEAR_MIPMAP_NEAREST,
        (TextureFilter::Linear, Some(TextureFilter::Linear)) => glow::LINEAR_MIPMAP_LINEAR,
    }
}

pub(crate) const fn mag_filter(mag: TextureFilter) -> u32 {
    match mag {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
    }
}

pub(crate) const fn address_mode(address: TextureAddress) -> u32 {
    match address {
        TextureAddress::Repeat => glow::REPEAT,
        TextureAddress::MirroredRepeat => glow::MIRRORED_REPEAT,
        TextureAddress::ClampToEdge => glow::CLAMP_TO_EDGE,
        TextureAddress::ClampToBorder => glow::CLAMP_TO_BORDER,
    }
}

pub(crate) const fn buffer_usage(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::Static => glow::STATIC_DRAW,
        BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
        BufferUsage::Readback => glow::DYNAMIC_READ,
    }
}

pub(crate) const fn map_access(access: MapAccess) -> u32 {
    match access {
        MapAccess::Read => glow::MAP_READ_BIT,
        MapAccess::Write => glow::MAP_WRITE_BIT,
        MapAccess::ReadWrite => glow::MAP_READ_BIT | glow::MAP_WRITE_BIT,
    }
}

pub(crate) const fn shader_type(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        ShaderStage::Geometry => glow::GEOMETRY_SHADER,
        ShaderStage::TessControl => glow::TESS_CONTROL_SHADER,
        ShaderStage::TessEval => glow::TESS_EVALUATION_SHADER,
        ShaderStage::Compute => glow::COMPUTE_SHADER,
    }
}

pub(crate) const fn primitive(mode: PrimitiveMode) -> u32 {
    match mode {
        PrimitiveMode::Points => glow::POINTS,
        PrimitiveMode::Lines => glow::LINES,
        PrimitiveMode::LineStrip => glow::LINE_STRIP,
        PrimitiveMode::Triangles => glow::TRIANGLES,
        PrimitiveMode::TriangleStrip => glow::TRIANGLE_STRIP,
        PrimitiveMode::TriangleFan => glow::TRIANGLE_FAN,
    }
}

pub(crate) const fn index_type(format: IndexFormat) -> u32 {
    match format {
        IndexFormat::U8 => glow::UNSIGNED_BYTE,
        IndexFormat::U16 => glow::UNSIGNED_SHORT,
        IndexFormat::U32 => glow::UNSIGNED_INT,
    }
}

pub(crate) const fn component_type(ty: ComponentType) -> u32 {
    match ty {
        ComponentType::F32 => glow::FLOAT,
        ComponentType::I32 => glow::INT,
        ComponentType::U32 => glow::UNSIGNED_INT,
        ComponentType::I16 => glow::SHORT,
        ComponentType::U16 => glow::UNSIGNED_SHORT,
        ComponentType::U8 => glow::UNSIGNED_BYTE,
    }
}

/// How an attribute is declared to the vertex fetch stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum AttribFetch {
    /// Read as float, normalizing fixed-point data when `normalized`.
    Float { normalized: bool },
    /// Read as a signed or unsigned integer.
    Integer,
}

pub(crate) const fn attrib_fetch(format: VertexFormat) -> AttribFetch {
    if format.is_integer() {
        AttribFetch::Integer
    } else {
        AttribFetch::Float { normalized: format.is_normalized() }
    }
}

pub(crate) const fn compare_func(func: CompareFunc) -> u32 {
    match func {
        CompareFunc::Never => glow::NEVER,
        CompareFunc::Less => glow::LESS,
        CompareFunc::Equal => glow::EQUAL,
        CompareFunc::LessEqual => glow::LEQUAL,
        CompareFunc::Greater => glow::GREATER,
        CompareFunc::NotEqual => glow::NOTEQUAL,
        CompareFunc::GreaterEqual => glow::GEQUAL,
        CompareFunc::Always => glow::ALWAYS,
    }
}

pub(crate) const fn stencil_op(op: StencilOp) -> u32 {
    match op {
        StencilOp::Keep => glow::KEEP,
        StencilOp::Zero => glow::ZERO,
        StencilOp::Replace => glow::REPLACE,
        StencilOp::Increment => glow::INCR,
        StencilOp::IncrementWrap => glow::INCR_WRAP,
        StencilOp::Decrement => glow::DECR,
        StencilOp::DecrementWrap => glow::DECR_WRAP,
        StencilOp::Invert => glow::INVERT,
    }
}

pub(crate) const fn blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcColor => glow::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => glow::DST_COLOR,
        BlendFactor::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => glow::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
        BlendFactor::ConstantColor => glow::CONSTANT_COLOR,
        BlendFactor::OneMinusConstantColor => glow::ONE_MINUS_CONSTANT_COLOR,
    }
}

pub(crate) const fn blend_op(op: BlendOp) -> u32 {
    match op {
        BlendOp::Add => glow::FUNC_ADD,
        BlendOp::Subtract => glow::FUNC_SUBTRACT,
        BlendOp::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
        BlendOp::Min => glow::MIN,
        BlendOp::Max => glow::MAX,
    }
}

pub(crate) const fn cull_face(mode: CullMode) -> u32 {
    match mode {
        CullMode::Front => glow::FRONT,
        CullMode::Back => glow::BACK,
        CullMode::FrontAndBack => glow::FRONT_AND_BACK,
    }
}

pub(crate) const fn front_face(face: FrontFace) -> u32 {
    match face {
        FrontFace::CounterClockwise => glow::CCW,
        FrontFace::Clockwise => glow::CW,
    }
}

pub(crate) const fn polygon_mode(mode: PolygonMode) -> u32 {
    match mode {
        PolygonMode::Fill => glow::FILL,
        PolygonMode::Line => glow::LINE,
        PolygonMode::Point => glow::POINT,
    }
}

pub(crate) fn clear_mask(flags: ClearFlags) -> u32 {
    let mut mask = 0;
    if flags.contains(ClearFlags::COLOR) {
        mask |= glow::COLOR_BUFFER_BIT;
    }
    if flags.contains(ClearFlags::DEPTH) {
        mask |= glow::DEPTH_BUFFER_BIT;
    }
    if flags.contains(ClearFlags::STENCIL) {
        mask |= glow::STENCIL_BUFFER_BIT;
    }
    mask
}

/// Readable name of a `glCheckFramebufferStatus` result.
pub(crate) fn framebuffer_status_name(status: u32) -> String {
    let name = match status {
        glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => "incomplete attachment",
        glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => "missing attachment",
        glow::FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER => "incomplete draw buffer",
        glow::FRAMEBUFFER_INCOMPLETE_READ_BUFFER => "incomplete read buffer",
        glow::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => "incomplete multisample",
        glow::FRAMEBUFFER_INCOMPLETE_LAYER_TARGETS => "incomplete layer targets",
        glow::FRAMEBUFFER_UNSUPPORTED => "unsupported attachment combination",
        _ => return format!("status 0x{status:04X}"),
    };
    name.to_owned()
}

/// Readable name of a `glGetError` code.
pub(crate) fn error_name(code: u32) -> &'static str {
    match code {
        glow::INVALID_ENUM => "GL_INVALID_ENUM",
        glow::INVALID_VALUE => "GL_INVALID_VALUE",
        glow::INVALID_OPERATION => "GL_INVALID_OPERATION",
        glow::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        glow::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        glow::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
        glow::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
        _ => "unknown GL error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_filter_combines_with_min_filter() {
        assert_eq!(min_filter(TextureFilter::Linear, None), glow::LINEAR);
        assert_eq!(
            min_filter(TextureFilter::Linear, Some(TextureFilter::Nearest)),
            glow::LINEAR_MIPMAP_NEAREST
        );
        assert_eq!(
            min_filter(TextureFilter::Nearest, Some(TextureFilter::Linear)),
            glow::NEAREST_MIPMAP_LINEAR
        );
    }

    #[test]
    fn integer_formats_use_integer_transfer() {
        let f = pixel_format(TextureFormat::R32U);
        assert_eq!((f.internal, f.format), (glow::R32UI, glow::RED_INTEGER));
        assert!(!pixel_format(TextureFormat::Depth24).uploadable);
        assert_eq!(pixel_format(TextureFormat::Srgba8).internal, glow::SRGB8_ALPHA8);
    }

    #[test]
    fn attribute_fetch_follows_the_format() {
        assert_eq!(attrib_fetch(VertexFormat::F32x3), AttribFetch::Float { normalized: false });
        assert_eq!(attrib_fetch(VertexFormat::U8x4Norm), AttribFetch::Float { normalized: true });
        assert_eq!(attrib_fetch(VertexFormat::I32x2), AttribFetch::Integer);
        assert_eq!(attrib_fetch(VertexFormat::U16x2), AttribFetch::Integer);
    }

    #[test]
    fn clear_mask_bits() {
        assert_eq!(clear_mask(ClearFlags::empty()), 0);
        assert_eq!(
            clear_mask(ClearFlags::COLOR | ClearFlags::STENCIL),
            glow::COLOR_BUFFER_BIT | glow::STENCIL_BUFFER_BIT
        );
    }

    #[test]
    fn gl_int_rejects_overflow() {
        assert_eq!(gl_int(12usize).unwrap(), 12);
        assert!(gl_int(u32::MAX).is_err());
    }

    #[test]
    fn cube_faces_are_consecutive() {
        assert_eq!(cube_face(0), glow::TEXTURE_CUBE_MAP_POSITIVE_X);
        assert_eq!(cube_face(5), glow::TEXTURE_CUBE_MAP_NEGATIVE_Z);
    }

    #[test]
    fn unknown_status_prints_hex() {
        assert_eq!(framebuffer_status_name(0x1234), "status 0x1234");
        assert_eq!(framebuffer_status_name(glow::FRAMEBUFFER_UNSUPPORTED), "unsupported attachment combination");
    }
}
