use crate::backend::RenderLimits;
use crate::error::{ensure_valid, RenderResult};
use crate::handle::{RawHandle, ShaderHandle};

use super::common::Color;
use super::shader::ShaderStage;

/// Highest number of vertex attribute locations a command can bind.
pub const MAX_VERTEX_BINDINGS: usize = 16;

/// Component layout of one vertex attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexFormat {
    F32,
    F32x2,
    F32x3,
    F32x4,
    I32,
    I32x2,
    I32x3,
    I32x4,
    U32,
    U32x2,
    U32x3,
    U32x4,
    U8x4,
    U8x4Norm,
    I16x2,
    I16x2Norm,
    U16x2,
    U16x2Norm,
}

/// Scalar type of a vertex component, as the backend sees it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ComponentType {
    F32,
    I32,
    U32,
    I16,
    U16,
    U8,
}

impl VertexFormat {
    pub const fn components(self) -> u32 {
        match self {
            VertexFormat::F32 | VertexFormat::I32 | VertexFormat::U32 => 1,
            VertexFormat::F32x2
            | VertexFormat::I32x2
            | VertexFormat::U32x2
            | VertexFormat::I16x2
            | VertexFormat::I16x2Norm
            | VertexFormat::U16x2
            | VertexFormat::U16x2Norm => 2,
            VertexFormat::F32x3 | VertexFormat::I32x3 | VertexFormat::U32x3 => 3,
            VertexFormat::F32x4
            | VertexFormat::I32x4
            | VertexFormat::U32x4
            | VertexFormat::U8x4
            | VertexFormat::U8x4Norm => 4,
        }
    }

    pub const fn component_type(self) -> ComponentType {
        match self {
            VertexFormat::F32 | VertexFormat::F32x2 | VertexFormat::F32x3 | VertexFormat::F32x4 => {
                ComponentType::F32
            }
            VertexFormat::I32 | VertexFormat::I32x2 | VertexFormat::I32x3 | VertexFormat::I32x4 => {
                ComponentType::I32
            }
            VertexFormat::U32 | VertexFormat::U32x2 | VertexFormat::U32x3 | VertexFormat::U32x4 => {
                ComponentType::U32
            }
            VertexFormat::U8x4 | VertexFormat::U8x4Norm => ComponentType::U8,
            VertexFormat::I16x2 | VertexFormat::I16x2Norm => ComponentType::I16,
            VertexFormat::U16x2 | VertexFormat::U16x2Norm => ComponentType::U16,
        }
    }

    /// Integer components reach the shader normalized to `[0, 1]` / `[-1, 1]`.
    pub const fn is_normalized(self) -> bool {
        matches!(
            self,
            VertexFormat::U8x4Norm | VertexFormat::I16x2Norm | VertexFormat::U16x2Norm
        )
    }

    /// Integer components reach the shader as integers, not floats.
    pub const fn is_integer(self) -> bool {
        !self.is_normalized() && !matches!(self.component_type(), ComponentType::F32)
    }

    /// Size of one attribute value in bytes.
    pub const fn size(self) -> u32 {
        let component = match self.component_type() {
            ComponentType::F32 | ComponentType::I32 | ComponentType::U32 => 4,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::U8 => 1,
        };
        component * self.components()
    }
}

/// Rate at which an attribute advances.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum VertexStep {
    #[default]
    Vertex,
    /// Advances once every `n` instances.
    Instance(u32),
}

/// One attribute location read from a vertex buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    /// Byte offset of the attribute inside one element.
    pub offset: u32,
    /// Distance between consecutive elements; `0` means tightly packed.
    pub stride: u32,
    pub step: VertexStep,
}

impl VertexAttribute {
    pub const fn new(location: u32, format: VertexFormat, offset: u32, stride: u32) -> Self {
        Self { location, format, offset, stride, step: VertexStep::Vertex }
    }

    /// Stride the backend should use, resolving `0` to the attribute size.
    #[inline]
    pub const fn effective_stride(&self) -> u32 {
        if self.stride == 0 { self.format.size() } else { self.stride }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DepthTest {
    pub func: CompareFunc,
    pub write: bool,
}

impl Default for DepthTest {
    fn default() -> Self {
        Self { func: CompareFunc::Less, write: true }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Increment,
    IncrementWrap,
    Decrement,
    DecrementWrap,
    Invert,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StencilTest {
    pub func: CompareFunc,
    pub reference: i32,
    pub read_mask: u32,
    pub write_mask: u32,
    pub fail: StencilOp,
    pub depth_fail: StencilOp,
    pub pass: StencilOp,
}

impl Default for StencilTest {
    fn default() -> Self {
        Self {
            func: CompareFunc::Always,
            reference: 0,
            read_mask: !0,
            write_mask: !0,
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass: StencilOp::Keep,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum BlendOp {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Separate color / alpha blend equations.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BlendState {
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub color_op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub alpha_op: BlendOp,
    pub constant: Color,
}

impl BlendState {
    /// Straight alpha blending.
    pub const fn alpha() -> Self {
        Self {
            src_color: BlendFactor::SrcAlpha,
            dst_color: BlendFactor::OneMinusSrcAlpha,
            color_op: BlendOp::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::OneMinusSrcAlpha,
            alpha_op: BlendOp::Add,
            constant: Color::TRANSPARENT,
        }
    }

    /// Premultiplied alpha blending.
    pub const fn premultiplied() -> Self {
        Self {
            src_color: BlendFactor::One,
            dst_color: BlendFactor::OneMinusSrcAlpha,
            ..Self::alpha()
        }
    }

    pub const fn additive() -> Self {
        Self {
            src_color: BlendFactor::One,
            dst_color: BlendFactor::One,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::One,
            ..Self::alpha()
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CullMode {
    Front,
    Back,
    FrontAndBack,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum FrontFace {
    #[default]
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
    Point,
}

/// Fixed-function state applied before each draw with the pipeline.
///
/// `None` disables the corresponding test.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct PipelineTests {
    pub depth: Option<DepthTest>,
    pub stencil: Option<StencilTest>,
    pub blend: Option<BlendState>,
    pub cull: Option<CullMode>,
    pub front_face: FrontFace,
    pub polygon: PolygonMode,
}

/// Pipeline creation parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PipelineDesc<'a> {
    pub stages: &'a [ShaderHandle],
    pub attributes: &'a [VertexAttribute],
    pub primitive: PrimitiveMode,
    pub tests: PipelineTests,
}

impl<'a> PipelineDesc<'a> {
    pub fn new(stages: &'a [ShaderHandle], attributes: &'a [VertexAttribute]) -> Self {
        Self { stages, attributes, primitive: PrimitiveMode::Triangles, tests: PipelineTests::default() }
    }

    pub(crate) fn validate_attributes(&self, limits: &RenderLimits) -> RenderResult<()> {
        let max = (limits.max_vertex_attributes as usize).min(MAX_VERTEX_BINDINGS);
        let mut seen = [false; MAX_VERTEX_BINDINGS];
        for attr in self.attributes {
            let loc = attr.location as usize;
            ensure_valid!(
                loc < max,
                "vertex attribute location {loc} exceeds the limit of {max}"
            );
            ensure_valid!(!seen[loc], "vertex attribute location {loc} declared twice");
            seen[loc] = true;
            ensure_valid!(
                attr.stride == 0
                    || attr
                        .offset
                        .checked_add(attr.format.size())
                        .is_some_and(|end| end <= attr.stride),
                "vertex attribute {loc} ({:?} at offset {}) overflows its stride {}",
                attr.format,
                attr.offset,
                attr.stride
            );
            ensure_valid!(
                attr.step != VertexStep::Instance(0),
                "vertex attribute {loc} has an instance divisor of zero"
            );
        }
        Ok(())
    }
}

/// Checks the stage set of a pipeline: compute alone, or vertex + fragment
/// with optional geometry / tessellation stages.
pub(crate) fn validate_stages(stages: &[ShaderStage]) -> RenderResult<()> {
    ensure_valid!(!stages.is_empty(), "pipeline has no shader stages");
    for (i, stage) in stages.iter().enumerate() {
        ensure_valid!(
            !stages[..i].contains(stage),
            "pipeline has more than one {stage} stage"
        );
    }

    let has = |s: ShaderStage| stages.contains(&s);
    if has(ShaderStage::Compute) {
        ensure_valid!(stages.len() == 1, "compute pipelines take exactly one stage");
        return Ok(());
    }
    ensure_valid!(has(ShaderStage::Vertex), "pipeline is missing a vertex stage");
    ensure_valid!(has(ShaderStage::Fragment), "pipeline is missing a fragment stage");
    ensure_valid!(
        has(ShaderStage::TessControl) == has(ShaderStage::TessEval),
        "tessellation needs both control and evaluation stages"
    );
    Ok(())
}

/// Resolved shader stage handed to the backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StageBinding {
    pub stage: ShaderStage,
    pub shader: RawHandle,
}

/// Backend form of a [`PipelineDesc`], with shader handles resolved.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PipelineCreateInfo<'a> {
    pub stages: &'a [StageBinding],
    pub attributes: &'a [VertexAttribute],
    pub primitive: PrimitiveMode,
    pub tests: PipelineTests,
}

/// Metadata kept for a live pipeline.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PipelineInfo {
    pub primitive: PrimitiveMode,
    pub stage_count: u32,
    pub attribute_count: u32,
    pub compute: bool,
    pub tests: PipelineTests,
}
