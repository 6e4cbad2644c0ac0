//! Resource descriptions, backend create-infos and per-resource metadata.
//!
//! Every `*Desc` validates itself before anything reaches the backend; the
//! context then turns it into the matching `*CreateInfo`.

mod buffer;
mod common;
mod framebuffer;
mod pipeline;
mod shader;
mod texture;

pub use buffer::{
    BufferCreateInfo, BufferData, BufferDesc, BufferFlags, BufferInfo, BufferKind, BufferUsage,
    MapAccess, MapRange,
};
pub use common::{ClearFlags, ClearState, Color, Extent2d, Extent3d, Rect2d};
pub use framebuffer::{
    FramebufferAttachment, FramebufferCreateInfo, FramebufferDesc, FramebufferInfo,
    ResolvedAttachment,
};
pub use pipeline::{
    BlendFactor, BlendOp, BlendState, CompareFunc, ComponentType, CullMode, DepthTest, FrontFace,
    PipelineCreateInfo, PipelineDesc, PipelineInfo, PipelineTests, PolygonMode, PrimitiveMode,
    StageBinding, StencilOp, StencilTest, VertexAttribute, VertexFormat, VertexStep,
    MAX_VERTEX_BINDINGS,
};
pub use shader::{ShaderCreateInfo, ShaderDesc, ShaderInfo, ShaderStage};
pub use texture::{
    image_byte_size, level_extent, mip_levels, Origin3d, SamplerOptions, TextureAddress,
    TextureCreateInfo, TextureDesc, TextureFilter, TextureFormat, TextureImage, TextureInfo,
    TextureKind, TextureUpload,
};

pub(crate) use framebuffer::check_attachment;
pub(crate) use pipeline::validate_stages;
