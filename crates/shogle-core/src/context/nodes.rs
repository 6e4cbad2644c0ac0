use crate::handle::RawHandle;
use crate::resource::{BufferInfo, FramebufferInfo, PipelineInfo, ShaderInfo, TextureInfo};

// Registry entries. A node exists if and only if its backend handle is live.

pub(crate) struct BufferNode {
    pub raw: RawHandle,
    pub info: BufferInfo,
    pub mapped: bool,
}

pub(crate) struct TextureNode {
    pub raw: RawHandle,
    pub info: TextureInfo,
}

pub(crate) struct ShaderNode {
    pub raw: RawHandle,
    pub info: ShaderInfo,
}

pub(crate) struct PipelineNode {
    pub raw: RawHandle,
    pub info: PipelineInfo,
}

pub(crate) struct FramebufferNode {
    pub raw: RawHandle,
    pub info: FramebufferInfo,
}
