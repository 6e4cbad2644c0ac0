//! Render commands and per-frame batching.
//!
//! Application code describes draws with [`RenderCmdDesc`] / [`ExternalCmdDesc`].
//! The context resolves handles, copies every span into the frame arena and
//! hands the backend one [`RenderData`] per touched target at the end of the
//! frame.

mod batch;
mod cmd;
mod key;

pub(crate) use batch::{FrameRecorder, RecordedDraw, RecordedKind, RecordedUniform};
pub use cmd::{
    DrawCmd, DrawOptions, ExternalCallback, ExternalCmdDesc, ExternalTarget, IndexBinding,
    IndexBufferBind, IndexFormat, RenderCmd, RenderCmdDesc, RenderCmdKind, RenderData,
    ShaderBufferBind, ShaderBufferBinding, TextureBind, TextureBinding, Uniform, UniformData,
    VertexBinding, VertexBufferBind,
};
pub use key::SortKey;
