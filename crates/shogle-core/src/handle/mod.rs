//! Resource handles and the per-kind registry.
//!
//! Two handle flavors exist:
//! - [`RawHandle`]: opaque backend token, with a reserved tombstone value
//! - [`Handle<K>`]: generation-checked slot index handed to applications

mod handle;
mod list;

pub use handle::{
    kind, BufferHandle, FramebufferHandle, Handle, PipelineHandle, RawHandle, ShaderHandle,
    TextureHandle,
};
pub use list::{Iter, ResourceList};
