//! Platform interface every graphics backend implements.
//!
//! The context drives a backend through [`Backend`] only. Backends see
//! validated create-infos and raw handles; they never see application
//! handles or descriptions.

mod headless;

use std::fmt;
use std::ptr::NonNull;

use crate::handle::RawHandle;
use crate::render::RenderData;
use crate::resource::{
    BufferCreateInfo, BufferData, FramebufferCreateInfo, MapAccess, MapRange, PipelineCreateInfo,
    SamplerOptions, ShaderCreateInfo, TextureCreateInfo, TextureUpload,
};

pub use headless::{
    HeadlessBackend, HeadlessProbe, RecordedBatch, RecordedCommand, RecordedFrame,
};

/// Status reported by a backend operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    OutOfMemory,
    InvalidHandle,
    /// The request uses a feature the device lacks.
    Unsupported(String),
    /// Shader compilation failed; carries the compiler log.
    CompileFailed(String),
    /// Program linking failed; carries the linker log.
    LinkFailed(String),
    IncompleteFramebuffer(String),
    /// Any other API-level failure.
    Api(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::OutOfMemory => f.write_str("out of memory"),
            BackendError::InvalidHandle => f.write_str("invalid backend handle"),
            BackendError::Unsupported(what) => write!(f, "unsupported: {what}"),
            BackendError::CompileFailed(log) => write!(f, "shader compilation failed:\n{log}"),
            BackendError::LinkFailed(log) => write!(f, "program link failed:\n{log}"),
            BackendError::IncompleteFramebuffer(status) => {
                write!(f, "framebuffer incomplete: {status}")
            }
            BackendError::Api(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for BackendError {}

pub type BackendResult<T> = Result<T, BackendError>;

/// Device capabilities queried once when the context is created.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderLimits {
    pub max_texture_size: u32,
    pub max_3d_texture_size: u32,
    pub max_array_layers: u32,
    pub max_vertex_attributes: u32,
    pub max_color_attachments: u32,
    pub max_texture_units: u32,
    pub max_uniform_buffer_bindings: u32,
    pub max_storage_buffer_bindings: u32,
}

impl Default for RenderLimits {
    /// Conservative GL 4.3 core minimums.
    fn default() -> Self {
        Self {
            max_texture_size: 4096,
            max_3d_texture_size: 256,
            max_array_layers: 256,
            max_vertex_attributes: 16,
            max_color_attachments: 4,
            max_texture_units: 16,
            max_uniform_buffer_bindings: 12,
            max_storage_buffer_bindings: 8,
        }
    }
}

/// A graphics backend.
///
/// Object safe; the context owns it as `Box<dyn Backend>`. Every call happens
/// on the thread that owns the context. Destroy calls are infallible and must
/// tolerate [`RawHandle::TOMBSTONE`].
pub trait Backend {
    fn name(&self) -> &str;

    fn limits(&self) -> RenderLimits;

    /// Handle of the window-system framebuffer.
    fn default_framebuffer(&self) -> RawHandle;

    // ── buffers ──────────────────────────────────────────────────────────

    fn create_buffer(&mut self, info: &BufferCreateInfo<'_>) -> BackendResult<RawHandle>;

    fn update_buffer(&mut self, buffer: RawHandle, data: BufferData<'_>) -> BackendResult<()>;

    /// Maps `range` of the buffer into host memory.
    ///
    /// The returned pointer addresses `range.len` bytes and stays valid until
    /// [`unmap_buffer`](Self::unmap_buffer) is called for the same buffer.
    fn map_buffer(
        &mut self,
        buffer: RawHandle,
        range: MapRange,
        access: MapAccess,
    ) -> BackendResult<NonNull<u8>>;

    fn unmap_buffer(&mut self, buffer: RawHandle);

    fn destroy_buffer(&mut self, buffer: RawHandle);

    // ── textures ─────────────────────────────────────────────────────────

    fn create_texture(&mut self, info: &TextureCreateInfo<'_>) -> BackendResult<RawHandle>;

    /// Replaces pixels of one level / layer.
    fn update_texture(&mut self, texture: RawHandle, upload: &TextureUpload<'_>)
    -> BackendResult<()>;

    /// Replaces sampling and addressing options.
    fn update_texture_sampler(
        &mut self,
        texture: RawHandle,
        sampler: &SamplerOptions,
    ) -> BackendResult<()>;

    fn destroy_texture(&mut self, texture: RawHandle);

    // ── shaders and pipelines ────────────────────────────────────────────

    /// Compiles one stage. Failures carry the compiler log.
    fn create_shader(&mut self, info: &ShaderCreateInfo<'_>) -> BackendResult<RawHandle>;

    fn destroy_shader(&mut self, shader: RawHandle);

    /// Links stages with vertex layout and fixed-function state. Failures
    /// carry the linker log.
    fn create_pipeline(&mut self, info: &PipelineCreateInfo<'_>) -> BackendResult<RawHandle>;

    fn destroy_pipeline(&mut self, pipeline: RawHandle);

    // ── framebuffers ─────────────────────────────────────────────────────

    fn create_framebuffer(&mut self, info: &FramebufferCreateInfo<'_>)
    -> BackendResult<RawHandle>;

    fn destroy_framebuffer(&mut self, framebuffer: RawHandle);

    // ── frame ────────────────────────────────────────────────────────────

    /// Executes one frame: for each batch in order, binds the target,
    /// applies viewport and clear, then runs its commands in order.
    ///
    /// Nothing from `batches` may be kept after the call returns.
    fn submit_render_data(&mut self, batches: &[RenderData<'_>]) -> BackendResult<()>;

    /// Blocks until all submitted work has completed.
    fn device_wait(&mut self);

    /// Presents the default framebuffer.
    fn swap_buffers(&mut self) -> BackendResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_survive_display() {
        let e = BackendError::LinkFailed("error: vertex output `v_uv` not read".into());
        assert!(e.to_string().contains("v_uv"));
        assert_eq!(BackendError::OutOfMemory.to_string(), "out of memory");
    }

    #[test]
    fn backend_is_object_safe() {
        fn takes(_: &dyn Backend) {}
        let b = HeadlessBackend::new();
        takes(&b);
    }
}
