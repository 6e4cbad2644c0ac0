//! GL objects behind raw handles.
//!
//! Raw handles are the GL object names, so external callbacks can hand them
//! to other GL code directly. Name `0` is the window-system framebuffer.

use std::collections::HashMap;

use shogle_core::handle::RawHandle;
use shogle_core::resource::{
    BufferKind, Extent2d, Extent3d, PipelineTests, PrimitiveMode, ShaderStage, TextureFormat,
    TextureKind,
};
use shogle_core::{BackendError, BackendResult};

pub(crate) struct GlBuffer {
    pub raw: glow::Buffer,
    pub kind: BufferKind,
    pub size: usize,
    pub mapped: bool,
}

pub(crate) struct GlTexture {
    pub raw: glow::Texture,
    pub kind: TextureKind,
    pub format: TextureFormat,
    pub extent: Extent3d,
    pub layers: u32,
    pub levels: u32,
}

pub(crate) struct GlShader {
    pub raw: glow::Shader,
    pub stage: ShaderStage,
}

/// Vertex stride per binding slot; slots double as attribute locations.
pub(crate) type Strides = Vec<(u32, i32)>;

pub(crate) struct GlProgram {
    pub raw: glow::Program,
    /// `None` for compute programs.
    pub vao: Option<glow::VertexArray>,
    pub strides: Strides,
    pub primitive: PrimitiveMode,
    pub tests: PipelineTests,
    /// Looked up on first use; `None` records a name the linker dropped.
    pub uniforms: HashMap<String, Option<glow::UniformLocation>>,
}

impl GlProgram {
    pub fn stride(&self, location: u32) -> i32 {
        self.strides
            .iter()
            .find(|(l, _)| *l == location)
            .map_or(0, |&(_, s)| s)
    }
}

pub(crate) struct GlFramebuffer {
    pub raw: glow::Framebuffer,
    pub extent: Extent2d,
}

/// Live objects of one kind, keyed by GL name.
pub(crate) struct Table<T> {
    label: &'static str,
    objects: HashMap<u64, T>,
}

impl<T> Table<T> {
    pub fn new(label: &'static str) -> Self {
        Self { label, objects: HashMap::new() }
    }

    pub fn insert(&mut self, raw: RawHandle, object: T) {
        let previous = self.objects.insert(raw.0, object);
        debug_assert!(previous.is_none(), "GL reused live {} name {}", self.label, raw.0);
    }

    pub fn get(&self, raw: RawHandle) -> BackendResult<&T> {
        self.objects.get(&raw.0).ok_or(BackendError::InvalidHandle)
    }

    pub fn get_mut(&mut self, raw: RawHandle) -> BackendResult<&mut T> {
        self.objects.get_mut(&raw.0).ok_or(BackendError::InvalidHandle)
    }

    pub fn remove(&mut self, raw: RawHandle) -> Option<T> {
        let object = self.objects.remove(&raw.0);
        if object.is_none() {
            log::warn!("gl: destroy of unknown {} {}", self.label, raw.0);
        }
        object
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.objects.drain().map(|(_, o)| o)
    }
}

/// Every object created by one backend.
pub(crate) struct Objects {
    pub buffers: Table<GlBuffer>,
    pub textures: Table<GlTexture>,
    pub shaders: Table<GlShader>,
    pub programs: Table<GlProgram>,
    pub framebuffers: Table<GlFramebuffer>,
}

impl Objects {
    pub fn new() -> Self {
        Self {
            buffers: Table::new("buffer"),
            textures: Table::new("texture"),
            shaders: Table::new("shader"),
            programs: Table::new("program"),
            framebuffers: Table::new("framebuffer"),
        }
    }

    pub fn total(&self) -> usize {
        self.buffers.len()
            + self.textures.len()
            + self.shaders.len()
            + self.programs.len()
            + self.framebuffers.len()
    }
}

/// Raw handle of a GL object name.
pub(crate) trait GlName {
    fn raw_handle(&self) -> RawHandle;
}

macro_rules! impl_gl_name {
    ($($ty:ty),* $(,)?) => {
        $(
            impl GlName for $ty {
                #[inline]
                fn raw_handle(&self) -> RawHandle {
                    RawHandle(u64::from(self.0.get()))
                }
            }
        )*
    };
}

impl_gl_name!(
    glow::NativeBuffer,
    glow::NativeTexture,
    glow::NativeShader,
    glow::NativeProgram,
    glow::NativeFramebuffer,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_reports_unknown_handles() {
        let mut table: Table<u32> = Table::new("thing");
        table.insert(RawHandle(3), 7);
        assert_eq!(*table.get(RawHandle(3)).unwrap(), 7);
        assert_eq!(table.get(RawHandle(4)).err(), Some(BackendError::InvalidHandle));

        *table.get_mut(RawHandle(3)).unwrap() = 9;
        assert_eq!(table.remove(RawHandle(3)), Some(9));
        assert_eq!(table.remove(RawHandle(3)), None);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn names_become_raw_handles() {
        let name = std::num::NonZeroU32::new(42).unwrap();
        assert_eq!(glow::NativeTexture(name).raw_handle(), RawHandle(42));
    }
}
