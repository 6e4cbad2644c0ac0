use std::fmt;

use crate::handle::{BufferHandle, FramebufferHandle, PipelineHandle, RawHandle, TextureHandle};
use crate::resource::{BufferKind, ClearState, Rect2d, TextureKind};

// ── user side ─────────────────────────────────────────────────────────────

/// Vertex buffer bound to one attribute location.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexBufferBind {
    pub location: u32,
    pub buffer: BufferHandle,
    pub offset: usize,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum IndexFormat {
    U8,
    U16,
    #[default]
    U32,
}

impl IndexFormat {
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            IndexFormat::U8 => 1,
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct IndexBufferBind {
    pub buffer: BufferHandle,
    pub format: IndexFormat,
    pub offset: usize,
}

/// Uniform or storage buffer bound to a shader binding point.
///
/// `size == 0` binds from `offset` to the end of the buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ShaderBufferBind {
    pub buffer: BufferHandle,
    pub binding: u32,
    pub offset: usize,
    pub size: usize,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureBind {
    pub texture: TextureHandle,
    pub unit: u32,
}

/// Push-constant style value uploaded right before the draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformData {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    UInt(u32),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

/// A named uniform value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Uniform<'a> {
    pub name: &'a str,
    pub data: UniformData,
}

impl<'a> Uniform<'a> {
    #[inline]
    pub const fn new(name: &'a str, data: UniformData) -> Self {
        Self { name, data }
    }
}

/// Draw call parameters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DrawOptions {
    /// Vertices, or indices when an index buffer is bound.
    pub count: u32,
    /// First vertex, or first index when indexed.
    pub offset: u32,
    pub instances: u32,
    /// Added to every index of an indexed draw.
    pub base_vertex: i32,
    /// Scissor box; `None` disables the scissor test.
    pub scissor: Option<Rect2d>,
}

impl DrawOptions {
    pub const fn vertices(count: u32) -> Self {
        Self { count, offset: 0, instances: 1, base_vertex: 0, scissor: None }
    }

    pub const fn instanced(count: u32, instances: u32) -> Self {
        Self { instances, ..Self::vertices(count) }
    }
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self::vertices(0)
    }
}

/// A declarative draw.
///
/// Spans are copied into frame memory on submission, so they may borrow
/// short-lived data.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderCmdDesc<'a> {
    pub target: FramebufferHandle,
    pub pipeline: PipelineHandle,
    pub vertex_buffers: &'a [VertexBufferBind],
    pub index_buffer: Option<IndexBufferBind>,
    pub shader_buffers: &'a [ShaderBufferBind],
    pub textures: &'a [TextureBind],
    pub uniforms: &'a [Uniform<'a>],
    pub options: DrawOptions,
    pub sort_group: u32,
}

impl<'a> RenderCmdDesc<'a> {
    pub fn new(target: FramebufferHandle, pipeline: PipelineHandle) -> Self {
        Self {
            target,
            pipeline,
            vertex_buffers: &[],
            index_buffer: None,
            shader_buffers: &[],
            textures: &[],
            uniforms: &[],
            options: DrawOptions::default(),
            sort_group: 0,
        }
    }
}

/// An imperative command run by the backend inside its batch.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ExternalCmdDesc {
    pub target: FramebufferHandle,
    pub sort_group: u32,
}

impl ExternalCmdDesc {
    #[inline]
    pub const fn new(target: FramebufferHandle, sort_group: u32) -> Self {
        Self { target, sort_group }
    }
}

// ── backend side ──────────────────────────────────────────────────────────

/// What an external callback is told about the bound target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ExternalTarget {
    pub framebuffer: RawHandle,
    pub viewport: Rect2d,
    pub sort_group: u32,
}

/// The two callback shapes an external command can carry.
#[derive(Copy, Clone)]
pub enum ExternalCallback<'a> {
    Function(fn(&ExternalTarget)),
    Closure(&'a dyn Fn(&ExternalTarget)),
}

impl ExternalCallback<'_> {
    #[inline]
    pub fn invoke(&self, target: &ExternalTarget) {
        match self {
            ExternalCallback::Function(f) => f(target),
            ExternalCallback::Closure(f) => f(target),
        }
    }
}

impl fmt::Debug for ExternalCallback<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalCallback::Function(_) => f.write_str("Function(..)"),
            ExternalCallback::Closure(_) => f.write_str("Closure(..)"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexBinding {
    pub location: u32,
    pub buffer: RawHandle,
    pub offset: usize,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct IndexBinding {
    pub buffer: RawHandle,
    pub format: IndexFormat,
    pub offset: usize,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ShaderBufferBinding {
    pub buffer: RawHandle,
    pub kind: BufferKind,
    pub binding: u32,
    pub offset: usize,
    /// Resolved byte count; never zero.
    pub size: usize,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureBinding {
    pub texture: RawHandle,
    pub kind: TextureKind,
    pub unit: u32,
}

/// A draw with every handle resolved for the backend.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawCmd<'a> {
    pub pipeline: RawHandle,
    pub vertex_buffers: &'a [VertexBinding],
    pub index_buffer: Option<IndexBinding>,
    pub shader_buffers: &'a [ShaderBufferBinding],
    pub textures: &'a [TextureBinding],
    pub uniforms: &'a [Uniform<'a>],
    pub options: DrawOptions,
}

#[derive(Debug, Copy, Clone)]
pub enum RenderCmdKind<'a> {
    Draw(DrawCmd<'a>),
    External(ExternalCallback<'a>),
}

/// One command of a batch, in execution order.
#[derive(Debug, Copy, Clone)]
pub struct RenderCmd<'a> {
    pub sort_group: u32,
    pub kind: RenderCmdKind<'a>,
}

/// Everything drawn into one target during a frame.
///
/// Spans live in frame memory and are invalid once the submit call returns.
#[derive(Debug, Copy, Clone)]
pub struct RenderData<'a> {
    pub target: RawHandle,
    pub clear: ClearState,
    pub viewport: Rect2d,
    pub commands: &'a [RenderCmd<'a>],
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn both_callback_shapes_invoke() {
        fn plain(t: &ExternalTarget) {
            assert_eq!(t.sort_group, 7);
        }
        let hits = Cell::new(0);
        let closure = |t: &ExternalTarget| hits.set(hits.get() + t.sort_group);
        let target = ExternalTarget {
            framebuffer: RawHandle::new(0),
            viewport: Rect2d::new(0, 0, 4, 4),
            sort_group: 7,
        };

        ExternalCallback::Function(plain).invoke(&target);
        ExternalCallback::Closure(&closure).invoke(&target);
        ExternalCallback::Closure(&closure).invoke(&target);
        assert_eq!(hits.get(), 14);
    }

    #[test]
    fn draw_options_defaults() {
        let d = DrawOptions::instanced(6, 10);
        assert_eq!((d.count, d.instances, d.offset), (6, 10, 0));
        assert_eq!(DrawOptions::default().instances, 1);
        assert_eq!(IndexFormat::U16.size(), 2);
    }
}
