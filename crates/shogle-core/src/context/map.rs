use std::ptr::NonNull;

use bytemuck::Pod;

use crate::error::{RenderError, RenderResult};
use crate::handle::{BufferHandle, RawHandle};
use crate::resource::{MapAccess, MapRange};

use super::context::Context;

/// Host view of a mapped buffer range.
///
/// The context stays mutably borrowed for as long as the mapping lives, so
/// no frame can be recorded and the buffer cannot be destroyed meanwhile.
/// Dropping the guard unmaps the buffer.
pub struct BufferMap<'c> {
    ctx: &'c mut Context,
    buffer: BufferHandle,
    raw: RawHandle,
    ptr: NonNull<u8>,
    len: usize,
    access: MapAccess,
}

impl BufferMap<'_> {
    #[inline]
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    #[inline]
    pub fn access(&self) -> MapAccess {
        self.access
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Panics
    /// Panics if the range was mapped write-only.
    pub fn as_slice(&self) -> &[u8] {
        assert!(self.access.reads(), "{:?} is mapped write-only", self.buffer);
        // SAFETY: the backend keeps `len` bytes at `ptr` valid until unmap,
        // which only happens in `drop`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// # Panics
    /// Panics if the range was mapped read-only.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        assert!(self.access.writes(), "{:?} is mapped read-only", self.buffer);
        // SAFETY: see `as_slice`; `&mut self` makes the view unique.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Copies `data` to the start of the mapped range.
    ///
    /// # Panics
    /// Panics if `data` is longer than the range or the mapping is read-only.
    pub fn write_pod<T: Pod>(&mut self, data: &[T]) {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        assert!(bytes.len() <= self.len, "{} bytes written to a {} byte mapping", bytes.len(), self.len);
        self.as_mut_slice()[..bytes.len()].copy_from_slice(bytes);
    }
}

impl Drop for BufferMap<'_> {
    fn drop(&mut self) {
        self.ctx.backend.unmap_buffer(self.raw);
        if let Some(node) = self.ctx.buffers.get_mut(self.buffer.index(), self.buffer.generation()) {
            node.mapped = false;
        }
        log::trace!("unmapped {:?}", self.buffer);
    }
}

impl Context {
    /// Maps `range` of a buffer created with the matching `*_MAPPABLE` flag.
    pub fn map_buffer(
        &mut self,
        buffer: BufferHandle,
        range: MapRange,
        access: MapAccess,
    ) -> RenderResult<BufferMap<'_>> {
        let node = self
            .buffers
            .get_mut(buffer.index(), buffer.generation())
            .ok_or_else(|| RenderError::invalid_handle(format!("{buffer:?} is not a live buffer")))?;
        node.info.validate_map(range, access)?;
        if node.mapped {
            return Err(RenderError::validation(format!("{buffer:?} is already mapped")));
        }
        let raw = node.raw;
        let ptr = self
            .backend
            .map_buffer(raw, range, access)
            .map_err(|e| RenderError::from_backend("map_buffer", e))?;
        node.mapped = true;

        log::trace!("mapped {buffer:?} {}..+{} ({access:?})", range.offset, range.len);
        Ok(BufferMap { ctx: self, buffer, raw, ptr, len: range.len, access })
    }
}
