use bitflags::bitflags;
use bytemuck::Pod;

use crate::error::{ensure_valid, RenderResult};

/// What a buffer is bound as.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
    ShaderStorage,
}

bitflags! {
    #[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
    pub struct BufferFlags: u32 {
        /// Contents may be replaced after creation.
        const DYNAMIC        = 1 << 0;
        /// The buffer can be mapped for reading.
        const READ_MAPPABLE  = 1 << 1;
        /// The buffer can be mapped for writing.
        const WRITE_MAPPABLE = 1 << 2;
    }
}

/// Backend usage hint derived from the buffer flags.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    /// Written once at creation.
    Static,
    /// Rewritten from time to time.
    Dynamic,
    /// Read back by the host.
    Readback,
}

/// A run of bytes placed at `offset` inside a buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferData<'a> {
    pub bytes: &'a [u8],
    pub offset: usize,
}

impl<'a> BufferData<'a> {
    #[inline]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    #[inline]
    pub const fn at(bytes: &'a [u8], offset: usize) -> Self {
        Self { bytes, offset }
    }

    /// Views plain-old-data (vertices, indices, uniform blocks) as bytes.
    #[inline]
    pub fn from_pod<T: Pod>(data: &'a [T]) -> Self {
        Self::new(bytemuck::cast_slice(data))
    }

    #[inline]
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.bytes.len())
    }
}

/// Buffer creation parameters.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferDesc<'a> {
    pub kind: BufferKind,
    pub flags: BufferFlags,
    pub size: usize,
    pub data: Option<BufferData<'a>>,
}

impl<'a> BufferDesc<'a> {
    /// Immutable buffer sized and filled from `bytes`.
    pub fn with_data(kind: BufferKind, bytes: &'a [u8]) -> Self {
        Self {
            kind,
            flags: BufferFlags::empty(),
            size: bytes.len(),
            data: Some(BufferData::new(bytes)),
        }
    }

    /// Dynamic buffer of `size` bytes with unspecified initial contents.
    pub fn dynamic(kind: BufferKind, size: usize) -> Self {
        Self { kind, flags: BufferFlags::DYNAMIC, size, data: None }
    }

    #[inline]
    pub fn flags(mut self, flags: BufferFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub(crate) fn validate(&self) -> RenderResult<()> {
        ensure_valid!(self.size > 0, "{:?} buffer has zero size", self.kind);
        match self.data {
            None => ensure_valid!(
                self.flags.contains(BufferFlags::DYNAMIC),
                "{:?} buffer without initial data must be dynamic",
                self.kind
            ),
            Some(data) => {
                ensure_valid!(!data.bytes.is_empty(), "initial buffer data is empty");
                ensure_valid!(
                    data.end().is_some_and(|end| end <= self.size),
                    "initial data ({} bytes at offset {}) exceeds buffer size {}",
                    data.bytes.len(),
                    data.offset,
                    self.size
                );
            }
        }
        Ok(())
    }

    pub(crate) fn create_info(&self) -> BufferCreateInfo<'a> {
        let usage = if self.flags.contains(BufferFlags::READ_MAPPABLE) {
            BufferUsage::Readback
        } else if self.flags.contains(BufferFlags::DYNAMIC) {
            BufferUsage::Dynamic
        } else {
            BufferUsage::Static
        };
        BufferCreateInfo {
            kind: self.kind,
            flags: self.flags,
            usage,
            size: self.size,
            data: self.data,
        }
    }
}

/// Backend form of a [`BufferDesc`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferCreateInfo<'a> {
    pub kind: BufferKind,
    pub flags: BufferFlags,
    pub usage: BufferUsage,
    pub size: usize,
    pub data: Option<BufferData<'a>>,
}

/// Metadata kept for a live buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferInfo {
    pub kind: BufferKind,
    pub flags: BufferFlags,
    pub size: usize,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MapAccess {
    Read,
    Write,
    ReadWrite,
}

impl MapAccess {
    #[inline]
    pub fn reads(self) -> bool {
        matches!(self, MapAccess::Read | MapAccess::ReadWrite)
    }

    #[inline]
    pub fn writes(self) -> bool {
        matches!(self, MapAccess::Write | MapAccess::ReadWrite)
    }
}

/// Byte range of a mapping request.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MapRange {
    pub offset: usize,
    pub len: usize,
}

impl BufferInfo {
    pub(crate) fn validate_upload(&self, data: &BufferData<'_>) -> RenderResult<()> {
        ensure_valid!(
            self.flags.contains(BufferFlags::DYNAMIC),
            "cannot upload to a non-dynamic {:?} buffer",
            self.kind
        );
        ensure_valid!(!data.bytes.is_empty(), "buffer upload is empty");
        ensure_valid!(
            data.end().is_some_and(|end| end <= self.size),
            "upload of {} bytes at offset {} exceeds buffer size {}",
            data.bytes.len(),
            data.offset,
            self.size
        );
        Ok(())
    }

    pub(crate) fn validate_map(&self, range: MapRange, access: MapAccess) -> RenderResult<()> {
        if access.reads() {
            ensure_valid!(
                self.flags.contains(BufferFlags::READ_MAPPABLE),
                "buffer is not mappable for reading"
            );
        }
        if access.writes() {
            ensure_valid!(
                self.flags.contains(BufferFlags::WRITE_MAPPABLE),
                "buffer is not mappable for writing"
            );
        }
        ensure_valid!(range.len > 0, "mapping range is empty");
        ensure_valid!(
            range.offset.checked_add(range.len).is_some_and(|end| end <= self.size),
            "mapping {}..+{} exceeds buffer size {}",
            range.offset,
            range.len,
            self.size
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn dataless_buffer_must_be_dynamic() {
        let desc = BufferDesc {
            kind: BufferKind::Vertex,
            flags: BufferFlags::empty(),
            size: 64,
            data: None,
        };
        assert_eq!(desc.validate().unwrap_err().kind, ErrorKind::Validation);
        assert!(BufferDesc::dynamic(BufferKind::Vertex, 64).validate().is_ok());
    }

    #[test]
    fn initial_data_must_fit() {
        let bytes = [0u8; 32];
        let mut desc = BufferDesc::with_data(BufferKind::Index, &bytes);
        assert!(desc.validate().is_ok());
        desc.size = 16;
        assert!(desc.validate().is_err());
        desc.size = 40;
        desc.data = Some(BufferData::at(&bytes, 16));
        assert!(desc.validate().is_err());
    }

    #[test]
    fn usage_hint_follows_flags() {
        let d = BufferDesc::dynamic(BufferKind::Uniform, 16);
        assert_eq!(d.create_info().usage, BufferUsage::Dynamic);
        let r = d.flags(BufferFlags::READ_MAPPABLE);
        assert_eq!(r.create_info().usage, BufferUsage::Readback);
        let s = BufferDesc::with_data(BufferKind::Vertex, &[1, 2, 3]);
        assert_eq!(s.create_info().usage, BufferUsage::Static);
    }

    #[test]
    fn uploads_require_dynamic_and_bounds() {
        let info = BufferInfo { kind: BufferKind::Vertex, flags: BufferFlags::DYNAMIC, size: 8 };
        assert!(info.validate_upload(&BufferData::at(&[0; 4], 4)).is_ok());
        assert!(info.validate_upload(&BufferData::at(&[0; 4], 5)).is_err());

        let fixed = BufferInfo { flags: BufferFlags::empty(), ..info };
        assert!(fixed.validate_upload(&BufferData::new(&[0; 4])).is_err());
    }

    #[test]
    fn mapping_checks_access_flags() {
        let info = BufferInfo {
            kind: BufferKind::ShaderStorage,
            flags: BufferFlags::DYNAMIC | BufferFlags::READ_MAPPABLE,
            size: 64,
        };
        let range = MapRange { offset: 0, len: 64 };
        assert!(info.validate_map(range, MapAccess::Read).is_ok());
        assert!(info.validate_map(range, MapAccess::ReadWrite).is_err());
        assert!(info.validate_map(MapRange { offset: 8, len: 64 }, MapAccess::Read).is_err());
    }
}
