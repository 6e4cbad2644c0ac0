use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};

use super::arena::Arena;
use super::source::{AllocError, BlockSource, SystemBlocks};

/// Growable array living in arena memory.
///
/// Growth copies into a fresh arena allocation; the previous storage is
/// reclaimed only when the arena is cleared. Size with
/// [`with_capacity_in`](Self::with_capacity_in) when the length is known.
pub struct ArenaVec<'a, T: Copy, S: BlockSource = SystemBlocks> {
    arena: &'a Arena<S>,
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
}

impl<'a, T: Copy, S: BlockSource> ArenaVec<'a, T, S> {
    pub fn new_in(arena: &'a Arena<S>) -> Self {
        Self { arena, ptr: NonNull::dangling(), len: 0, cap: 0 }
    }

    pub fn with_capacity_in(cap: usize, arena: &'a Arena<S>) -> Result<Self, AllocError> {
        let mut v = Self::new_in(arena);
        v.reserve(cap)?;
        Ok(v)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Ensures room for `additional` more elements.
    pub fn reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        let needed = self
            .len
            .checked_add(additional)
            .ok_or(AllocError { size: usize::MAX, align: mem::align_of::<T>() })?;
        if needed <= self.cap {
            return Ok(());
        }

        let new_cap = needed.max(self.cap * 2).max(4);
        let bytes = new_cap
            .checked_mul(mem::size_of::<T>())
            .ok_or(AllocError { size: usize::MAX, align: mem::align_of::<T>() })?;
        let new_ptr = self.arena.allocate(bytes, mem::align_of::<T>())?.cast::<T>();

        // SAFETY: both regions are valid for `len` elements and do not overlap.
        unsafe { ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len) };

        self.ptr = new_ptr;
        self.cap = new_cap;
        Ok(())
    }

    pub fn push(&mut self, value: T) -> Result<(), AllocError> {
        self.reserve(1)?;
        // SAFETY: `len < cap` after reserve.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<(), AllocError> {
        self.reserve(values.len())?;
        // SAFETY: room for `values.len()` more elements was reserved.
        unsafe {
            ptr::copy_nonoverlapping(values.as_ptr(), self.ptr.as_ptr().add(self.len), values.len())
        };
        self.len += values.len();
        Ok(())
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first `len` elements are initialized.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: the first `len` elements are initialized and uniquely owned.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Gives up the vector, keeping its contents for the arena's lifetime.
    pub fn into_slice(self) -> &'a mut [T] {
        // SAFETY: storage belongs to the arena and outlives `'a`.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Copy + fmt::Debug, S: BlockSource> fmt::Debug for ArenaVec<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// String builder backed by arena memory. Implements [`fmt::Write`].
pub struct ArenaString<'a, S: BlockSource = SystemBlocks> {
    bytes: ArenaVec<'a, u8, S>,
    last_error: Option<AllocError>,
}

impl<'a, S: BlockSource> ArenaString<'a, S> {
    pub fn new_in(arena: &'a Arena<S>) -> Self {
        Self { bytes: ArenaVec::new_in(arena), last_error: None }
    }

    pub fn push_str(&mut self, s: &str) -> Result<(), AllocError> {
        self.bytes.extend_from_slice(s.as_bytes())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        // SAFETY: only whole `str`s are ever appended.
        unsafe { std::str::from_utf8_unchecked(self.bytes.as_slice()) }
    }

    /// The allocation failure that aborted the last `fmt::Write` call, if any.
    #[inline]
    pub fn last_error(&self) -> Option<AllocError> {
        self.last_error
    }

    pub fn into_str(self) -> &'a str {
        let bytes: &'a [u8] = self.bytes.into_slice();
        // SAFETY: only whole `str`s are ever appended.
        unsafe { std::str::from_utf8_unchecked(bytes) }
    }
}

impl<S: BlockSource> fmt::Write for ArenaString<'_, S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s).map_err(|e| {
            self.last_error = Some(e);
            fmt::Error
        })
    }
}

impl<S: BlockSource> fmt::Display for ArenaString<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write;

    use super::*;

    #[test]
    fn vec_grows_across_blocks() {
        let a = Arena::try_new(256).unwrap();
        let mut v = ArenaVec::new_in(&a);
        for i in 0..500u32 {
            v.push(i).unwrap();
        }
        assert_eq!(v.len(), 500);
        assert!(v.as_slice().iter().copied().eq(0..500));
        assert!(a.block_count() > 1);
    }

    #[test]
    fn vec_with_capacity_does_not_regrow() {
        let a = Arena::try_new(1024).unwrap();
        let mut v = ArenaVec::with_capacity_in(16, &a).unwrap();
        let used = a.allocated_bytes();
        v.extend_from_slice(&[1u64; 16]).unwrap();
        assert_eq!(a.allocated_bytes(), used);
        assert_eq!(v.into_slice().len(), 16);
    }

    #[test]
    fn string_formats() {
        let a = Arena::try_new(256).unwrap();
        let mut s = ArenaString::new_in(&a);
        write!(s, "{}x{}", 640, 480).unwrap();
        s.push_str(" rgba8").unwrap();
        assert_eq!(s.as_str(), "640x480 rgba8");
        assert_eq!(s.into_str(), "640x480 rgba8");
    }
}
