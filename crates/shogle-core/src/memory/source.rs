use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;

/// Failure to obtain arena memory.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AllocError {
    pub size: usize,
    pub align: usize,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arena could not allocate {} bytes (align {})",
            self.size, self.align
        )
    }
}

impl std::error::Error for AllocError {}

/// Bulk memory provider behind an [`Arena`](super::Arena).
///
/// Blocks are requested rarely (arena creation and growth) and released only
/// when the arena is shrunk or dropped.
pub trait BlockSource {
    /// Returns a block satisfying `layout`, or `None` when exhausted.
    fn allocate_block(&mut self, layout: Layout) -> Option<NonNull<u8>>;

    /// Returns a block to the source.
    ///
    /// # Safety
    /// `ptr` must have been returned by `allocate_block` on this source with
    /// the same `layout`, and must not be used afterwards.
    unsafe fn release_block(&mut self, ptr: NonNull<u8>, layout: Layout);
}

/// Block source backed by the global allocator.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemBlocks;

impl BlockSource for SystemBlocks {
    fn allocate_block(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return None;
        }
        // SAFETY: layout has a non-zero size.
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }

    unsafe fn release_block(&mut self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded from the caller contract.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

/// Block source with a fixed byte budget, carved from the global allocator.
///
/// Used to bound per-frame memory and to exercise exhaustion paths.
#[derive(Debug, Clone)]
pub struct BudgetBlocks {
    remaining: usize,
}

impl BudgetBlocks {
    pub fn new(budget: usize) -> Self {
        Self { remaining: budget }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl BlockSource for BudgetBlocks {
    fn allocate_block(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() > self.remaining {
            return None;
        }
        let ptr = SystemBlocks.allocate_block(layout)?;
        self.remaining -= layout.size();
        Some(ptr)
    }

    unsafe fn release_block(&mut self, ptr: NonNull<u8>, layout: Layout) {
        self.remaining += layout.size();
        // SAFETY: blocks are obtained from `SystemBlocks` with this layout.
        unsafe { SystemBlocks.release_block(ptr, layout) }
    }
}
