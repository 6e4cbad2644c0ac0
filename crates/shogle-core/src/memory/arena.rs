use std::alloc::Layout;
use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};

use super::scratch::ArenaString;
use super::source::{AllocError, BlockSource, SystemBlocks};

/// Minimum alignment of every block handed out by the source.
const BLOCK_ALIGN: usize = 16;

/// Smallest block the arena will request.
const MIN_BLOCK_SIZE: usize = 256;

struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
}

struct DropEntry {
    value: *mut u8,
    drop_fn: unsafe fn(*mut u8),
    next: Option<NonNull<DropEntry>>,
}

struct State<S> {
    source: S,
    blocks: Vec<Block>,
    /// Index of the block currently being bumped.
    current: usize,
    /// Byte offset of the bump pointer inside `blocks[current]`.
    cursor: usize,
    /// Destructors registered by `construct`, most recent first.
    drops: Option<NonNull<DropEntry>>,
}

/// Bump allocator with block growth.
///
/// Allocation goes through `&self`, so any number of arena references can be
/// alive at once. [`clear`](Self::clear) takes `&mut self`: the borrow checker
/// rejects any reference into the arena that would outlive it.
///
/// Blocks are never moved or reallocated. Growth appends a new block, and
/// blocks stay allocated across `clear` so that a warmed-up arena serves a
/// whole frame without calling into its [`BlockSource`].
pub struct Arena<S: BlockSource = SystemBlocks> {
    state: RefCell<State<S>>,
    epoch: u64,
}

/// Pointer into arena memory stamped with the arena epoch it was taken in.
///
/// Lets long-lived structures hold per-frame arena data without a lifetime.
/// [`Arena::attach`] turns it back into a reference and panics when the arena
/// was cleared in between.
pub struct ArenaPtr<T: ?Sized> {
    ptr: NonNull<T>,
    epoch: u64,
}

impl<T: ?Sized> Clone for ArenaPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for ArenaPtr<T> {}

impl<T: ?Sized> ArenaPtr<T> {
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl<T: ?Sized> fmt::Debug for ArenaPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaPtr")
            .field("ptr", &self.ptr.cast::<u8>())
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl Arena<SystemBlocks> {
    /// Creates an arena whose first block holds `block_size` bytes.
    ///
    /// Returns `None` if the first block cannot be allocated.
    pub fn try_new(block_size: usize) -> Option<Self> {
        Self::try_with_source(SystemBlocks, block_size)
    }
}

impl<S: BlockSource> Arena<S> {
    /// Creates an arena drawing its blocks from `source`.
    pub fn try_with_source(mut source: S, block_size: usize) -> Option<Self> {
        let layout = Layout::from_size_align(block_size.max(MIN_BLOCK_SIZE), BLOCK_ALIGN).ok()?;

        let mut blocks = Vec::new();
        blocks.try_reserve(4).ok()?;

        let ptr = source.allocate_block(layout)?;
        blocks.push(Block { ptr, layout });

        Some(Self {
            state: RefCell::new(State {
                source,
                blocks,
                current: 0,
                cursor: 0,
                drops: None,
            }),
            epoch: 0,
        })
    }

    /// Bump-allocates `size` bytes aligned to `align`.
    ///
    /// # Panics
    /// Panics if `align` is not a power of two.
    pub fn allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        assert!(
            align.is_power_of_two(),
            "arena alignment must be a power of two (got {align})"
        );

        if size == 0 {
            // SAFETY: `align` is a non-zero power of two.
            return Ok(unsafe { NonNull::new_unchecked(ptr::without_provenance_mut(align)) });
        }

        let err = AllocError { size, align };
        let mut guard = self.state.borrow_mut();
        let st = &mut *guard;

        loop {
            let block = &st.blocks[st.current];
            let base = block.ptr.as_ptr() as usize;
            let start = align_up(base + st.cursor, align).ok_or(err)? - base;

            if let Some(end) = start.checked_add(size) {
                if end <= block.layout.size() {
                    st.cursor = end;
                    // SAFETY: `start..end` lies within the block.
                    return Ok(unsafe { NonNull::new_unchecked(block.ptr.as_ptr().add(start)) });
                }
            }

            // Reuse blocks kept from earlier frames before growing.
            if st.current + 1 < st.blocks.len() {
                st.current += 1;
                st.cursor = 0;
                continue;
            }

            let last = block.layout.size();
            let wanted = size
                .checked_add(align)
                .ok_or(err)?
                .max(last.saturating_mul(2));
            let layout =
                Layout::from_size_align(wanted, align.max(BLOCK_ALIGN)).map_err(|_| err)?;

            st.blocks.try_reserve(1).map_err(|_| err)?;
            let ptr = st.source.allocate_block(layout).ok_or(err)?;

            log::debug!(
                "arena grew: block {} with {} bytes",
                st.blocks.len(),
                layout.size()
            );

            st.blocks.push(Block { ptr, layout });
            st.current = st.blocks.len() - 1;
            st.cursor = 0;
        }
    }

    /// Allocates storage for a `T` without initializing it.
    #[inline]
    pub fn allocate_for<T>(&self) -> Result<NonNull<T>, AllocError> {
        self.allocate(mem::size_of::<T>(), mem::align_of::<T>())
            .map(NonNull::cast)
    }

    /// Moves `value` into the arena.
    ///
    /// Values that need dropping are dropped on the next [`clear`](Self::clear)
    /// or when the arena itself is dropped, in reverse construction order.
    pub fn construct<T>(&self, value: T) -> Result<&mut T, AllocError> {
        let slot = self.allocate_for::<T>()?;

        if mem::needs_drop::<T>() {
            let entry = self.allocate_for::<DropEntry>()?;
            let mut st = self.state.borrow_mut();
            // SAFETY: both pointers are fresh, properly aligned arena storage.
            unsafe {
                slot.as_ptr().write(value);
                entry.as_ptr().write(DropEntry {
                    value: slot.as_ptr().cast(),
                    drop_fn: drop_erased::<T>,
                    next: st.drops,
                });
            }
            st.drops = Some(entry);
        } else {
            // SAFETY: fresh, properly aligned arena storage.
            unsafe { slot.as_ptr().write(value) };
        }

        // SAFETY: initialized above; unique until the arena is cleared.
        Ok(unsafe { &mut *slot.as_ptr() })
    }

    /// Copies `src` into the arena.
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> Result<&mut [T], AllocError> {
        let ptr = self
            .allocate(mem::size_of_val(src), mem::align_of::<T>())?
            .cast::<T>();
        // SAFETY: the destination is fresh arena storage large enough for `src`.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), ptr.as_ptr(), src.len());
            Ok(std::slice::from_raw_parts_mut(ptr.as_ptr(), src.len()))
        }
    }

    /// Collects an exact-size iterator into an arena slice.
    ///
    /// If the iterator yields fewer items than it announced, the slice is
    /// shortened accordingly.
    pub fn alloc_slice_from_iter<T, I>(&self, iter: I) -> Result<&mut [T], AllocError>
    where
        T: Copy,
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let iter = iter.into_iter();
        let cap = iter.len();
        let bytes = cap
            .checked_mul(mem::size_of::<T>())
            .ok_or(AllocError { size: usize::MAX, align: mem::align_of::<T>() })?;
        let ptr = self.allocate(bytes, mem::align_of::<T>())?.cast::<T>();

        let mut written = 0;
        for item in iter.take(cap) {
            // SAFETY: `written < cap`, inside the fresh allocation.
            unsafe { ptr.as_ptr().add(written).write(item) };
            written += 1;
        }

        // SAFETY: the first `written` elements are initialized.
        Ok(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), written) })
    }

    /// Copies a string into the arena.
    pub fn alloc_str(&self, s: &str) -> Result<&mut str, AllocError> {
        let bytes = self.alloc_slice_copy(s.as_bytes())?;
        // SAFETY: copied verbatim from a valid `str`.
        Ok(unsafe { std::str::from_utf8_unchecked_mut(bytes) })
    }

    /// Formats into arena memory.
    pub fn format(&self, args: fmt::Arguments<'_>) -> Result<&str, AllocError> {
        let mut out = ArenaString::new_in(self);
        if fmt::Write::write_fmt(&mut out, args).is_err() {
            return Err(out.last_error().unwrap_or(AllocError { size: 0, align: 1 }));
        }
        Ok(out.into_str())
    }

    /// Detaches a reference into this arena from its borrow.
    ///
    /// # Safety
    /// `value` must live in memory allocated by this arena (or be zero-sized),
    /// and no mutable reference to it may be used while an attached copy is
    /// alive.
    pub unsafe fn detach<T: ?Sized>(&self, value: &T) -> ArenaPtr<T> {
        debug_assert!(
            mem::size_of_val(value) == 0 || self.owns((value as *const T).cast()),
            "detached pointer does not belong to this arena"
        );
        ArenaPtr { ptr: NonNull::from(value), epoch: self.epoch }
    }

    /// Re-borrows a detached pointer.
    ///
    /// # Panics
    /// Panics if the arena was cleared after the pointer was detached.
    #[inline]
    pub fn attach<T: ?Sized>(&self, ptr: ArenaPtr<T>) -> &T {
        assert_eq!(
            ptr.epoch, self.epoch,
            "arena pointer used after the arena was cleared"
        );
        // SAFETY: the arena has not been cleared since `detach`, so the memory
        // is still allocated and initialized.
        unsafe { ptr.ptr.as_ref() }
    }

    /// Returns `true` if `ptr` points into one of the arena's blocks.
    pub fn owns(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        self.state.borrow().blocks.iter().any(|b| {
            let base = b.ptr.as_ptr() as usize;
            addr >= base && addr < base + b.layout.size()
        })
    }

    /// Invalidates every allocation and resets the bump pointer.
    ///
    /// Registered destructors run first. Blocks are kept for reuse.
    pub fn clear(&mut self) {
        let st = self.state.get_mut();
        run_drops(st);
        st.current = 0;
        st.cursor = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Clears the arena and returns every block but the first to the source.
    pub fn release_unused(&mut self) {
        self.clear();
        let st = self.state.get_mut();
        while st.blocks.len() > 1 {
            if let Some(block) = st.blocks.pop() {
                // SAFETY: the block came from this source with this layout and
                // nothing references it after `clear`.
                unsafe { st.source.release_block(block.ptr, block.layout) };
            }
        }
    }

    /// Number of clears performed so far.
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn block_count(&self) -> usize {
        self.state.borrow().blocks.len()
    }

    /// Total bytes held across all blocks.
    pub fn capacity(&self) -> usize {
        self.state.borrow().blocks.iter().map(|b| b.layout.size()).sum()
    }

    /// Bytes consumed since the last clear, alignment padding and skipped
    /// block tails included.
    pub fn allocated_bytes(&self) -> usize {
        let st = self.state.borrow();
        let full: usize = st.blocks[..st.current].iter().map(|b| b.layout.size()).sum();
        full + st.cursor
    }
}

impl<S: BlockSource> Drop for Arena<S> {
    fn drop(&mut self) {
        let st = self.state.get_mut();
        run_drops(st);
        for block in st.blocks.drain(..) {
            // SAFETY: every block came from this source with this layout.
            unsafe { st.source.release_block(block.ptr, block.layout) };
        }
    }
}

impl<S: BlockSource> fmt::Debug for Arena<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("epoch", &self.epoch)
            .field("blocks", &self.block_count())
            .field("capacity", &self.capacity())
            .field("allocated", &self.allocated_bytes())
            .finish()
    }
}

fn run_drops<S>(st: &mut State<S>) {
    let mut next = st.drops.take();
    while let Some(entry) = next {
        // SAFETY: entries and their values were written by `construct` and
        // are dropped exactly once here.
        unsafe {
            let e = entry.as_ptr().read();
            (e.drop_fn)(e.value);
            next = e.next;
        }
    }
}

unsafe fn drop_erased<T>(value: *mut u8) {
    // SAFETY: registered by `construct::<T>` for an initialized `T`.
    unsafe { ptr::drop_in_place(value.cast::<T>()) }
}

#[inline]
fn align_up(addr: usize, align: usize) -> Option<usize> {
    addr.checked_add(align - 1).map(|v| v & !(align - 1))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::memory::BudgetBlocks;

    fn arena(size: usize) -> Arena {
        Arena::try_new(size).expect("test arena")
    }

    // ── allocation ────────────────────────────────────────────────────────

    #[test]
    fn allocations_are_aligned() {
        let a = arena(1024);
        for align in [1, 2, 4, 8, 16, 32, 64] {
            let _ = a.allocate(3, 1).unwrap();
            let p = a.allocate(8, align).unwrap();
            assert_eq!(p.as_ptr() as usize % align, 0, "align {align}");
        }
    }

    #[test]
    fn zero_sized_allocation_is_aligned_and_free() {
        let a = arena(256);
        let before = a.allocated_bytes();
        let p = a.allocate(0, 8).unwrap();
        assert_eq!(p.as_ptr() as usize % 8, 0);
        assert_eq!(a.allocated_bytes(), before);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn non_power_of_two_alignment_panics() {
        let a = arena(256);
        let _ = a.allocate(4, 3);
    }

    #[test]
    fn slices_and_strings_round_trip() {
        let a = arena(256);
        let s = a.alloc_slice_copy(&[1u32, 2, 3]).unwrap();
        let t = a.alloc_str("hello").unwrap();
        assert_eq!(s, &[1, 2, 3]);
        assert_eq!(t, "hello");
    }

    #[test]
    fn slice_from_iter_collects() {
        let a = arena(256);
        let s = a.alloc_slice_from_iter((0..5u16).map(|v| v * 2)).unwrap();
        assert_eq!(s, &[0, 2, 4, 6, 8]);
    }

    #[test]
    fn format_writes_into_arena() {
        let a = arena(256);
        let s = a.format(format_args!("frame {} / {}", 3, "main")).unwrap();
        assert_eq!(s, "frame 3 / main");
        assert!(a.owns(s.as_ptr()));
    }

    // ── growth ────────────────────────────────────────────────────────────

    #[test]
    fn exhaustion_grows_without_moving_earlier_data() {
        let a = arena(256);
        let first = a.alloc_slice_copy(&[0xABu8; 200]).unwrap();
        let second = a.alloc_slice_copy(&[0xCDu8; 200]).unwrap();

        assert_eq!(a.block_count(), 2);
        assert!(first.iter().all(|&b| b == 0xAB));
        assert!(second.iter().all(|&b| b == 0xCD));
    }

    #[test]
    fn oversized_request_gets_its_own_block() {
        let a = arena(256);
        let big = a.allocate(4096, 64).unwrap();
        assert_eq!(big.as_ptr() as usize % 64, 0);
        assert!(a.capacity() >= 256 + 4096);
    }

    #[test]
    fn blocks_are_reused_after_clear() {
        let mut a = arena(256);
        let _ = a.allocate(200, 1).unwrap();
        let _ = a.allocate(200, 1).unwrap();
        let cap = a.capacity();
        a.clear();

        let _ = a.allocate(200, 1).unwrap();
        let _ = a.allocate(200, 1).unwrap();
        assert_eq!(a.capacity(), cap);
        assert_eq!(a.block_count(), 2);
    }

    #[test]
    fn release_unused_keeps_first_block() {
        let mut a = arena(256);
        let _ = a.allocate(1000, 8).unwrap();
        assert_eq!(a.block_count(), 2);
        a.release_unused();
        assert_eq!(a.block_count(), 1);
        assert_eq!(a.allocated_bytes(), 0);
    }

    #[test]
    fn budget_exhaustion_is_reported() {
        assert!(Arena::try_with_source(BudgetBlocks::new(64), 256).is_none());

        let a = Arena::try_with_source(BudgetBlocks::new(300), 256).unwrap();
        let err = a.allocate(512, 8).unwrap_err();
        assert_eq!(err, AllocError { size: 512, align: 8 });
        // The arena stays usable after a failed growth.
        assert!(a.allocate(16, 8).is_ok());
    }

    // ── clear / epochs ────────────────────────────────────────────────────

    #[test]
    fn clear_resets_usage_and_bumps_epoch() {
        let mut a = arena(256);
        let p = a.alloc_slice_copy(&[7u8; 32]).unwrap();
        p[0] = 9;
        assert!(a.allocated_bytes() >= 32);
        a.clear();
        assert_eq!(a.allocated_bytes(), 0);
        assert_eq!(a.epoch(), 1);
        // Reuse after clear is allowed; content is unspecified, only validity matters.
        let q = a.alloc_slice_copy(&[1u8; 32]).unwrap();
        assert_eq!(q[31], 1);
    }

    #[test]
    fn attach_within_epoch() {
        let a = arena(256);
        let s: &[u32] = a.alloc_slice_copy(&[4, 5, 6]).unwrap();
        let detached = unsafe { a.detach(s) };
        assert_eq!(a.attach(detached), &[4, 5, 6]);
    }

    #[test]
    #[should_panic(expected = "after the arena was cleared")]
    fn attach_after_clear_panics() {
        let mut a = arena(256);
        let detached = {
            let s: &str = a.alloc_str("stale").unwrap();
            unsafe { a.detach(s) }
        };
        a.clear();
        let _ = a.attach(detached);
    }

    // ── destructors ───────────────────────────────────────────────────────

    struct Tracked(Rc<Cell<u32>>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn constructed_values_drop_on_clear() {
        let drops = Rc::new(Cell::new(0));
        let mut a = arena(256);
        a.construct(Tracked(drops.clone())).unwrap();
        a.construct(Tracked(drops.clone())).unwrap();
        assert_eq!(drops.get(), 0);
        a.clear();
        assert_eq!(drops.get(), 2);
        a.clear();
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn constructed_values_drop_with_arena() {
        let drops = Rc::new(Cell::new(0));
        {
            let a = arena(256);
            let v = a.construct(Tracked(drops.clone())).unwrap();
            v.0.set(10);
        }
        assert_eq!(drops.get(), 11);
    }
}
