//! The segregated free-list allocator: services small allocations from per-class free lists,
//! splitting a block when the remainder is worth keeping and never physically coalescing on
//! free.
//!
//! First-fit within a class, falling through to larger classes when the current one is
//! exhausted; a block is only split when the remainder would be at least `min_block + header`,
//! and free-list insertion is always at the head. Headers use the same offset/`NIL`-sentinel
//! representation as [`crate::buddy`].

use std::mem;
use std::ptr::NonNull;

use crate::config::ALIGN;
use crate::error::{fatal_double_free, Error, Result};
use crate::link::NIL;
use crate::size;
use crate::stats::Stats;

/// In-band header preceding every segregated block, free or allocated.
#[repr(C)]
struct SegHeader {
    size: usize,
    is_free: bool,
    prev: usize,
    next: usize,
}

/// Size of [`SegHeader`].
pub fn header_size() -> usize {
    mem::size_of::<SegHeader>()
}

/// Manages one contiguous sub-region as a segregated-by-size-class pool of variable-size
/// blocks.
pub struct SegAllocator {
    base: *mut u8,
    len: usize,
    min_block: usize,
    n_classes: usize,
    /// `size_classes[i]` is the offset of the head of class `i`'s free list, or [`NIL`].
    size_classes: Vec<usize>,
}

// SAFETY: `base` points into the `Heap`'s backing region, not at thread-local or
// thread-owned state; nothing about a `SegAllocator` ties it to the thread that created it.
// The crate's single-threaded contract is enforced by the caller, same as `Region`.
unsafe impl Send for SegAllocator {}

impl SegAllocator {
    /// Creates a segregated allocator over `len` bytes starting at `base`, seeded with one
    /// free block covering the whole region.
    ///
    /// # Safety
    /// `base` must point to `len` bytes of memory this allocator exclusively owns for its
    /// entire lifetime.
    pub unsafe fn new(base: *mut u8, len: usize, min_block: usize, n_classes: usize) -> Self {
        let mut allocator = SegAllocator {
            base,
            len,
            min_block,
            n_classes,
            size_classes: vec![NIL; n_classes],
        };

        let class_idx = size::class_index(len, min_block, n_classes);
        // SAFETY: offset 0 is the start of the region we were given exclusive ownership of.
        unsafe { allocator.list_push(class_idx, 0, len) };

        log::info!("segregated: seeded {len} bytes as one block in class {class_idx}");
        allocator
    }

    unsafe fn header(&self, offset: usize) -> &mut SegHeader {
        debug_assert!(offset < self.len);
        // SAFETY: `offset < self.len` and `base..base+len` is ours; every offset we push into
        // a free list is a block boundary within that range.
        unsafe { &mut *(self.base.add(offset).cast::<SegHeader>()) }
    }

    unsafe fn list_push(&mut self, class_idx: usize, offset: usize, size: usize) {
        let head = self.size_classes[class_idx];
        {
            let node = unsafe { self.header(offset) };
            node.size = size;
            node.is_free = true;
            node.prev = NIL;
            node.next = head;
        }
        if head != NIL {
            unsafe { self.header(head) }.prev = offset;
        }
        self.size_classes[class_idx] = offset;
    }

    unsafe fn list_unlink(&mut self, class_idx: usize, offset: usize) {
        let (prev, next) = {
            let h = unsafe { self.header(offset) };
            (h.prev, h.next)
        };
        if prev != NIL {
            unsafe { self.header(prev) }.next = next;
        } else {
            self.size_classes[class_idx] = next;
        }
        if next != NIL {
            unsafe { self.header(next) }.prev = prev;
        }
    }

    /// Allocates a block able to hold `size` bytes of payload, returning a pointer just past
    /// its header.
    pub fn alloc(&mut self, size: usize, stats: &mut Stats) -> Result<NonNull<u8>> {
        let need = size::align_up(size + header_size(), ALIGN);
        let start_class = size::class_index(need, self.min_block, self.n_classes);

        for class_idx in start_class..self.n_classes {
            let mut cursor = self.size_classes[class_idx];
            while cursor != NIL {
                let (block_size, next) = {
                    let h = unsafe { self.header(cursor) };
                    (h.size, h.next)
                };

                if block_size >= need {
                    unsafe { self.list_unlink(class_idx, cursor) };

                    let granted_size =
                        if block_size >= need + header_size() + self.min_block {
                            let remainder_offset = cursor + need;
                            let remainder_size = block_size - need;
                            let remainder_class =
                                size::class_index(remainder_size, self.min_block, self.n_classes);
                            log::trace!(
                                "segregated: splitting block at {cursor:#x}, remainder {remainder_size} bytes at {remainder_offset:#x}"
                            );
                            unsafe {
                                self.list_push(remainder_class, remainder_offset, remainder_size)
                            };
                            need
                        } else {
                            stats.on_fragmentation();
                            block_size
                        };

                    {
                        let header = unsafe { self.header(cursor) };
                        header.size = granted_size;
                        header.is_free = false;
                        header.prev = NIL;
                        header.next = NIL;
                    }

                    stats.on_alloc(granted_size as u64);
                    log::debug!(
                        "segregated: allocated {granted_size} bytes (class {class_idx}) at offset {cursor:#x}"
                    );

                    let ptr = unsafe { self.base.add(cursor + header_size()) };
                    return Ok(NonNull::new(ptr).expect("segregated region base is non-null"));
                }

                cursor = next;
            }
        }

        stats.on_fragmentation();
        log::debug!("segregated: out of memory for {need} bytes");
        Err(Error::OutOfMemory)
    }

    /// Frees a block previously returned by [`SegAllocator::alloc`].
    ///
    /// Does not attempt to merge with physically adjacent blocks; the block is simply handed
    /// back to its size class's free list, head-first.
    ///
    /// # Safety
    /// `ptr` must have been returned by this allocator's `alloc` and not freed since.
    pub unsafe fn free(&mut self, ptr: NonNull<u8>, stats: &mut Stats) {
        let header_ptr = unsafe { ptr.as_ptr().sub(header_size()) };
        let offset = header_ptr as usize - self.base as usize;

        let size = {
            let header = unsafe { self.header(offset) };
            if header.is_free {
                fatal_double_free("segregated", ptr.as_ptr());
            }
            header.is_free = true;
            header.size
        };

        stats.on_free(size as u64);
        log::debug!("segregated: freed {size} bytes at offset {offset:#x}");

        let class_idx = size::class_index(size, self.min_block, self.n_classes);
        unsafe { self.list_push(class_idx, offset, size) };
    }

    /// Payload capacity of the block governing `ptr`.
    ///
    /// # Safety
    /// `ptr` must have been returned by this allocator's `alloc` and not freed since.
    pub unsafe fn capacity_of(&self, ptr: NonNull<u8>) -> usize {
        let header_ptr = unsafe { ptr.as_ptr().sub(header_size()) };
        let offset = header_ptr as usize - self.base as usize;
        unsafe { self.header(offset) }.size - header_size()
    }

    /// Number of free blocks per size class, for the statistics reporter.
    pub fn free_block_counts(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for class_idx in 0..self.n_classes {
            let mut count = 0;
            let mut cursor = self.size_classes[class_idx];
            while cursor != NIL {
                count += 1;
                cursor = unsafe { self.header(cursor) }.next;
            }
            if count > 0 {
                out.push((class_idx, count));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_allocator(len: usize) -> (Vec<u8>, SegAllocator) {
        let mut backing = vec![0u8; len];
        let base = backing.as_mut_ptr();
        // SAFETY: `backing` outlives the allocator in every test below.
        let allocator = unsafe { SegAllocator::new(base, len, 16, 12) };
        (backing, allocator)
    }

    #[test]
    fn allocate_and_free_returns_block_to_its_class() {
        let (_backing, mut seg) = new_allocator(512 * 1024);
        let mut stats = Stats::new(512 * 1024);

        let ptr = seg.alloc(30, &mut stats).unwrap();
        unsafe { seg.free(ptr, &mut stats) };

        assert_eq!(stats.allocation_count, 1);
        assert_eq!(stats.free_count, 1);
    }

    #[test]
    fn freed_slot_is_reused_by_a_same_size_request() {
        let (_backing, mut seg) = new_allocator(512 * 1024);
        let mut stats = Stats::new(512 * 1024);

        let a = seg.alloc(40, &mut stats).unwrap();
        let b = seg.alloc(40, &mut stats).unwrap();
        unsafe { seg.free(a, &mut stats) };
        let c = seg.alloc(40, &mut stats).unwrap();

        assert_eq!(a, c);
        let _ = b;
    }

    #[test]
    fn exhausting_the_region_reports_out_of_memory() {
        let (_backing, mut seg) = new_allocator(4096);
        let mut stats = Stats::new(4096);

        let mut live = Vec::new();
        loop {
            match seg.alloc(16, &mut stats) {
                Ok(ptr) => live.push(ptr),
                Err(Error::OutOfMemory) => break,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert!(stats.fragmentation_count >= 1);
        for ptr in live {
            unsafe { seg.free(ptr, &mut stats) };
        }
    }

    #[test]
    fn small_remainder_is_not_split_off() {
        let (_backing, mut seg) = new_allocator(512 * 1024);
        let mut stats = Stats::new(512 * 1024);

        // Requesting nearly the whole class leaves a remainder too small to host
        // `min_block + header`, so the whole block should be granted unsplit.
        let ptr = seg.alloc(512 * 1024 - header_size() - 4, &mut stats).unwrap();
        assert!(unsafe { seg.capacity_of(ptr) } >= 512 * 1024 - header_size() - 4);
        assert_eq!(stats.fragmentation_count, 1, "leaving the block whole must record fragmentation");
    }
}
