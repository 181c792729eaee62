//! The dispatcher: owns both sub-allocators and one backing [`Region`], and routes
//! `malloc`/`free`/`realloc` by size for allocation and by pointer-range membership for
//! freeing and reallocating.

use std::io;
use std::ptr::NonNull;

use crate::buddy::{self, BuddyAllocator};
use crate::config::Config;
use crate::error::{fatal_unmanaged_pointer, Error, Result};
use crate::region::Region;
use crate::segregated::{self, SegAllocator};
use crate::stats::Stats;

/// An initialized heap: one OS-reserved region split into a buddy half and a segregated half,
/// plus the bookkeeping both halves share.
pub struct Heap {
    region: Region,
    config: Config,
    buddy: BuddyAllocator,
    segregated: SegAllocator,
    stats: Stats,
}

impl Heap {
    /// Reserves a backing region and brings up both sub-allocators over it: validate the
    /// configuration, `mmap` once, then carve the region into a buddy half and a segregated
    /// half.
    pub fn init() -> Result<Heap> {
        let config = Config::default_with_header_size(buddy::header_size());
        config.validate()?;

        let region = Region::reserve(config.heap_bytes)?;
        let base = region.as_mut_ptr();
        let buddy_bytes = config.buddy_bytes();
        let seg_bytes = config.seg_bytes();

        // SAFETY: `region` exclusively owns `config.heap_bytes` bytes starting at `base`, and
        // we hand the buddy allocator the first `buddy_bytes` of it.
        let buddy = unsafe { BuddyAllocator::new(base, buddy_bytes, config.min_block, config.max_order)? };

        // SAFETY: the segregated allocator gets the remaining `seg_bytes`, starting right
        // after the buddy sub-region; the two ranges are disjoint by construction.
        let segregated =
            unsafe { SegAllocator::new(base.add(buddy_bytes), seg_bytes, config.min_block, config.n_classes) };

        log::info!(
            "heap initialized: {} bytes total ({buddy_bytes} buddy, {seg_bytes} segregated, threshold {})",
            config.heap_bytes, config.big_threshold,
        );

        Ok(Heap {
            region,
            config,
            buddy,
            segregated,
            stats: Stats::new(config.heap_bytes as u64),
        })
    }

    /// Allocates at least `size` bytes, or `None` if `size` is zero or both allocators are
    /// exhausted or cannot serve a request this large.
    pub fn malloc(&mut self, size: usize) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }

        if size > self.config.big_threshold {
            return self.buddy.alloc(size, &mut self.stats).ok();
        }

        match self.segregated.alloc(size, &mut self.stats) {
            Ok(ptr) => Some(ptr),
            Err(Error::OutOfMemory) => {
                log::warn!("segregated allocator exhausted, falling back to buddy for {size} bytes (wastes space)");
                self.buddy.alloc(size, &mut self.stats).ok()
            }
            Err(_) => None,
        }
    }

    fn buddy_range(&self) -> std::ops::Range<usize> {
        let start = self.region.as_mut_ptr() as usize;
        start..start + self.config.buddy_bytes()
    }

    fn segregated_range(&self) -> std::ops::Range<usize> {
        let start = self.region.as_mut_ptr() as usize + self.config.buddy_bytes();
        start..start + self.config.seg_bytes()
    }

    /// Frees a pointer previously returned by [`Heap::malloc`]. Freeing `None` is a no-op.
    ///
    /// # Safety
    /// `ptr`, if present, must have been returned by this heap's `malloc` and not freed since.
    pub unsafe fn free(&mut self, ptr: Option<NonNull<u8>>) {
        let Some(ptr) = ptr else { return };
        let addr = ptr.as_ptr() as usize;

        if self.buddy_range().contains(&addr) {
            // SAFETY: forwarded from this function's contract.
            unsafe { self.buddy.free(ptr, &mut self.stats) };
        } else if self.segregated_range().contains(&addr) {
            // SAFETY: forwarded from this function's contract.
            unsafe { self.segregated.free(ptr, &mut self.stats) };
        } else {
            fatal_unmanaged_pointer(ptr.as_ptr());
        }
    }

    /// Resizes the allocation at `ptr` to `new_size`, copying the overlapping prefix.
    ///
    /// `ptr = None` behaves like `malloc(new_size)`; `new_size = 0` behaves like `free(ptr)`
    /// followed by returning `None`.
    ///
    /// # Safety
    /// `ptr`, if present, must have been returned by this heap's `malloc` and not freed since.
    pub unsafe fn realloc(&mut self, ptr: Option<NonNull<u8>>, new_size: usize) -> Option<NonNull<u8>> {
        let Some(old_ptr) = ptr else {
            return self.malloc(new_size);
        };

        if new_size == 0 {
            // SAFETY: forwarded from this function's contract.
            unsafe { self.free(Some(old_ptr)) };
            return None;
        }

        let addr = old_ptr.as_ptr() as usize;
        let old_capacity = if self.buddy_range().contains(&addr) {
            // SAFETY: `old_ptr` is in the buddy sub-region and came from this heap's `malloc`.
            unsafe { self.buddy.capacity_of(old_ptr) }
        } else if self.segregated_range().contains(&addr) {
            // SAFETY: `old_ptr` is in the segregated sub-region and came from this heap's
            // `malloc`.
            unsafe { self.segregated.capacity_of(old_ptr) }
        } else {
            fatal_unmanaged_pointer(old_ptr.as_ptr());
        };

        let new_ptr = self.malloc(new_size)?;

        let copy_len = old_capacity.min(new_size);
        // SAFETY: `old_ptr` and `new_ptr` each point to at least `copy_len` writable bytes,
        // and as freshly-returned allocations they cannot overlap.
        unsafe {
            std::ptr::copy_nonoverlapping(old_ptr.as_ptr(), new_ptr.as_ptr(), copy_len);
            self.free(Some(old_ptr));
        }

        Some(new_ptr)
    }

    /// Writes a human-readable statistics report, including per-class/per-order free-list
    /// occupancy.
    pub fn stats_print(&self, out: &mut impl io::Write) -> io::Result<()> {
        write!(out, "{}", self.stats)?;

        writeln!(out, "\nbuddy free lists:")?;
        for (order, block_size, count) in self.buddy.free_block_counts() {
            writeln!(out, "  order {order} (block size {block_size} bytes): {count} blocks")?;
        }

        writeln!(out, "\nsegregated free lists:")?;
        for (class_idx, count) in self.segregated.free_block_counts() {
            let class_size = self.config.min_block << class_idx;
            writeln!(out, "  class {class_idx} (target size {class_size} bytes): {count} blocks")?;
        }

        Ok(())
    }

    /// Current statistics snapshot.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Releases the backing region back to the OS. Equivalent to dropping the `Heap`; kept as
    /// an explicit method so callers that prefer an explicit teardown step (matching
    /// `global::cleanup`) have one.
    pub fn cleanup(self) {
        drop(self);
    }
}
