//! Running counters for one [`crate::Heap`], and their [`Display`] reporter.

use std::fmt;

/// Running counters for one heap, updated by both the buddy and segregated allocators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Total bytes reserved for this heap (both sub-regions combined).
    pub total_bytes: u64,
    /// Number of successful `malloc` calls.
    pub allocation_count: u64,
    /// Number of successful `free` calls (freeing a null pointer does not count).
    pub free_count: u64,
    /// Bytes currently handed out, including headers. Grows on `on_alloc`, shrinks on
    /// `on_free`; `total_allocated + total_free == total_bytes` at every quiescent point.
    pub total_allocated: u64,
    /// Bytes currently free, including headers not yet claimed by any block. Complements
    /// `total_allocated`.
    pub total_free: u64,
    /// Number of times an allocator had to report out-of-memory, or left a block whole
    /// rather than split it, for a request.
    pub fragmentation_count: u64,
}

impl Stats {
    /// A fresh counter set for a heap of `total_bytes`, all of it initially free.
    pub fn new(total_bytes: u64) -> Self {
        Stats {
            total_bytes,
            allocation_count: 0,
            free_count: 0,
            total_allocated: 0,
            total_free: total_bytes,
            fragmentation_count: 0,
        }
    }

    /// Records a successful allocation of `block_size` bytes (including its header).
    pub fn on_alloc(&mut self, block_size: u64) {
        self.allocation_count = self.allocation_count.saturating_add(1);
        self.total_allocated = self.total_allocated.saturating_add(block_size);
        self.total_free = self.total_free.saturating_sub(block_size);
    }

    /// Records a successful free of `block_size` bytes (including its header).
    pub fn on_free(&mut self, block_size: u64) {
        self.free_count = self.free_count.saturating_add(1);
        self.total_allocated = self.total_allocated.saturating_sub(block_size);
        self.total_free = self.total_free.saturating_add(block_size);
    }

    /// Records a request that neither allocator could satisfy, or a split that was skipped
    /// because the remainder would have been too small to carve off.
    pub fn on_fragmentation(&mut self) {
        self.fragmentation_count = self.fragmentation_count.saturating_add(1);
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const HEADER: &str = "heap statistics";
        writeln!(f, "{HEADER}")?;
        HEADER.chars().try_for_each(|_| write!(f, "~"))?;
        writeln!(f)?;
        writeln!(f, "total bytes:        {}", self.total_bytes)?;
        writeln!(f, "allocation count:   {}", self.allocation_count)?;
        writeln!(f, "free count:         {}", self.free_count)?;
        writeln!(f, "total allocated:    {}", self.total_allocated)?;
        writeln!(f, "total free:         {}", self.total_free)?;
        writeln!(f, "fragmentation hits: {}", self.fragmentation_count)?;
        HEADER.chars().try_for_each(|_| write!(f, "~"))?;
        writeln!(f)?;
        Ok(())
    }
}
