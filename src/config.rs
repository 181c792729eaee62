//! Compile-time tunables and the runtime invariant check that gates [`crate::Heap::init`].
//!
//! Each tunable is both a `pub const` and a field on [`Config`], which mirrors them as
//! runtime values so alternative configurations can be exercised in tests without
//! recompiling.

use crate::error::{Error, Result};

/// Default total size of the backing region: 1 MiB.
pub const HEAP_BYTES: usize = 1024 * 1024;

/// Smallest addressable block, in bytes. Also the buddy system's order-0 block size.
pub const MIN_BLOCK: usize = 16;

/// Exclusive upper bound on buddy order. Valid orders are `0..MAX_ORDER`.
pub const MAX_ORDER: u32 = 20;

/// Number of size classes in the segregated allocator. Class `i` has nominal size
/// `MIN_BLOCK << i`.
pub const N_CLASSES: usize = 12;

/// User-payload alignment; all internal sizes are rounded up to a multiple of this.
pub const ALIGN: usize = 8;

/// Half of [`HEAP_BYTES`], handed to the buddy allocator.
pub const BUDDY_BYTES: usize = HEAP_BYTES / 2;

/// Half of [`HEAP_BYTES`], handed to the segregated allocator.
pub const SEG_BYTES: usize = HEAP_BYTES - BUDDY_BYTES;

/// Requests strictly above `BIG_THRESHOLD` always go to the buddy allocator.
///
/// `4096 - size_of::<BuddyHeader>()`, computed at `Config::default()` time rather than as a
/// `const` because `BuddyHeader`'s layout lives in [`crate::buddy`] and we'd rather not make
/// `config` depend on it just for one subtraction.
pub const BIG_THRESHOLD_BASE: usize = 4096;

/// Runtime mirror of the compile-time constants above.
///
/// Exists so tests can build a [`crate::Heap`] with a shrunk heap (to exercise
/// out-of-memory paths quickly) without recompiling the whole crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub heap_bytes: usize,
    pub min_block: usize,
    pub max_order: u32,
    pub n_classes: usize,
    pub align: usize,
    pub big_threshold: usize,
}

impl Config {
    /// The default configuration, matching the `pub const`s above exactly.
    pub fn default_with_header_size(buddy_header_size: usize) -> Self {
        Self {
            heap_bytes: HEAP_BYTES,
            min_block: MIN_BLOCK,
            max_order: MAX_ORDER,
            n_classes: N_CLASSES,
            align: ALIGN,
            big_threshold: BIG_THRESHOLD_BASE - buddy_header_size,
        }
    }

    pub fn buddy_bytes(&self) -> usize {
        self.heap_bytes / 2
    }

    pub fn seg_bytes(&self) -> usize {
        self.heap_bytes - self.buddy_bytes()
    }

    /// Checks the invariants that keep the size math in [`crate::size`] and [`crate::buddy`]
    /// internally consistent, failing fast with [`Error::InitFailed`] rather than letting a
    /// misconfigured heap silently misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.min_block != 1 << 4 {
            log::error!("config: min_block must be 16, got {}", self.min_block);
            return Err(Error::InitFailed);
        }

        let largest_order_size = (self.min_block as u128) << (self.max_order - 1);
        if largest_order_size < (self.buddy_bytes() / 2) as u128 {
            log::error!(
                "config: min_block * 2^(max_order-1) must be >= buddy_bytes/2, got {largest_order_size}"
            );
            return Err(Error::InitFailed);
        }

        let largest_class_size = self.min_block << (self.n_classes - 1);
        if self.big_threshold >= largest_class_size {
            log::error!(
                "config: big_threshold ({}) must be smaller than the largest size class ({})",
                self.big_threshold,
                largest_class_size
            );
            return Err(Error::InitFailed);
        }

        if !self.buddy_bytes().is_power_of_two() {
            log::error!(
                "config: buddy_bytes ({}) must be a power of two",
                self.buddy_bytes()
            );
            return Err(Error::InitFailed);
        }

        Ok(())
    }
}
