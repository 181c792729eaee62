//! Pure, stateless size math shared by [`crate::buddy`] and [`crate::segregated`].
//!
//! [`order`] deliberately does not saturate at `max_order - 1` for a size too large to fit
//! any valid order; it reports [`Error::TooLarge`] instead, so an oversized request never
//! silently gets handed a too-small block.

use crate::error::{Error, Result};

/// Rounds `n` up to a multiple of `align`.
///
/// `align` must be a power of two. Callers guarantee the heap never asks for a size close
/// enough to `usize::MAX` to overflow here.
pub fn align_up(n: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (n + align - 1) & !(align - 1)
}

/// Smallest buddy order `k` in `0..max_order` such that `min_block << k >= n`.
///
/// Returns [`Error::TooLarge`] if `n` exceeds what the largest valid order can hold, rather
/// than the saturating behavior of a naive port (see module docs).
pub fn order(n: usize, min_block: usize, max_order: u32) -> Result<u32> {
    let mut block_size = min_block;
    let mut k = 0u32;

    while block_size < n {
        if k + 1 >= max_order {
            return Err(Error::TooLarge);
        }
        block_size <<= 1;
        k += 1;
    }

    Ok(k)
}

/// Smallest size-class index `i` in `0..n_classes` such that `min_block << i >= n`, saturating
/// at `n_classes - 1` for larger sizes (unlike [`order`], oversized requests are a normal,
/// expected case here — they just mean "use the biggest class and first-fit from there").
pub fn class_index(n: usize, min_block: usize, n_classes: usize) -> usize {
    let mut class_size = min_block;
    let mut i = 0usize;

    while class_size < n {
        if i + 1 >= n_classes {
            return n_classes - 1;
        }
        class_size <<= 1;
        i += 1;
    }

    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_multiple_of_eight() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 8), 16);
        assert_eq!(align_up(30, 8), 32);
    }

    #[test]
    fn order_matches_power_of_two_block_sizes() {
        assert_eq!(order(1, 16, 20).unwrap(), 0);
        assert_eq!(order(16, 16, 20).unwrap(), 0);
        assert_eq!(order(17, 16, 20).unwrap(), 1);
        assert_eq!(order(32, 16, 20).unwrap(), 1);
        assert_eq!(order(33, 16, 20).unwrap(), 2);
        assert_eq!(order(8192, 16, 20).unwrap(), 9);
    }

    #[test]
    fn order_rejects_sizes_too_large_for_any_valid_order() {
        let max_block = 16usize << 19; // order 19, the largest valid order for max_order=20
        assert_eq!(order(max_block, 16, 20), Ok(19));
        assert_eq!(order(max_block + 1, 16, 20), Err(Error::TooLarge));
    }

    #[test]
    fn class_index_saturates_at_largest_class() {
        assert_eq!(class_index(1, 16, 12), 0);
        assert_eq!(class_index(16, 16, 12), 0);
        assert_eq!(class_index(17, 16, 12), 1);
        assert_eq!(class_index(32768, 16, 12), 11);
        assert_eq!(class_index(1_000_000, 16, 12), 11);
    }
}
