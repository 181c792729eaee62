//! The "pointer" type used inside every in-band free-list header: an offset into the owning
//! sub-region, or the [`NIL`] sentinel.
//!
//! Neither sub-region ever approaches `usize::MAX` bytes, so `usize::MAX` can never collide
//! with a real offset and is safe to use as "no link" without an `Option` wrapper.

/// Sentinel meaning "no link" inside a free-list header.
pub const NIL: usize = usize::MAX;
