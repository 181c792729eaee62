//! Errors for every fallible operation in this crate.
//!
//! Not every contract violation ends up as an [`Error`] though. `DoubleFree` and
//! `UnmanagedPointer` are bugs in the caller discovered *after* the heap may already be
//! corrupted, so instead of handing them back as a value a caller could plausibly recover
//! from, [`fatal_double_free`] and [`fatal_unmanaged_pointer`] log a diagnostic and abort the
//! process.

use displaydoc_lite::displaydoc;

/// Result for every fallible operation in this crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

displaydoc! {
    /// Any recoverable error that can happen while initializing or using the heap.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Error {
        /// both the segregated and buddy allocators are exhausted for this request
        OutOfMemory,
        /// requested size exceeds the largest order the buddy allocator can serve
        TooLarge,
        /// failed to initialize the heap (OS reservation failed or configuration is invalid)
        InitFailed,
    }
}

impl std::error::Error for Error {}

/// Logs a double-free diagnostic and aborts the process.
///
/// `which` names the subsystem (`"buddy"` or `"segregated"`) that detected the corruption.
pub fn fatal_double_free(which: &str, ptr: *const u8) -> ! {
    log::error!("double free detected in {which} allocator: ptr={ptr:p}");
    std::process::abort()
}

/// Logs an unmanaged-pointer diagnostic and aborts the process.
pub fn fatal_unmanaged_pointer(ptr: *const u8) -> ! {
    log::error!("attempt to free unmanaged pointer: ptr={ptr:p}");
    std::process::abort()
}
