//! A process-wide singleton [`Heap`], exposed as free functions for callers that want the
//! `init`/`malloc`/`free`/`realloc`/`stats_print`/`cleanup` surface directly rather than
//! owning a [`Heap`] value.
//!
//! Parking the `Heap` in a `Mutex` exists purely to satisfy `Sync` so a `static` can hold it,
//! not to provide real concurrency safety. The contract is still single-threaded: calling
//! these functions from more than one thread at a time is undefined behavior by convention.

use std::io;
use std::ptr::NonNull;
use std::sync::{Mutex, OnceLock};

use crate::error::Error;
use crate::heap::Heap;

static HEAP: OnceLock<Mutex<Option<Heap>>> = OnceLock::new();

fn cell() -> &'static Mutex<Option<Heap>> {
    HEAP.get_or_init(|| Mutex::new(None))
}

/// Initializes the global heap. Calling this twice without an intervening [`cleanup`]
/// replaces the previous heap, releasing its backing region.
pub fn init() -> Result<(), Error> {
    let heap = Heap::init()?;
    *cell().lock().unwrap() = Some(heap);
    Ok(())
}

/// Allocates at least `size` bytes from the global heap.
///
/// # Panics
/// Panics if [`init`] has not been called yet.
pub fn malloc(size: usize) -> Option<NonNull<u8>> {
    let mut guard = cell().lock().unwrap();
    let heap = guard.as_mut().expect("global heap not initialized; call init() first");
    heap.malloc(size)
}

/// Frees a pointer previously returned by [`malloc`]. Freeing `None` is a no-op.
///
/// # Safety
/// `ptr`, if present, must have been returned by [`malloc`] and not freed since.
///
/// # Panics
/// Panics if [`init`] has not been called yet.
pub unsafe fn free(ptr: Option<NonNull<u8>>) {
    let mut guard = cell().lock().unwrap();
    let heap = guard.as_mut().expect("global heap not initialized; call init() first");
    // SAFETY: forwarded from this function's contract.
    unsafe { heap.free(ptr) };
}

/// Resizes the allocation at `ptr` to `new_size`, as [`Heap::realloc`].
///
/// # Safety
/// `ptr`, if present, must have been returned by [`malloc`] and not freed since.
///
/// # Panics
/// Panics if [`init`] has not been called yet.
pub unsafe fn realloc(ptr: Option<NonNull<u8>>, new_size: usize) -> Option<NonNull<u8>> {
    let mut guard = cell().lock().unwrap();
    let heap = guard.as_mut().expect("global heap not initialized; call init() first");
    // SAFETY: forwarded from this function's contract.
    unsafe { heap.realloc(ptr, new_size) }
}

/// Writes a statistics report for the global heap.
///
/// # Panics
/// Panics if [`init`] has not been called yet.
pub fn stats_print(out: &mut impl io::Write) -> io::Result<()> {
    let guard = cell().lock().unwrap();
    let heap = guard.as_ref().expect("global heap not initialized; call init() first");
    heap.stats_print(out)
}

/// Tears down the global heap, releasing its backing region back to the OS.
///
/// A no-op if [`init`] was never called or [`cleanup`] was already run.
pub fn cleanup() {
    if let Some(heap) = cell().lock().unwrap().take() {
        heap.cleanup();
    }
}
