//! The single OS-reservation collaborator: an anonymous, private `mmap` of [`Region::len`]
//! bytes, released with `munmap` on drop.
//!
//! This is the only place in the crate that talks to the OS for memory. Everything downstream
//! (`buddy`, `segregated`, `heap`) works purely in terms of a base pointer and an offset.

use std::ptr::NonNull;

use crate::error::Error;

/// A single anonymous memory mapping, owned for the lifetime of the [`crate::Heap`] that
/// reserved it.
pub struct Region {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: `Region` is a plain owned buffer; nothing about it is tied to the thread that
// created it. The crate's single-threaded contract is enforced by the caller, not by this
// impl — see `global`'s module docs for why we still need this to park a `Heap` in a `Mutex`.
unsafe impl Send for Region {}

impl Region {
    /// Reserves `len` bytes of zeroed, readable/writable anonymous memory from the OS.
    pub fn reserve(len: usize) -> Result<Region, Error> {
        // SAFETY: the arguments are a fixed, valid combination for an anonymous private
        // mapping; `mmap` is the only thing in this function that can fail.
        let raw = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if raw == libc::MAP_FAILED {
            let errno = std::io::Error::last_os_error();
            log::error!("mmap({len}) failed: {errno}");
            return Err(Error::InitFailed);
        }

        log::info!("reserved {len} bytes at {raw:p} via mmap");

        // SAFETY: `mmap` succeeded, so `raw` is a non-null pointer to `len` bytes we own.
        let ptr = unsafe { NonNull::new_unchecked(raw.cast::<u8>()) };
        Ok(Region { ptr, len })
    }

    /// Base address of the region.
    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Size of the region, in bytes, as passed to [`Region::reserve`].
    pub fn len(&self) -> usize {
        self.len
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        // SAFETY: `self.ptr`/`self.len` describe exactly the mapping `reserve` created, and
        // this is the only place that ever unmaps it.
        let result = unsafe { libc::munmap(self.ptr.as_ptr().cast(), self.len) };
        if result != 0 {
            let errno = std::io::Error::last_os_error();
            log::error!("munmap failed during cleanup: {errno}");
        }
    }
}
