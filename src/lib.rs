//! A general-purpose heap combining a buddy allocator and a segregated free-list allocator
//! over one OS-reserved backing region, split into two equal halves.
//!
//! Requests above a configurable threshold are served by the buddy half, which splits and
//! coalesces power-of-two blocks; smaller requests are served by the segregated half, which
//! first-fits a size-class free list and falls back to the buddy half when its own class
//! chain is exhausted. See [`Heap`] for the owned API, or [`global`] for a process-wide
//! singleton exposing the same operations as free functions.

#![deny(rust_2018_idioms)]

pub mod config;
pub mod global;

mod buddy;
mod error;
mod heap;
mod link;
mod region;
mod segregated;
mod size;
mod stats;

pub use config::Config;
pub use error::{Error, Result};
pub use heap::Heap;
pub use stats::Stats;
