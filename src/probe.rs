//! True memory footprint via a counting global allocator.
//!
//! The analytic footprint reported by each representation is what it *claims*
//! to need. The probe measures what building it actually cost on the heap: the
//! live-byte delta across a build, plus the inline size of the value itself.
//!
//! Only a binary can install a global allocator, so the probe reports
//! [`Error::ProbeUnavailable`] everywhere else and callers drop the probed columns.
//!
//! ```ignore
//! #[global_allocator]
//! static ALLOC: setbench::probe::TrackingAllocator = setbench::probe::TrackingAllocator;
//! ```

use std::alloc::{GlobalAlloc, Layout, System};
use std::hint::black_box;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{Error, Result};

static LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// System allocator wrapper that counts live heap bytes.
pub struct TrackingAllocator;

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
            INSTALLED.store(true, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
            INSTALLED.store(true, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        LIVE_BYTES.fetch_sub(layout.size(), Ordering::Relaxed);
        unsafe { System.dealloc(ptr, layout) };
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            LIVE_BYTES.fetch_add(new_size, Ordering::Relaxed);
            LIVE_BYTES.fetch_sub(layout.size(), Ordering::Relaxed);
        }
        new_ptr
    }
}

/// Handle proving the tracking allocator is live in this process.
#[derive(Debug, Clone, Copy)]
pub struct MemoryProbe {
    _installed: (),
}

impl MemoryProbe {
    /// Check that [`TrackingAllocator`] is the global allocator.
    pub fn init() -> Result<Self> {
        // Any heap allocation routed through the tracker flips the flag.
        drop(black_box(Box::new(0u64)));
        if INSTALLED.load(Ordering::Relaxed) {
            Ok(Self { _installed: () })
        } else {
            Err(Error::ProbeUnavailable(
                "TrackingAllocator is not the global allocator".to_string(),
            ))
        }
    }

    /// Bytes currently allocated through the tracker.
    pub fn live_bytes(&self) -> usize {
        LIVE_BYTES.load(Ordering::Relaxed)
    }

    /// Footprint in bits of a value whose build moved live bytes from `before` to `after`.
    pub fn footprint_bits<T>(before: usize, after: usize) -> u64 {
        (after.saturating_sub(before) + std::mem::size_of::<T>()) as u64 * 8
    }
}
