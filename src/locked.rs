use core::{
    alloc::{GlobalAlloc, Layout},
    ptr,
};

use spin::Mutex;

use crate::{
    WORD_SIZE,
    allocator::{Allocation, FirstFitAllocator},
    arena::{Arena, HeaderLocation},
    config::ArenaConfig,
    error::AllocError,
};

/// A [`FirstFitAllocator`] behind a spin lock, usable as the global allocator.
///
/// Scan and commit run under one lock, so concurrent callers never land on
/// the same block. The arena is reserved on first use.
///
/// ```no_run
/// use firstfit::{ArenaConfig, LockedFirstFit};
///
/// #[global_allocator]
/// static ALLOCATOR: LockedFirstFit =
///     LockedFirstFit::new(ArenaConfig::with_capacity_words(1 << 20));
/// ```
///
/// Nothing is ever freed: `dealloc` does nothing, and alignments above one
/// word are refused.
pub struct LockedFirstFit {
    config: ArenaConfig,
    inner: Mutex<Option<FirstFitAllocator>>,
}

impl LockedFirstFit {
    pub const fn new(config: ArenaConfig) -> Self {
        LockedFirstFit {
            config,
            inner: Mutex::new(None),
        }
    }

    pub fn config(&self) -> ArenaConfig {
        self.config
    }

    pub fn allocate(&self, bytes: usize) -> Result<Allocation, AllocError> {
        self.with_allocator(|allocator| allocator.allocate(bytes))
    }

    pub fn locate_free(&self, min_bytes: usize) -> Result<HeaderLocation, AllocError> {
        self.with_allocator(|allocator| allocator.locate_free(min_bytes))
    }

    fn with_allocator<T>(
        &self,
        f: impl FnOnce(&mut FirstFitAllocator) -> Result<T, AllocError>,
    ) -> Result<T, AllocError> {
        let mut inner = self.inner.lock();
        let allocator = match &mut *inner {
            Some(allocator) => allocator,
            slot => slot.insert(FirstFitAllocator::from_arena(Arena::reserve(self.config)?)),
        };
        f(allocator)
    }
}

// The global path never logs: a logger may allocate and re-enter the lock.
unsafe impl GlobalAlloc for LockedFirstFit {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > WORD_SIZE {
            return ptr::null_mut();
        }
        match self.with_allocator(|allocator| allocator.allocate_quiet(layout.size())) {
            Ok(allocation) => allocation.as_ptr(),
            Err(_) => ptr::null_mut(),
        }
    }

    unsafe fn dealloc(&self, _ptr: *mut u8, _layout: Layout) {}
}
