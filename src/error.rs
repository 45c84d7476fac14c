//! Errors shared by the arena, the scanner and the allocator.

use crate::arena::HeaderLocation;

/// Failures reported by the arena, scanner and allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    /// The request cannot fit in what is left of the arena.
    #[error("out of memory: requested {requested_words} words, {available_words} available")]
    OutOfMemory {
        requested_words: u32,
        available_words: u32,
    },
    /// The header chain is inconsistent, e.g. an allocated block of size 0.
    #[error("corrupt block header at {location}")]
    Unknown { location: HeaderLocation },
    #[error("arena capacity of {capacity_words} words is out of range")]
    InvalidCapacity { capacity_words: u32 },
    /// `mmap` refused to reserve the arena.
    #[error("failed to reserve arena (errno {errno})")]
    ReserveFailed { errno: i32 },
}

impl AllocError {
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }
}
