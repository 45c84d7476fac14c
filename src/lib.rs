//! First-fit allocation over a single fixed-capacity arena.
//!
//! All sizes and offsets are counted in 4-byte words. Every block carries a
//! one-word header inline, so there is no side table:
//!
//! ```text
//! word:  0    1 .. 5   6    7 .. 9   10
//!        hdr  payload  hdr  payload  0000 ...
//!        ^--- USED 6   ^--- USED 4   ^--- virgin tail
//! ```
//!
//! A scan starts at word 0 and jumps from header to header using the recorded
//! size until it hits a virgin header (size 0) or a free block that is big
//! enough. Nothing is ever freed.

#![cfg_attr(not(test), no_std)]

pub mod allocator;
pub mod arena;
pub mod config;
pub mod error;
pub mod header;
pub mod locked;
pub mod scanner;

pub use allocator::{Allocation, FirstFitAllocator};
pub use arena::{Arena, HeaderLocation};
pub use config::ArenaConfig;
pub use error::AllocError;
pub use header::BlockHeader;
pub use locked::LockedFirstFit;
pub use scanner::BlockScanner;

/// Accounting unit for every size and offset in the arena.
pub type Word = u32;

/// Bytes per [`Word`].
pub const WORD_SIZE: usize = core::mem::size_of::<Word>();

/// Width of a block header.
pub const HEADER_WORDS: u32 = 1;

/// Number of words needed to hold `bytes`, rounded up.
///
/// Returns `None` if the count does not fit a header's size field.
pub fn words_for(bytes: usize) -> Option<u32> {
    let words = bytes.div_ceil(WORD_SIZE);
    u32::try_from(words)
        .ok()
        .filter(|&w| w <= header::MAX_SIZE_WORDS)
}
