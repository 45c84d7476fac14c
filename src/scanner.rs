//! First-fit search over an arena's header chain.

use crate::{
    arena::{Arena, HeaderLocation},
    error::AllocError,
};

/// Words at the end of the arena the scan never hands out, so the header that
/// follows the last block always lies inside the arena.
const TAIL_RESERVE_WORDS: u32 = 2;

/// Walks the header chain of an arena looking for a place to put a block.
///
/// The scan only reads; it never writes a header.
#[derive(Clone, Copy, Debug)]
pub struct BlockScanner<'a> {
    arena: &'a Arena,
}

impl<'a> BlockScanner<'a> {
    pub fn new(arena: &'a Arena) -> Self {
        BlockScanner { arena }
    }

    /// Finds the first header at or after `start` that can hold a block of
    /// `allocation_words` words, header included.
    ///
    /// `words_consumed` is how much of the arena lies before `start`; a scan
    /// over the whole arena passes [`HeaderLocation::START`] and 0.
    ///
    /// A virgin header is always accepted. A free header is accepted when it
    /// is at least `allocation_words` large. Anything else is skipped by
    /// jumping over its recorded size.
    pub fn find(
        &self,
        start: HeaderLocation,
        allocation_words: u32,
        words_consumed: u32,
    ) -> Result<HeaderLocation, AllocError> {
        let limit = self
            .arena
            .capacity_words()
            .saturating_sub(TAIL_RESERVE_WORDS);
        let mut current = start;
        let mut consumed = words_consumed;

        loop {
            let out_of_memory = AllocError::OutOfMemory {
                requested_words: allocation_words,
                available_words: limit.saturating_sub(consumed),
            };
            match consumed.checked_add(allocation_words) {
                Some(needed) if needed <= limit => {}
                _ => return Err(out_of_memory),
            }
            let Some(header) = self.arena.read_header(current) else {
                return Err(out_of_memory);
            };

            if header.is_corrupt() {
                return Err(AllocError::Unknown { location: current });
            }
            if header.is_virgin() {
                return Ok(current);
            }
            if header.is_free() && header.size_words() >= allocation_words {
                return Ok(current);
            }

            let size = header.size_words();
            current = current.advance(size).ok_or(out_of_memory)?;
            consumed = consumed.checked_add(size).ok_or(out_of_memory)?;
        }
    }
}
