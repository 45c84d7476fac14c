use core::ptr::NonNull;

use log::{debug, trace, warn};

use crate::{
    HEADER_WORDS, WORD_SIZE,
    arena::{Arena, HeaderLocation},
    config::ArenaConfig,
    error::AllocError,
    header::BlockHeader,
    scanner::BlockScanner,
    words_for,
};

/// Block size for a request of `bytes`: the payload rounded up to words plus
/// the header. Saturates so oversized requests fail in the scan.
fn block_words_for(bytes: usize) -> u32 {
    words_for(bytes)
        .unwrap_or(u32::MAX)
        .saturating_add(HEADER_WORDS)
}

/// A committed block, seen from the caller's side.
///
/// The pointer stays valid for as long as the arena that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocation {
    header: HeaderLocation,
    block_words: u32,
    ptr: NonNull<u8>,
}

impl Allocation {
    /// First usable byte, right after the header.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn as_non_null(&self) -> NonNull<u8> {
        self.ptr
    }

    pub fn header(&self) -> HeaderLocation {
        self.header
    }

    /// Word offset of the usable region.
    pub fn offset_words(&self) -> u32 {
        self.header.offset_words() + HEADER_WORDS
    }

    /// Size recorded in the header.
    pub fn block_words(&self) -> u32 {
        self.block_words
    }

    pub fn payload_words(&self) -> u32 {
        self.block_words - HEADER_WORDS
    }

    /// Usable bytes.
    pub fn len(&self) -> usize {
        self.payload_words() as usize * WORD_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.payload_words() == 0
    }

    /// Where the next header in the chain lives.
    pub fn next_header(&self) -> HeaderLocation {
        HeaderLocation::new(self.header.offset_words() + self.block_words)
    }
}

/// First-fit allocator owning a single arena.
///
/// Not thread safe on its own: allocating takes `&mut self`. Wrap it in a
/// [`LockedFirstFit`](crate::LockedFirstFit) to share it.
#[derive(Debug)]
pub struct FirstFitAllocator {
    arena: Arena,
}

impl FirstFitAllocator {
    pub fn new(config: ArenaConfig) -> Result<Self, AllocError> {
        let arena = Arena::reserve(config)?;
        debug!(
            "reserved arena of {} words at {:p}",
            arena.capacity_words(),
            arena.base()
        );
        Ok(Self::from_arena(arena))
    }

    pub fn from_arena(arena: Arena) -> Self {
        FirstFitAllocator { arena }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn capacity_words(&self) -> u32 {
        self.arena.capacity_words()
    }

    /// Reserves at least `bytes` usable bytes, rounded up to whole words.
    ///
    /// The header is counted on top of the payload, so the block recorded
    /// for `bytes` is `ceil(bytes / 4) + 1` words: `allocate(20)` takes six
    /// words and leaves the next header at word 6.
    ///
    /// Scans the whole arena for the first virgin or large enough free block
    /// and commits there.
    pub fn allocate(&mut self, bytes: usize) -> Result<Allocation, AllocError> {
        let result = self.allocate_quiet(bytes);
        match &result {
            Ok(allocation) => trace!(
                "allocate({bytes}) -> {} words at {}",
                allocation.block_words(),
                allocation.header()
            ),
            Err(err @ AllocError::Unknown { .. }) => warn!("allocate({bytes}) failed: {err}"),
            Err(err) => debug!("allocate({bytes}) failed: {err}"),
        }
        result
    }

    /// Finds where a block holding `min_bytes` would go, without committing.
    pub fn locate_free(&self, min_bytes: usize) -> Result<HeaderLocation, AllocError> {
        let result = self.locate_free_quiet(min_bytes);
        match &result {
            Ok(location) => trace!("locate_free({min_bytes}) -> {location}"),
            Err(err @ AllocError::Unknown { .. }) => warn!("locate_free({min_bytes}) failed: {err}"),
            Err(err) => debug!("locate_free({min_bytes}) failed: {err}"),
        }
        result
    }

    /// Marks the header at `location` allocated with a size of `words`,
    /// header included, and returns the region behind it.
    ///
    /// `location` should come from [`locate_free`](Self::locate_free). The
    /// header is left untouched on failure. A free block larger than `words`
    /// keeps its size so the chain after it stays intact, and fails with
    /// [`AllocError::OutOfMemory`] if that size runs past the arena. `words`
    /// must cover at least the header; anything smaller is
    /// [`AllocError::Unknown`].
    pub fn commit(
        &mut self,
        words: u32,
        location: HeaderLocation,
    ) -> Result<Allocation, AllocError> {
        let words_in = location.offset_words().saturating_add(HEADER_WORDS);
        let available_words = self.arena.capacity_words().saturating_sub(words_in);
        let out_of_memory = AllocError::OutOfMemory {
            requested_words: words,
            available_words,
        };
        if words > available_words {
            return Err(out_of_memory);
        }
        if words < HEADER_WORDS {
            return Err(AllocError::Unknown { location });
        }
        let header_ptr = self.arena.header_ptr(location).ok_or(out_of_memory)?;

        let existing = header_ptr.read();
        if existing.allocated() {
            return Err(AllocError::Unknown { location });
        }
        let block_words = words.max(existing.size_words());
        if block_words > available_words {
            return Err(AllocError::OutOfMemory {
                requested_words: block_words,
                available_words,
            });
        }
        let header = BlockHeader::new(block_words, true)?;
        let ptr = NonNull::new(header_ptr.data()).ok_or(AllocError::Unknown { location })?;

        header_ptr.write(header);
        Ok(Allocation {
            header: location,
            block_words,
            ptr,
        })
    }

    pub(crate) fn allocate_quiet(&mut self, bytes: usize) -> Result<Allocation, AllocError> {
        let words = block_words_for(bytes);
        let location = BlockScanner::new(&self.arena).find(HeaderLocation::START, words, 0)?;
        self.commit(words, location)
    }

    pub(crate) fn locate_free_quiet(&self, min_bytes: usize) -> Result<HeaderLocation, AllocError> {
        BlockScanner::new(&self.arena).find(HeaderLocation::START, block_words_for(min_bytes), 0)
    }
}
