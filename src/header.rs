use core::ops::Deref;

use crate::error::AllocError;

const SIZE_BITS: u32 = 30;
const SIZE_MASK: u32 = (1 << SIZE_BITS) - 1;
const ALLOCATED_BIT: u32 = 1 << SIZE_BITS;

/// Largest size a header can record.
pub const MAX_SIZE_WORDS: u32 = SIZE_MASK;

/// One-word descriptor in front of every block.
///
/// Layout, least significant bit first:
///
/// ```text
/// bits 0..=29  size in words, header included
/// bit  30      allocated
/// bit  31      reserved, written as 0
/// ```
///
/// A size of 0 marks the virgin tail of the arena. Never read the raw word
/// directly, use the accessors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct BlockHeader(u32);

impl BlockHeader {
    pub const VIRGIN: BlockHeader = BlockHeader(0);

    /// Fails with [`AllocError::OutOfMemory`] if `size_words` does not fit the
    /// size field.
    pub fn new(size_words: u32, allocated: bool) -> Result<Self, AllocError> {
        if size_words > SIZE_MASK {
            return Err(AllocError::OutOfMemory {
                requested_words: size_words,
                available_words: SIZE_MASK,
            });
        }
        let flag = if allocated { ALLOCATED_BIT } else { 0 };
        Ok(BlockHeader(size_words | flag))
    }

    pub fn size_words(&self) -> u32 {
        self.0 & SIZE_MASK
    }

    pub fn allocated(&self) -> bool {
        self.0 & ALLOCATED_BIT != 0
    }

    pub fn is_virgin(&self) -> bool {
        self.size_words() == 0
    }

    pub fn is_free(&self) -> bool {
        !self.allocated()
    }

    /// An allocated block can never legitimately be empty.
    pub fn is_corrupt(&self) -> bool {
        self.allocated() && self.size_words() == 0
    }

    pub fn to_bits(self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Self {
        BlockHeader(bits)
    }
}

/// Pointer to a header living inside an arena.
///
/// Only the arena hands these out, always word aligned and in bounds.
pub(crate) struct HeaderPtr(*mut BlockHeader);

impl HeaderPtr {
    /// # Safety
    /// `ptr` must be non-null, word aligned and valid for reads and writes of
    /// one word for as long as the `HeaderPtr` is used.
    pub(crate) unsafe fn new(ptr: *mut BlockHeader) -> Self {
        debug_assert!(!ptr.is_null());
        debug_assert!(ptr.is_aligned());
        HeaderPtr(ptr)
    }

    pub(crate) fn read(&self) -> BlockHeader {
        unsafe { self.0.read() }
    }

    pub(crate) fn write(&self, header: BlockHeader) {
        unsafe { self.0.write(header) }
    }

    /// First byte after the header.
    pub(crate) fn data(&self) -> *mut u8 {
        unsafe { self.0.add(1).cast::<u8>() }
    }
}

impl Deref for HeaderPtr {
    type Target = *mut BlockHeader;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
