use core::{fmt, ptr::NonNull};

use lazy_static::lazy_static;
use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_NORESERVE, MAP_PRIVATE, PROT_READ, PROT_WRITE};

use crate::{
    WORD_SIZE,
    config::ArenaConfig,
    error::AllocError,
    header::{BlockHeader, HeaderPtr},
};

lazy_static! {
    pub static ref PAGE_SIZE: usize = page_size();
}

fn page_size() -> usize {
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

/// Word offset of a block header inside an arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeaderLocation(u32);

impl HeaderLocation {
    /// The header at the very beginning of the arena.
    pub const START: HeaderLocation = HeaderLocation(0);

    pub const fn new(offset_words: u32) -> Self {
        HeaderLocation(offset_words)
    }

    pub const fn offset_words(&self) -> u32 {
        self.0
    }

    /// Location `words` further along, `None` on overflow.
    pub fn advance(&self, words: u32) -> Option<HeaderLocation> {
        self.0.checked_add(words).map(HeaderLocation)
    }
}

impl fmt::Display for HeaderLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "word {}", self.0)
    }
}

/// Fixed-capacity, zero-initialised storage that every block lives in.
///
/// Backed by a private anonymous mapping, so a fresh arena reads as all
/// zeroes and its first header is virgin. The mapping is released on drop.
pub struct Arena {
    base: NonNull<u32>,
    capacity_words: u32,
    mapped_bytes: usize,
}

// The arena exclusively owns its mapping.
unsafe impl Send for Arena {}

impl Arena {
    pub fn reserve(config: ArenaConfig) -> Result<Arena, AllocError> {
        config.validate()?;
        let mapped_bytes = config.capacity_bytes().next_multiple_of(*PAGE_SIZE);

        let mem_ptr = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                mapped_bytes,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANONYMOUS | MAP_NORESERVE,
                -1,
                0,
            )
        };
        if mem_ptr == MAP_FAILED {
            return Err(AllocError::ReserveFailed { errno: errno() });
        }
        let base = NonNull::new(mem_ptr.cast::<u32>())
            .ok_or(AllocError::ReserveFailed { errno: 0 })?;

        Ok(Arena {
            base,
            capacity_words: config.capacity_words,
            mapped_bytes,
        })
    }

    pub fn capacity_words(&self) -> u32 {
        self.capacity_words
    }

    pub fn base(&self) -> *mut u8 {
        self.base.as_ptr().cast()
    }

    pub fn contains(&self, location: HeaderLocation) -> bool {
        location.offset_words() < self.capacity_words
    }

    /// Byte address of the header at `location`.
    pub fn address_of(&self, location: HeaderLocation) -> Option<*mut u8> {
        self.header_ptr(location).map(|header| header.cast::<u8>())
    }

    /// Location of the header a byte address falls in, if it lies inside the arena.
    pub fn location_of(&self, addr: *const u8) -> Option<HeaderLocation> {
        let offset = addr.addr().checked_sub(self.base.addr().get())?;
        let location = HeaderLocation::new(u32::try_from(offset / WORD_SIZE).ok()?);
        self.contains(location).then_some(location)
    }

    pub fn read_header(&self, location: HeaderLocation) -> Option<BlockHeader> {
        self.header_ptr(location).map(|header| header.read())
    }

    pub(crate) fn header_ptr(&self, location: HeaderLocation) -> Option<HeaderPtr> {
        if !self.contains(location) {
            return None;
        }
        unsafe {
            let ptr = self
                .base
                .as_ptr()
                .add(location.offset_words() as usize)
                .cast::<BlockHeader>();
            Some(HeaderPtr::new(ptr))
        }
    }

    #[cfg(test)]
    pub(crate) fn write_header(&mut self, location: HeaderLocation, header: BlockHeader) {
        self.header_ptr(location)
            .expect("header outside arena")
            .write(header);
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("base", &self.base)
            .field("capacity_words", &self.capacity_words)
            .finish()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base.as_ptr().cast(), self.mapped_bytes);
        }
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn errno() -> i32 {
    unsafe { *libc::__error() }
}

#[cfg(test)]
mod test {
    use super::*;

    fn arena(capacity_words: u32) -> Arena {
        Arena::reserve(ArenaConfig::with_capacity_words(capacity_words)).unwrap()
    }

    #[test]
    fn fresh_arena_is_zeroed() {
        let arena = arena(1024);
        assert_eq!(arena.capacity_words(), 1024);
        for offset in 0..1024 {
            let header = arena.read_header(HeaderLocation::new(offset)).unwrap();
            assert!(header.is_virgin());
        }
    }

    #[test]
    fn base_is_page_aligned() {
        let arena = arena(16);
        assert_eq!(arena.base().addr() % *PAGE_SIZE, 0);
    }

    #[test]
    fn headers_outside_capacity_are_unreachable() {
        let arena = arena(16);
        assert!(arena.read_header(HeaderLocation::new(15)).is_some());
        assert!(arena.read_header(HeaderLocation::new(16)).is_none());
        assert!(arena.address_of(HeaderLocation::new(u32::MAX)).is_none());
    }

    #[test]
    fn address_and_location_agree() {
        let arena = arena(64);
        let location = HeaderLocation::new(9);
        let addr = arena.address_of(location).unwrap();
        assert_eq!(addr.addr(), arena.base().addr() + 36);
        assert_eq!(arena.location_of(addr), Some(location));
        assert_eq!(arena.location_of(addr.wrapping_add(3)), Some(location));
        assert_eq!(arena.location_of(arena.base().wrapping_add(64 * 4)), None);
        assert_eq!(arena.location_of(arena.base().wrapping_sub(1)), None);
    }

    #[test]
    fn header_writes_land_in_the_arena() {
        let mut arena = arena(16);
        let location = HeaderLocation::new(3);
        arena.write_header(location, BlockHeader::new(2, true).unwrap());
        let header = arena.read_header(location).unwrap();
        assert_eq!(header.size_words(), 2);
        assert!(header.allocated());
    }

    #[test]
    fn invalid_capacity_is_not_reserved() {
        let err = Arena::reserve(ArenaConfig::with_capacity_words(1)).unwrap_err();
        assert_eq!(err, AllocError::InvalidCapacity { capacity_words: 1 });
    }
}
