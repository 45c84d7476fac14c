//! Arena sizing.

use crate::{WORD_SIZE, error::AllocError};

/// Largest arena: one GiB less one word.
pub const MAX_CAPACITY_WORDS: u32 = (1024 * 1024 * 1024 / WORD_SIZE as u32) - 1;

/// Smallest arena that can hold a block. The scanner keeps the last two words
/// out of reach.
pub const MIN_CAPACITY_WORDS: u32 = 3;

/// Configuration for an [`Arena`](crate::Arena).
///
/// The capacity is fixed once the arena is reserved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Arena size in words, headers included.
    pub capacity_words: u32,
}

impl ArenaConfig {
    /// Full-size arena.
    pub const fn new() -> Self {
        Self::with_capacity_words(MAX_CAPACITY_WORDS)
    }

    /// Arena of `capacity_words` words. Checked by [`validate`](Self::validate)
    /// when the arena is reserved.
    pub const fn with_capacity_words(capacity_words: u32) -> Self {
        Self { capacity_words }
    }

    /// Fails with [`AllocError::InvalidCapacity`] unless the capacity lies in
    /// `MIN_CAPACITY_WORDS..=MAX_CAPACITY_WORDS`.
    pub fn validate(&self) -> Result<(), AllocError> {
        if !(MIN_CAPACITY_WORDS..=MAX_CAPACITY_WORDS).contains(&self.capacity_words) {
            return Err(AllocError::InvalidCapacity {
                capacity_words: self.capacity_words,
            });
        }
        Ok(())
    }

    /// Arena size in bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.capacity_words as usize * WORD_SIZE
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_is_one_gib_less_a_word() {
        let config = ArenaConfig::default();
        assert_eq!(config.capacity_words, 268_435_455);
        assert_eq!(config.capacity_bytes(), 1024 * 1024 * 1024 - 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn capacity_bounds() {
        assert!(ArenaConfig::with_capacity_words(MIN_CAPACITY_WORDS)
            .validate()
            .is_ok());
        assert_eq!(
            ArenaConfig::with_capacity_words(2).validate(),
            Err(AllocError::InvalidCapacity { capacity_words: 2 })
        );
        assert_eq!(
            ArenaConfig::with_capacity_words(MAX_CAPACITY_WORDS + 1).validate(),
            Err(AllocError::InvalidCapacity {
                capacity_words: MAX_CAPACITY_WORDS + 1
            })
        );
    }
}
