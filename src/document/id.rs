//! Document identifier generation
//!
//! Identifiers are `hex(unix seconds)` followed by 16 random lowercase hex
//! digits. The prefix orders ids by creation second. Two ids drawn in the
//! same second collide only if the suffixes do, which is unlikely but
//! possible: callers that need uniqueness must check against existing ids.

use chrono::Utc;
use rand::Rng;

const HEX_DIGITS: &[u8] = b"0123456789abcdef";

/// Length of the random suffix
pub const RANDOM_SUFFIX_LEN: usize = 16;

/// Source of fresh document identifiers
pub trait IdGenerator: Send + Sync {
    /// Returns a new identifier
    fn next_id(&self) -> String;
}

/// Default generator: timestamp prefix plus random suffix
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampIdGenerator;

impl TimestampIdGenerator {
    /// Create a new generator
    pub fn new() -> Self {
        Self
    }

    fn random_suffix() -> String {
        let mut rng = rand::thread_rng();
        (0..RANDOM_SUFFIX_LEN)
            .map(|_| HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())] as char)
            .collect()
    }
}

impl IdGenerator for TimestampIdGenerator {
    fn next_id(&self) -> String {
        format!("{:x}{}", Utc::now().timestamp(), Self::random_suffix())
    }
}
