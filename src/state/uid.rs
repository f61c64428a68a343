//! Connection id generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a live connection.
pub type ConnId = String;

/// Base36 digits needed for any `u64` (36^13 > 2^64).
const ID_WIDTH: usize = 13;

/// Generates unique connection ids.
///
/// Format: one-letter prefix + 13 chars base36. Example: "CAAAAAAAAAAAB".
/// Every counter value has its own encoding, so ids never repeat.
pub struct ConnIdGenerator {
    prefix: char,
    counter: AtomicU64,
}

impl ConnIdGenerator {
    pub fn new(prefix: char) -> Self {
        Self::starting_at(prefix, 1)
    }

    fn starting_at(prefix: char, first: u64) -> Self {
        Self {
            prefix,
            counter: AtomicU64::new(first),
        }
    }

    /// Generate the next unique id.
    pub fn next(&self) -> ConnId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, base36_encode(n))
    }
}

impl Default for ConnIdGenerator {
    fn default() -> Self {
        Self::new('C')
    }
}

/// Encode a number as a fixed-width base36 string.
fn base36_encode(mut n: u64) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut result = [b'A'; ID_WIDTH];

    for slot in result.iter_mut().rev() {
        *slot = CHARS[(n % 36) as usize];
        n /= 36;
    }

    String::from_utf8_lossy(&result).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conn_id_generation() {
        let generator = ConnIdGenerator::default();
        assert_eq!(generator.next(), "CAAAAAAAAAAAB");
        assert_eq!(generator.next(), "CAAAAAAAAAAAC");
    }

    #[test]
    fn test_base36_encode() {
        assert_eq!(base36_encode(0), "AAAAAAAAAAAAA");
        assert_eq!(base36_encode(35), "AAAAAAAAAAAA9");
        assert_eq!(base36_encode(36), "AAAAAAAAAAABA");
    }

    #[test]
    fn ids_stay_distinct_past_six_digits() {
        // 36^6 used to wrap back onto the first id.
        let wrap = 36u64.pow(6);
        assert_ne!(base36_encode(wrap), base36_encode(0));
        assert_ne!(base36_encode(wrap + 1), base36_encode(1));

        let generator = ConnIdGenerator::starting_at('C', wrap - 1);
        let before = generator.next();
        let after = generator.next();
        assert_ne!(before, after);
        assert_eq!(after, format!("C{}", base36_encode(wrap)));
    }

    #[test]
    fn full_u64_range_is_encodable() {
        let max = base36_encode(u64::MAX);
        let below = base36_encode(u64::MAX - 1);
        assert_eq!(max.len(), ID_WIDTH);
        assert_ne!(max, below);
        assert_ne!(max, base36_encode(0));
    }
}
