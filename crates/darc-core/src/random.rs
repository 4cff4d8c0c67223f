//! Random number source
//!
//! PIN generation and key generation draw from a `RandomSource` so tests
//! can swap in a seeded generator.

use rand::rngs::OsRng;
use rand_core::RngCore;
use std::fmt;

/// Source of randomness consumed by key and PIN generation.
pub trait RandomSource: Send + Sync + fmt::Debug {
    /// Fill `dest` with random bytes
    fn fill_bytes(&self, dest: &mut [u8]);

    /// Next random u32
    fn next_u32(&self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    /// Uniform value in `0..bound`. Returns 0 when `bound` is 0.
    fn random_below(&self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        // Reject the tail that would bias the modulo.
        let zone = u32::MAX - (u32::MAX % bound);
        loop {
            let value = self.next_u32();
            if value < zone {
                return value % bound;
            }
        }
    }
}

/// Operating system randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}
