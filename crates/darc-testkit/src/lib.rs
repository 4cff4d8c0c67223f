//! Test utilities shared across the darc crates
//!
//! Deterministic keys, a seeded random source, a PIN sink that captures
//! instead of logging, and tracing setup for tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

pub mod keys;
pub mod random;
pub mod sink;

pub use keys::{signed_by, KeyFixture};
pub use random::SeededRandom;
pub use sink::CapturingPinSink;

/// Install a fmt subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
