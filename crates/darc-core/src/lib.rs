//! Darc Core - policy record foundation
//!
//! Distributed Access Rights Control records ("darcs") bind a rule
//! (`*`, `Service` or `Service.Method`) to a set of owners, who may propose
//! new versions, and a set of users, who may sign the actions the rule
//! governs. This crate holds the pure data model and the capabilities the
//! rest of the workspace is built on:
//!
//! - `Darc`, `Entry`, `Role`, `DarcId`: the record model
//! - `Rule`: validated selectors and their specificity order
//! - `SignatureScheme`, `Ed25519Scheme`, key types
//! - `RandomSource`, `OsRandom`, `PinSink`
//! - `DarcError`: the unified error taxonomy

#![forbid(unsafe_code)]

/// Signing capability and key material
pub mod crypto;

/// Policy records
pub mod darc;

/// Unified error handling
pub mod errors;

/// Content hashing for record identifiers
pub mod hash;

/// Random number source
pub mod random;

/// Rule selectors
pub mod rule;

/// Out-of-band PIN delivery
pub mod sink;

pub use crypto::{Ed25519Scheme, KeyPair, PublicKey, SecretKey, Signature, SignatureScheme};
pub use darc::{Darc, DarcId, Entry, Role};
pub use errors::{DarcError, Result};
pub use random::{OsRandom, RandomSource};
pub use rule::{Rule, RuleKind, ROOT_RULE};
pub use sink::PinSink;

/// Recursion bound for cross-record references when none is configured.
pub const DEFAULT_MAX_REFERENCE_DEPTH: usize = 10;
