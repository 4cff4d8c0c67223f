//! Darc Authorization
//!
//! Versioned policy storage and the decisions made against it:
//!
//! - `RecordStore`: lineages keyed by rule, update-chain invariants,
//!   atomic per-rule commits
//! - `RuleMatcher`: `Service.Method` → `Service` → `*` resolution
//! - `AuthorizationResolver`: depth-bounded owner/user checks across
//!   referenced records
//! - `Verifier`: signature check plus user check for a signed action
//!
//! All of these borrow an explicitly constructed `RecordStore`; there is no
//! process-wide store.

#![forbid(unsafe_code)]

pub mod matcher;
pub mod resolver;
pub mod store;
pub mod verifier;

pub use matcher::RuleMatcher;
pub use resolver::AuthorizationResolver;
pub use store::RecordStore;
pub use verifier::Verifier;
