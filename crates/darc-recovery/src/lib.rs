//! Darc Recovery
//!
//! The one path for changing policy without holding a private key. An
//! operator who can read the server log asks for a PIN, reads it from the
//! log, and submits a version-0 record together with the PIN. The server
//! then signs the record with its own key and installs it, replacing the
//! lineage's history.
//!
//! Sessions live in memory only. A restart forgets every issued PIN and
//! recovery starts over.

#![forbid(unsafe_code)]

pub mod pin;
pub mod sink;

pub use pin::{PinCommit, PinRecoveryController, PinSession, PinState, PIN_DIGITS};
pub use sink::TracingPinSink;
