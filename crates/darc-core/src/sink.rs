//! Out-of-band PIN delivery
//!
//! PIN recovery is only as safe as the channel the PIN travels on: it must
//! be readable by an operator at the console and not by remote callers.
//! The server log is the usual choice.

use crate::rule::Rule;
use std::fmt;

/// Operator-visible channel receiving freshly issued PINs.
pub trait PinSink: Send + Sync + fmt::Debug {
    /// Emit `pin` (six decimal digits) for `rule`
    fn emit(&self, rule: &Rule, pin: &str);
}
