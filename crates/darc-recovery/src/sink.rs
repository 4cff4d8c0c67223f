//! Log-backed PIN delivery

use darc_core::{PinSink, Rule};

/// Writes issued PINs to the server log under the `darc::pin` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPinSink;

impl PinSink for TracingPinSink {
    fn emit(&self, rule: &Rule, pin: &str) {
        tracing::warn!(
            target: "darc::pin",
            rule = %rule,
            pin,
            "Policy recovery PIN issued; submit it with the replacement record"
        );
    }
}
