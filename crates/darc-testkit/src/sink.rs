//! PIN sink that records emissions for assertions

use darc_core::{PinSink, Rule};
use parking_lot::Mutex;

/// Captures every emitted PIN in order.
#[derive(Debug, Default)]
pub struct CapturingPinSink {
    emitted: Mutex<Vec<(Rule, String)>>,
}

impl CapturingPinSink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All emissions so far
    pub fn emitted(&self) -> Vec<(Rule, String)> {
        self.emitted.lock().clone()
    }

    /// Most recent PIN emitted for `rule`
    pub fn last_pin(&self, rule: &Rule) -> Option<String> {
        self.emitted
            .lock()
            .iter()
            .rev()
            .find(|(emitted_rule, _)| emitted_rule == rule)
            .map(|(_, pin)| pin.clone())
    }
}

impl PinSink for CapturingPinSink {
    fn emit(&self, rule: &Rule, pin: &str) {
        self.emitted.lock().push((rule.clone(), pin.to_string()));
    }
}
