//! Unified error system for policy operations
//!
//! Every rejection produced by the store, the verifier or the PIN recovery
//! flow is one of these variants. Callers inspect the variant to decide
//! whether to re-read state, retry with a corrected PIN, or give up.

use serde::{Deserialize, Serialize};

/// Unified error type for all policy operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum DarcError {
    /// No record exists for an exact rule
    #[error("Not found: {message}")]
    NotFound {
        /// What was looked up
        message: String,
    },

    /// Not even the root record governs the request
    #[error("No governing policy for {service}.{method}")]
    NoGoverningPolicy {
        /// Requested service
        service: String,
        /// Requested method
        method: String,
    },

    /// Signature does not verify under the key it claims
    #[error("Bad signature: {message}")]
    BadSignature {
        /// Error message describing the failed check
        message: String,
    },

    /// Valid signature, insufficient rights
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Error message describing the missing right
        message: String,
    },

    /// Proposed version does not extend the current head
    #[error("Stale version: expected {expected}, got {actual}")]
    StaleVersion {
        /// Version the store would accept next
        expected: u64,
        /// Version carried by the proposal
        actual: u64,
    },

    /// Proposal changes the rule of its lineage
    #[error("Rule mismatch: expected {expected}, got {actual}")]
    RuleMismatch {
        /// Rule of the lineage
        expected: String,
        /// Rule carried by the proposal
        actual: String,
    },

    /// Proposal or reference names a lineage that does not exist
    #[error("Unknown lineage: {rule}")]
    UnknownLineage {
        /// Rule of the missing lineage
        rule: String,
    },

    /// Submitted PIN differs from the issued one
    #[error("PIN mismatch for {rule}")]
    PinMismatch {
        /// Rule the PIN session belongs to
        rule: String,
    },

    /// PIN operation attempted in the wrong session state
    #[error("Wrong state: {message}")]
    WrongState {
        /// Error message describing the state conflict
        message: String,
    },

    /// Malformed input (rule syntax, record structure)
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Key material could not be decoded
    #[error("Crypto error: {message}")]
    Crypto {
        /// Error message describing the cryptographic failure
        message: String,
    },

    /// Configuration could not be loaded or is out of range
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },
}

impl DarcError {
    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a no-governing-policy error
    pub fn no_governing_policy(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self::NoGoverningPolicy {
            service: service.into(),
            method: method.into(),
        }
    }

    /// Create a bad signature error
    pub fn bad_signature(message: impl Into<String>) -> Self {
        Self::BadSignature {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a stale version error
    pub fn stale_version(expected: u64, actual: u64) -> Self {
        Self::StaleVersion { expected, actual }
    }

    /// Create a rule mismatch error
    pub fn rule_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::RuleMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an unknown lineage error
    pub fn unknown_lineage(rule: impl Into<String>) -> Self {
        Self::UnknownLineage { rule: rule.into() }
    }

    /// Create a PIN mismatch error
    pub fn pin_mismatch(rule: impl Into<String>) -> Self {
        Self::PinMismatch { rule: rule.into() }
    }

    /// Create a wrong state error
    pub fn wrong_state(message: impl Into<String>) -> Self {
        Self::WrongState {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a crypto error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// The request was denied: forged signature or missing rights.
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::BadSignature { .. } | Self::Unauthorized { .. })
    }

    /// The caller proposed against outdated state and should re-fetch.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            Self::StaleVersion { .. } | Self::RuleMismatch { .. } | Self::UnknownLineage { .. }
        )
    }

    /// The operator may retry while the PIN session stays open.
    pub fn is_retryable_by_operator(&self) -> bool {
        matches!(self, Self::PinMismatch { .. } | Self::WrongState { .. })
    }
}

/// Standard Result type for policy operations
pub type Result<T> = std::result::Result<T, DarcError>;
