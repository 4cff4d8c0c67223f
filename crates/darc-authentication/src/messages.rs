//! Request and reply types of the policy service API
//!
//! Envelope encoding and transport belong to the embedding service; these
//! types only derive serde so any encoding can carry them.

use darc_core::{Darc, DarcId, Rule, Signature};
use serde::{Deserialize, Serialize};

/// Signature a client embeds in its own request messages to authenticate
/// a call to `service.method`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    /// Signature over the request payload
    pub signature: Signature,
}

/// Fetch the latest record for a rule, or the root record when no rule
/// is given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPolicy {
    /// Rule to look up; `None` means `*`
    #[serde(default)]
    pub rule: Option<Rule>,
}

/// Latest record for the requested rule, or the closest broader one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPolicyReply {
    /// The matched record
    pub latest: Darc,
    /// Whether `latest` governs exactly the requested rule
    pub exact: bool,
}

/// Propose a new record: version 0 for a new lineage (root owners sign),
/// or the next version of an existing one (its owners sign).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePolicy {
    /// Proposed record
    pub new_darc: Darc,
    /// Signatures over `new_darc.id()`
    pub signatures: Vec<Signature>,
}

/// Accepted proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePolicyReply {
    /// Identifier of the committed record
    pub id: DarcId,
    /// Its version
    pub version: u64,
}

/// Install a version-0 record using a PIN from the server log. An empty
/// `pin` asks the server to log a fresh PIN for `new_darc.rule()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePolicyPin {
    /// Record to install; may overwrite an existing lineage
    pub new_darc: Darc,
    /// PIN read from the server log, or empty to request one
    pub pin: String,
}

/// Outcome of an `UpdatePolicyPin` call. The PIN itself is never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicyPinReply {
    /// A PIN was written to the server log
    PinIssued {
        /// Rule the PIN unlocks
        rule: Rule,
    },
    /// The record was installed
    Committed {
        /// Identifier of the installed record
        id: DarcId,
        /// Server signature over `id`
        server_signature: Signature,
    },
}

/// Create a brand-new lineage. Always requires root-owner authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPolicy {
    /// Version-0 record for a rule without a lineage
    pub new_darc: Darc,
    /// Signatures over `new_darc.id()`
    pub signatures: Vec<Signature>,
}

/// Created lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPolicyReply {
    /// Identifier of the committed record
    pub id: DarcId,
}
