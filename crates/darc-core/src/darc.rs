//! Policy records
//!
//! A `Darc` binds a rule to an owner set and a user set. Owners may
//! propose the next version of the record; users may sign the actions the
//! record governs. Either set may reference another lineage by rule, in
//! which case that lineage's users are consulted.
//!
//! Records are immutable: an update is a new record whose `previous`
//! points at the record it replaces.

use crate::crypto::{hex_bytes, PublicKey};
use crate::hash::hasher;
use crate::rule::Rule;
use crate::{DarcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content-derived identifier of one exact record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DarcId(#[serde(with = "hex_bytes")] pub [u8; 32]);

impl DarcId {
    /// Raw identifier bytes, the payload signed by proposers
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for DarcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for DarcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DarcId({})", &hex::encode(self.0)[..16])
    }
}

/// One member of an owner or user set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entry {
    /// A raw public key
    Key(PublicKey),
    /// The lineage governed by this rule; its users are consulted
    Darc(Rule),
}

impl From<PublicKey> for Entry {
    fn from(key: PublicKey) -> Self {
        Entry::Key(key)
    }
}

impl From<Rule> for Entry {
    fn from(rule: Rule) -> Self {
        Entry::Darc(rule)
    }
}

/// Which entry set of a record is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// May propose new versions
    Owner,
    /// May sign governed actions
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::User => write!(f, "user"),
        }
    }
}

/// An immutable, versioned policy record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Darc {
    id: DarcId,
    version: u64,
    rule: Rule,
    owners: Vec<Entry>,
    users: Vec<Entry>,
    previous: Option<DarcId>,
}

fn dedup(entries: Vec<Entry>) -> Vec<Entry> {
    let mut out: Vec<Entry> = Vec::with_capacity(entries.len());
    for entry in entries {
        if !out.contains(&entry) {
            out.push(entry);
        }
    }
    out
}

fn hash_entries(h: &mut dyn crate::hash::Hasher, entries: &[Entry]) {
    h.update(&(entries.len() as u64).to_le_bytes());
    for entry in entries {
        match entry {
            Entry::Key(key) => {
                h.update(&[0]);
                h.update(key.as_bytes());
            }
            Entry::Darc(rule) => {
                h.update(&[1]);
                h.update_framed(rule.as_str().as_bytes());
            }
        }
    }
}

fn compute_id(
    rule: &Rule,
    version: u64,
    previous: Option<&DarcId>,
    owners: &[Entry],
    users: &[Entry],
) -> DarcId {
    let mut h = hasher();
    h.update_framed(b"darc/record/v1");
    h.update_framed(rule.as_str().as_bytes());
    h.update(&version.to_le_bytes());
    match previous {
        Some(prev) => {
            h.update(&[1]);
            h.update(prev.as_bytes());
        }
        None => h.update(&[0]),
    }
    hash_entries(h.as_mut(), owners);
    hash_entries(h.as_mut(), users);
    DarcId(h.finalize())
}

impl Darc {
    /// Create version 0 of a new lineage
    pub fn new(rule: Rule, owners: Vec<Entry>, users: Vec<Entry>) -> Self {
        Self::from_parts(rule, 0, None, owners, users)
    }

    /// Assemble a record from explicit parts. The identifier is always
    /// derived from the content.
    pub fn from_parts(
        rule: Rule,
        version: u64,
        previous: Option<DarcId>,
        owners: Vec<Entry>,
        users: Vec<Entry>,
    ) -> Self {
        let owners = dedup(owners);
        let users = dedup(users);
        let id = compute_id(&rule, version, previous.as_ref(), &owners, &users);
        Self {
            id,
            version,
            rule,
            owners,
            users,
            previous,
        }
    }

    /// Build the next version of this record with new entry sets
    pub fn evolve(&self, owners: Vec<Entry>, users: Vec<Entry>) -> Self {
        Self::from_parts(
            self.rule.clone(),
            self.version + 1,
            Some(self.id),
            owners,
            users,
        )
    }

    /// Recompute the identifier and compare it with the stored one.
    /// Fails for records deserialized with a tampered body.
    pub fn verify_id(&self) -> Result<()> {
        let expected = compute_id(
            &self.rule,
            self.version,
            self.previous.as_ref(),
            &self.owners,
            &self.users,
        );
        if expected != self.id {
            return Err(DarcError::invalid(format!(
                "record id {} does not match its content",
                self.id
            )));
        }
        if (self.version == 0) != self.previous.is_none() {
            return Err(DarcError::invalid(format!(
                "version {} record has inconsistent previous link",
                self.version
            )));
        }
        Ok(())
    }

    /// Identifier
    pub fn id(&self) -> DarcId {
        self.id
    }

    /// Version within the lineage
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Governed rule
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Owner entries
    pub fn owners(&self) -> &[Entry] {
        &self.owners
    }

    /// User entries
    pub fn users(&self) -> &[Entry] {
        &self.users
    }

    /// Entries for a role
    pub fn entries(&self, role: Role) -> &[Entry] {
        match role {
            Role::Owner => &self.owners,
            Role::User => &self.users,
        }
    }

    /// Identifier of the version this one replaces
    pub fn previous(&self) -> Option<DarcId> {
        self.previous
    }

    /// Lineages referenced from either entry set
    pub fn references(&self) -> impl Iterator<Item = &Rule> {
        self.owners
            .iter()
            .chain(self.users.iter())
            .filter_map(|entry| match entry {
                Entry::Darc(rule) => Some(rule),
                Entry::Key(_) => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> PublicKey {
        PublicKey([byte; 32])
    }

    #[test]
    fn test_id_is_content_derived() {
        let a = Darc::new(Rule::root(), vec![key(1).into()], vec![key(1).into()]);
        let b = Darc::new(Rule::root(), vec![key(1).into()], vec![key(1).into()]);
        let c = Darc::new(Rule::root(), vec![key(1).into()], vec![key(2).into()]);
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert!(a.verify_id().is_ok());
    }

    #[test]
    fn test_owner_and_user_sets_are_distinguished() {
        let a = Darc::new(Rule::root(), vec![key(1).into()], vec![]);
        let b = Darc::new(Rule::root(), vec![], vec![key(1).into()]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_evolve_links_previous() {
        let v0 = Darc::new(Rule::root(), vec![key(1).into()], vec![key(1).into()]);
        let v1 = v0.evolve(vec![key(2).into()], vec![key(2).into()]);
        assert_eq!(v1.version(), 1);
        assert_eq!(v1.previous(), Some(v0.id()));
        assert_eq!(v1.rule(), v0.rule());
        assert!(v1.verify_id().is_ok());
    }

    #[test]
    fn test_entries_are_deduplicated() {
        let darc = Darc::new(
            Rule::root(),
            vec![key(1).into(), key(1).into(), key(2).into()],
            vec![],
        );
        assert_eq!(darc.owners(), &[Entry::Key(key(1)), Entry::Key(key(2))]);
    }

    #[test]
    fn test_tampered_record_fails_id_check() {
        let darc = Darc::new(Rule::root(), vec![key(1).into()], vec![key(1).into()]);
        let mut json: serde_json::Value = serde_json::to_value(&darc).unwrap();
        json["users"] = serde_json::json!([{ "key": key(9) }]);
        let tampered: Darc = serde_json::from_value(json).unwrap();
        assert!(tampered.verify_id().is_err());
    }

    #[test]
    fn test_inconsistent_previous_link_rejected() {
        let orphan = Darc::from_parts(Rule::root(), 3, None, vec![], vec![]);
        assert!(orphan.verify_id().is_err());
    }

    #[test]
    fn test_references() {
        let admin = Rule::parse("Admin").unwrap();
        let darc = Darc::new(
            Rule::root(),
            vec![Entry::Darc(admin.clone())],
            vec![key(1).into()],
        );
        assert_eq!(darc.references().collect::<Vec<_>>(), vec![&admin]);
    }
}
