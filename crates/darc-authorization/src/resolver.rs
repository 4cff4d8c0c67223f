//! Recursive owner/user resolution
//!
//! A raw key entry matches by equality. A reference entry names another
//! lineage; its latest record is fetched and its *users* are searched,
//! whatever role the outer check is for. An admin lineage can therefore
//! delegate signing rights to per-user lineages without handing those
//! users proposal rights on the admin lineage.
//!
//! Following references is bounded by `max_depth`. Cycles, including a
//! record that references its own rule, simply run out of depth and
//! resolve to "not authorized".

use crate::store::RecordStore;
use darc_core::{Darc, Entry, PublicKey, Role, Rule};
use std::collections::HashMap;
use tracing::debug;

/// Decides whether a key is an owner or user of a record.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationResolver<'a> {
    store: &'a RecordStore,
    max_depth: usize,
}

impl<'a> AuthorizationResolver<'a> {
    /// Resolver over `store`, following at most `max_depth` references
    pub fn new(store: &'a RecordStore, max_depth: usize) -> Self {
        Self { store, max_depth }
    }

    /// Configured recursion bound
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Whether `key` holds `role` on `record`, directly or through references.
    pub fn is_authorized(&self, record: &Darc, role: Role, key: &PublicKey) -> bool {
        // Shallowest depth at which each referenced lineage was searched.
        let mut explored: HashMap<Rule, usize> = HashMap::new();
        self.search(record, role, key, 0, &mut explored)
    }

    fn search(
        &self,
        record: &Darc,
        role: Role,
        key: &PublicKey,
        depth: usize,
        explored: &mut HashMap<Rule, usize>,
    ) -> bool {
        for entry in record.entries(role) {
            match entry {
                Entry::Key(candidate) => {
                    if candidate == key {
                        return true;
                    }
                }
                Entry::Darc(rule) => {
                    let next = depth + 1;
                    if next > self.max_depth {
                        debug!(rule = %rule, depth = next, "Reference depth exceeded");
                        continue;
                    }
                    // A search from a shallower depth already covered this one.
                    if explored.get(rule).is_some_and(|seen| *seen <= next) {
                        continue;
                    }
                    explored.insert(rule.clone(), next);
                    let Some(referenced) = self.store.lookup(rule) else {
                        debug!(rule = %rule, "Dangling policy reference");
                        continue;
                    };
                    if self.search(&referenced, Role::User, key, next, explored) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use darc_core::{Ed25519Scheme, KeyPair, SecretKey, Signature};
    use std::sync::Arc;

    fn keys(seed: u8) -> KeyPair {
        KeyPair::from_secret(&Ed25519Scheme, SecretKey::from_bytes([seed; 32]))
    }

    fn signed(darc: &Darc, by: &KeyPair) -> Vec<Signature> {
        vec![by.sign(&Ed25519Scheme, darc.id().as_bytes())]
    }

    fn rule(s: &str) -> Rule {
        Rule::parse(s).unwrap()
    }

    #[test]
    fn test_direct_key_match() {
        let root = keys(1);
        let store = RecordStore::bootstrap(Arc::new(Ed25519Scheme), root.public(), 10);
        let head = store.root().unwrap();
        let resolver = store.resolver();
        assert!(resolver.is_authorized(&head, Role::Owner, &root.public()));
        assert!(resolver.is_authorized(&head, Role::User, &root.public()));
        assert!(!resolver.is_authorized(&head, Role::User, &keys(2).public()));
    }

    #[test]
    fn test_reference_grants_through_users_only() {
        let root = keys(1);
        let alice = keys(2);
        let bob = keys(3);
        let store = RecordStore::bootstrap(Arc::new(Ed25519Scheme), root.public(), 10);

        // Alice owns her lineage, Bob only uses it.
        let alice_darc = Darc::new(
            rule("Alice"),
            vec![Entry::Key(alice.public())],
            vec![Entry::Key(bob.public())],
        );
        store.propose(alice_darc.clone(), &signed(&alice_darc, &root)).unwrap();

        let admin = Darc::new(
            rule("Admin"),
            vec![Entry::Darc(rule("Alice"))],
            vec![Entry::Darc(rule("Alice"))],
        );
        store.propose(admin.clone(), &signed(&admin, &root)).unwrap();

        let resolver = store.resolver();
        assert!(resolver.is_authorized(&admin, Role::Owner, &bob.public()));
        assert!(resolver.is_authorized(&admin, Role::User, &bob.public()));
        // Ownership of the referenced lineage is not consulted.
        assert!(!resolver.is_authorized(&admin, Role::Owner, &alice.public()));
    }

    #[test]
    fn test_self_reference_terminates() {
        let root = keys(1);
        let store = RecordStore::bootstrap(Arc::new(Ed25519Scheme), root.public(), 10);
        let looping = Darc::new(rule("Loop"), vec![], vec![Entry::Darc(rule("Loop"))]);
        store.propose(looping.clone(), &signed(&looping, &root)).unwrap();

        assert!(!store
            .resolver()
            .is_authorized(&looping, Role::User, &keys(9).public()));
    }

    #[test]
    fn test_depth_bound() {
        let root = keys(1);
        let target = keys(4);
        let depth = 3;
        let store = RecordStore::bootstrap(Arc::new(Ed25519Scheme), root.public(), depth);

        // L0 -> L1 -> L2 -> L3 where only L3 lists the target key.
        let last = Darc::new(rule("L3"), vec![], vec![Entry::Key(target.public())]);
        store.propose(last.clone(), &signed(&last, &root)).unwrap();
        for i in (0..3).rev() {
            let darc = Darc::new(
                rule(&format!("L{}", i)),
                vec![],
                vec![Entry::Darc(rule(&format!("L{}", i + 1)))],
            );
            store.propose(darc.clone(), &signed(&darc, &root)).unwrap();
        }

        let top = store.get(&rule("L0")).unwrap();
        assert!(store
            .resolver()
            .is_authorized(&top, Role::User, &target.public()));
        assert!(!AuthorizationResolver::new(&store, depth - 1).is_authorized(
            &top,
            Role::User,
            &target.public()
        ));
    }
}
