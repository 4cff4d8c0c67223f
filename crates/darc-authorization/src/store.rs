//! Versioned record storage
//!
//! Every record ever committed lives in an archive keyed by `DarcId`. Each
//! rule additionally owns a lineage: the ordered version chain whose last
//! element is the authoritative head. The lineage map is keyed by rule, so
//! there is at most one lineage per rule.
//!
//! Proposals are authorized against a snapshot of the head taken without
//! holding any lock, then committed with a compare-and-swap on the head id
//! under that lineage's write lock. Two proposals racing on the same head
//! cannot both win; proposals for different rules never contend.

use crate::resolver::AuthorizationResolver;
use darc_core::{
    Darc, DarcError, DarcId, Entry, PublicKey, Result, Role, Rule, Signature, SignatureScheme,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ordered version chain of one rule. Never empty.
#[derive(Debug)]
struct Lineage {
    history: Vec<Arc<Darc>>,
}

impl Lineage {
    fn new(head: Arc<Darc>) -> Self {
        Self {
            history: vec![head],
        }
    }

    fn head(&self) -> &Arc<Darc> {
        // A lineage is created with one record and only ever grows or is reset.
        &self.history[self.history.len() - 1]
    }
}

/// Keyed, versioned home of every policy lineage.
#[derive(Debug)]
pub struct RecordStore {
    scheme: Arc<dyn SignatureScheme>,
    max_depth: usize,
    lineages: RwLock<HashMap<Rule, Arc<RwLock<Lineage>>>>,
    archive: RwLock<HashMap<DarcId, Arc<Darc>>>,
}

impl RecordStore {
    /// Create a store seeded with the root record: rule `*`, owned and
    /// used by `root_key`.
    pub fn bootstrap(
        scheme: Arc<dyn SignatureScheme>,
        root_key: PublicKey,
        max_depth: usize,
    ) -> Self {
        let root = Darc::new(
            Rule::root(),
            vec![Entry::Key(root_key)],
            vec![Entry::Key(root_key)],
        );
        let store = Self {
            scheme,
            max_depth,
            lineages: RwLock::new(HashMap::new()),
            archive: RwLock::new(HashMap::new()),
        };
        store.install(Arc::new(root));
        info!(root_key = %root_key, "Seeded root policy");
        store
    }

    fn install(&self, record: Arc<Darc>) {
        self.archive.write().insert(record.id(), record.clone());
        self.lineages.write().insert(
            record.rule().clone(),
            Arc::new(RwLock::new(Lineage::new(record))),
        );
    }

    /// Signature capability used to check proposals
    pub fn scheme(&self) -> &dyn SignatureScheme {
        self.scheme.as_ref()
    }

    /// Recursion bound for cross-record references
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolver bound to this store
    pub fn resolver(&self) -> AuthorizationResolver<'_> {
        AuthorizationResolver::new(self, self.max_depth)
    }

    fn lineage(&self, rule: &Rule) -> Option<Arc<RwLock<Lineage>>> {
        self.lineages.read().get(rule).cloned()
    }

    /// Latest record for an exact rule, if any
    pub fn lookup(&self, rule: &Rule) -> Option<Arc<Darc>> {
        self.lineage(rule).map(|lineage| lineage.read().head().clone())
    }

    /// Latest record for an exact rule. No fallback to broader rules.
    pub fn get(&self, rule: &Rule) -> Result<Arc<Darc>> {
        self.lookup(rule)
            .ok_or_else(|| DarcError::not_found(format!("no policy for rule '{}'", rule)))
    }

    /// Any record ever committed, including superseded versions
    pub fn get_by_id(&self, id: &DarcId) -> Option<Arc<Darc>> {
        self.archive.read().get(id).cloned()
    }

    /// Version chain of a rule, oldest first
    pub fn history(&self, rule: &Rule) -> Result<Vec<Arc<Darc>>> {
        self.lineage(rule)
            .map(|lineage| lineage.read().history.clone())
            .ok_or_else(|| DarcError::not_found(format!("no policy for rule '{}'", rule)))
    }

    /// All rules with a lineage, sorted
    pub fn rules(&self) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self.lineages.read().keys().cloned().collect();
        rules.sort();
        rules
    }

    /// Latest root record.
    pub fn root(&self) -> Result<Arc<Darc>> {
        self.lookup(&Rule::root())
            .ok_or_else(|| DarcError::no_governing_policy("*", "*"))
    }

    /// Submit a new record.
    ///
    /// Version 0 creates a lineage and needs root-owner authority. Version
    /// `n + 1` extends the head at version `n` and needs owner authority on
    /// that head. Any valid signature from an authorized key suffices.
    pub fn propose(&self, proposal: Darc, signatures: &[Signature]) -> Result<Arc<Darc>> {
        let rule = proposal.rule().clone();
        let version = proposal.version();
        match self.try_propose(proposal, signatures) {
            Ok(committed) => {
                info!(rule = %rule, version, id = %committed.id(), "Committed policy");
                Ok(committed)
            }
            Err(err) => {
                warn!(rule = %rule, version, error = %err, "Rejected policy proposal");
                Err(err)
            }
        }
    }

    fn try_propose(&self, proposal: Darc, signatures: &[Signature]) -> Result<Arc<Darc>> {
        proposal.verify_id()?;
        self.check_references(&proposal)?;

        if proposal.version() == 0 {
            return self.create_lineage(proposal, signatures);
        }

        if let Some(previous) = proposal
            .previous()
            .and_then(|prev| self.get_by_id(&prev))
        {
            if previous.rule() != proposal.rule() {
                return Err(DarcError::rule_mismatch(
                    previous.rule().as_str(),
                    proposal.rule().as_str(),
                ));
            }
        }

        let lineage = self
            .lineage(proposal.rule())
            .ok_or_else(|| DarcError::unknown_lineage(proposal.rule().as_str()))?;
        let head = lineage.read().head().clone();
        Self::check_extends(&head, &proposal)?;
        self.authorize(&head, &proposal, signatures)?;

        let committed = Arc::new(proposal);
        {
            let mut lineage = lineage.write();
            let current = lineage.head().clone();
            if current.id() != head.id() {
                return Err(DarcError::stale_version(
                    current.version() + 1,
                    committed.version(),
                ));
            }
            lineage.history.push(committed.clone());
        }
        self.archive.write().insert(committed.id(), committed.clone());
        Ok(committed)
    }

    fn create_lineage(&self, proposal: Darc, signatures: &[Signature]) -> Result<Arc<Darc>> {
        if let Some(head) = self.lookup(proposal.rule()) {
            return Err(DarcError::stale_version(head.version() + 1, 0));
        }
        let root = self.root()?;
        self.authorize(&root, &proposal, signatures)?;

        let committed = Arc::new(proposal);
        {
            let mut lineages = self.lineages.write();
            if let Some(existing) = lineages.get(committed.rule()) {
                let head_version = existing.read().head().version();
                return Err(DarcError::stale_version(head_version + 1, 0));
            }
            lineages.insert(
                committed.rule().clone(),
                Arc::new(RwLock::new(Lineage::new(committed.clone()))),
            );
        }
        self.archive.write().insert(committed.id(), committed.clone());
        Ok(committed)
    }

    fn check_extends(head: &Darc, proposal: &Darc) -> Result<()> {
        let expected = head.version() + 1;
        if proposal.version() != expected || proposal.previous() != Some(head.id()) {
            return Err(DarcError::stale_version(expected, proposal.version()));
        }
        Ok(())
    }

    /// Referenced lineages must exist; a record may reference its own rule.
    fn check_references(&self, record: &Darc) -> Result<()> {
        for referenced in record.references() {
            if referenced != record.rule() && self.lookup(referenced).is_none() {
                return Err(DarcError::unknown_lineage(referenced.as_str()));
            }
        }
        Ok(())
    }

    /// Require one signature over the proposal id from an owner of `authority`.
    fn authorize(&self, authority: &Darc, proposal: &Darc, signatures: &[Signature]) -> Result<()> {
        let message = proposal.id();
        let resolver = self.resolver();
        let mut any_valid = false;
        for signature in signatures {
            if !signature.verify_with(self.scheme(), message.as_bytes()) {
                debug!(signer = %signature.signer, "Ignoring invalid proposal signature");
                continue;
            }
            any_valid = true;
            if resolver.is_authorized(authority, Role::Owner, &signature.signer) {
                return Ok(());
            }
        }
        if any_valid {
            Err(DarcError::unauthorized(format!(
                "no signer is an owner of '{}' v{}",
                authority.rule(),
                authority.version()
            )))
        } else {
            Err(DarcError::bad_signature(format!(
                "no valid signature over proposal {}",
                message
            )))
        }
    }

    /// Replace a lineage with a fresh version-0 record, bypassing owner
    /// checks. Reserved for PIN recovery, which authorizes with the
    /// server's own key. Superseded records stay in the archive.
    pub fn overwrite(&self, record: Darc) -> Result<Arc<Darc>> {
        record.verify_id()?;
        if record.version() != 0 {
            return Err(DarcError::stale_version(0, record.version()));
        }
        self.check_references(&record)?;

        let committed = Arc::new(record);
        self.archive.write().insert(committed.id(), committed.clone());
        let existing = self.lineage(committed.rule());
        match existing {
            Some(lineage) => {
                lineage.write().history = vec![committed.clone()];
            }
            None => {
                self.lineages
                    .write()
                    .entry(committed.rule().clone())
                    .and_modify(|lineage| lineage.write().history = vec![committed.clone()])
                    .or_insert_with(|| Arc::new(RwLock::new(Lineage::new(committed.clone()))));
            }
        }
        info!(rule = %committed.rule(), id = %committed.id(), "Overwrote policy lineage");
        Ok(committed)
    }
}
