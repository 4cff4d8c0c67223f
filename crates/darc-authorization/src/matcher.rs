//! Longest-match rule resolution
//!
//! A call to `Service.Method` is governed by the most specific record
//! published among `Service.Method`, `Service` and `*`. An administrator can
//! therefore delegate a single method without granting the whole service.

use crate::store::RecordStore;
use darc_core::{Darc, DarcError, Result, Rule};
use std::sync::Arc;
use tracing::debug;

/// Resolves a call to its governing record.
#[derive(Debug, Clone, Copy)]
pub struct RuleMatcher<'a> {
    store: &'a RecordStore,
}

impl<'a> RuleMatcher<'a> {
    /// Matcher over `store`
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Most specific record governing `service.method`.
    ///
    /// `NoGoverningPolicy` means even the root record is missing.
    pub fn governing(&self, service: &str, method: &str) -> Result<Arc<Darc>> {
        for candidate in Rule::candidates(service, method)? {
            if let Some(record) = self.store.lookup(&candidate) {
                debug!(service, method, rule = %candidate, "Matched governing policy");
                return Ok(record);
            }
        }
        Err(DarcError::no_governing_policy(service, method))
    }

    /// Exact record for `rule`, else the closest broader one.
    pub fn closest(&self, rule: &Rule) -> Result<Arc<Darc>> {
        rule.fallbacks()
            .iter()
            .find_map(|candidate| self.store.lookup(candidate))
            .ok_or_else(|| DarcError::not_found(format!("no policy covers rule '{}'", rule)))
    }
}
