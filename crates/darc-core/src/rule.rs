//! Rule selectors
//!
//! A rule names what a record governs: `*` (everything), `Service` (every
//! method of a service) or `Service.Method` (one method). The store is
//! keyed by rule, so a rule also names a lineage.

use crate::{DarcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rule string of the root record.
pub const ROOT_RULE: &str = "*";

/// Shape of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// `*`
    Root,
    /// `Service`
    Service,
    /// `Service.Method`
    Method,
}

/// A validated rule selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rule(String);

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Rule {
    /// Parse and validate a rule string
    pub fn parse(rule: &str) -> Result<Self> {
        if rule == ROOT_RULE {
            return Ok(Self::root());
        }
        let valid = match rule.split_once('.') {
            Some((service, method)) => valid_segment(service) && valid_segment(method),
            None => valid_segment(rule),
        };
        if !valid {
            return Err(DarcError::invalid(format!("malformed rule '{}'", rule)));
        }
        Ok(Self(rule.to_string()))
    }

    /// The root rule `*`
    pub fn root() -> Self {
        Self(ROOT_RULE.to_string())
    }

    /// Rule covering every method of `service`
    pub fn service(service: &str) -> Result<Self> {
        if !valid_segment(service) {
            return Err(DarcError::invalid(format!("malformed service '{}'", service)));
        }
        Ok(Self(service.to_string()))
    }

    /// Rule covering exactly `service.method`
    pub fn method(service: &str, method: &str) -> Result<Self> {
        if !valid_segment(service) || !valid_segment(method) {
            return Err(DarcError::invalid(format!(
                "malformed method rule '{}.{}'",
                service, method
            )));
        }
        Ok(Self(format!("{}.{}", service, method)))
    }

    /// Candidate rules for a call, most specific first.
    pub fn candidates(service: &str, method: &str) -> Result<[Rule; 3]> {
        Ok([
            Self::method(service, method)?,
            Self::service(service)?,
            Self::root(),
        ])
    }

    /// Candidate rules for looking up `self`, most specific first, starting
    /// with `self`.
    pub fn fallbacks(&self) -> Vec<Rule> {
        match self.kind() {
            RuleKind::Root => vec![self.clone()],
            RuleKind::Service => vec![self.clone(), Self::root()],
            RuleKind::Method => {
                let service = self.0.split('.').next().unwrap_or_default();
                vec![self.clone(), Self(service.to_string()), Self::root()]
            }
        }
    }

    /// Shape of this rule
    pub fn kind(&self) -> RuleKind {
        if self.0 == ROOT_RULE {
            RuleKind::Root
        } else if self.0.contains('.') {
            RuleKind::Method
        } else {
            RuleKind::Service
        }
    }

    /// Whether this is the root rule
    pub fn is_root(&self) -> bool {
        self.kind() == RuleKind::Root
    }

    /// Rule as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Rule {
    type Err = DarcError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Rule {
    type Error = DarcError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Rule> for String {
    fn from(rule: Rule) -> Self {
        rule.0
    }
}
