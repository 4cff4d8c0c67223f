//! PIN session state machine
//!
//! Per rule: `NoSession → PinIssued → Consumed`. Requesting a PIN while one
//! is outstanding re-emits the same PIN, so concurrent requesters never see
//! different PINs for one rule. A correct submission consumes the session;
//! any rejected submission leaves it open for another try.

use chrono::{DateTime, Utc};
use darc_authorization::RecordStore;
use darc_core::{Darc, DarcError, KeyPair, PinSink, RandomSource, Result, Rule, Signature};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

/// Number of decimal digits in a PIN.
pub const PIN_DIGITS: usize = 6;

const PIN_SPACE: u32 = 1_000_000;

/// Observable state of a rule's PIN session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinState {
    /// No PIN has been requested
    NoSession,
    /// A PIN is outstanding
    PinIssued,
    /// The PIN was used; a new request starts a new session
    Consumed,
}

/// One issued PIN.
#[derive(Clone)]
pub struct PinSession {
    pin: String,
    issued_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
}

impl PinSession {
    fn issue(random: &dyn RandomSource) -> Self {
        let value = random.random_below(PIN_SPACE);
        Self {
            pin: format!("{:0width$}", value, width = PIN_DIGITS),
            issued_at: Utc::now(),
            consumed_at: None,
        }
    }

    /// When the PIN was generated
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// When the PIN was used, if it was
    pub fn consumed_at(&self) -> Option<DateTime<Utc>> {
        self.consumed_at
    }

    /// Session state
    pub fn state(&self) -> PinState {
        if self.consumed_at.is_some() {
            PinState::Consumed
        } else {
            PinState::PinIssued
        }
    }

    fn matches(&self, pin: &str) -> bool {
        self.pin.as_bytes().ct_eq(pin.as_bytes()).into()
    }
}

impl std::fmt::Debug for PinSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinSession")
            .field("pin", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("consumed_at", &self.consumed_at)
            .finish()
    }
}

/// Outcome of a successful PIN submission.
#[derive(Debug, Clone)]
pub struct PinCommit {
    /// The installed record
    pub record: Arc<Darc>,
    /// Server signature over the record id, standing in for root authority
    pub server_signature: Signature,
}

/// Session slot of one rule. Locked for the whole of a submission.
type SessionSlot = Arc<Mutex<Option<PinSession>>>;

/// Issues and redeems one-time recovery PINs.
#[derive(Debug)]
pub struct PinRecoveryController {
    store: Arc<RecordStore>,
    server: KeyPair,
    random: Arc<dyn RandomSource>,
    sink: Arc<dyn PinSink>,
    sessions: Mutex<HashMap<Rule, SessionSlot>>,
}

impl PinRecoveryController {
    /// Controller committing into `store` and signing with `server`
    pub fn new(
        store: Arc<RecordStore>,
        server: KeyPair,
        random: Arc<dyn RandomSource>,
        sink: Arc<dyn PinSink>,
    ) -> Self {
        Self {
            store,
            server,
            random,
            sink,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, rule: &Rule) -> Option<SessionSlot> {
        self.sessions.lock().get(rule).cloned()
    }

    fn slot_or_insert(&self, rule: &Rule) -> SessionSlot {
        self.sessions
            .lock()
            .entry(rule.clone())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Current state for `rule`
    pub fn state(&self, rule: &Rule) -> PinState {
        self.session(rule)
            .map_or(PinState::NoSession, |session| session.state())
    }

    /// Session details for `rule`, if one was ever issued
    pub fn session(&self, rule: &Rule) -> Option<PinSession> {
        let slot = self.slot(rule)?;
        let session = slot.lock().clone();
        session
    }

    /// Issue a PIN for `rule`, or re-emit the outstanding one.
    pub fn request_pin(&self, rule: &Rule) -> String {
        let slot = self.slot_or_insert(rule);
        let mut current = slot.lock();
        let session = match &*current {
            Some(session) if session.state() == PinState::PinIssued => {
                info!(rule = %rule, "Re-emitting outstanding recovery PIN");
                session.clone()
            }
            _ => {
                let session = PinSession::issue(self.random.as_ref());
                *current = Some(session.clone());
                info!(rule = %rule, "Issued recovery PIN");
                session
            }
        };
        self.sink.emit(rule, &session.pin);
        session.pin
    }

    /// Redeem the PIN for `rule` by installing `record` as the lineage's
    /// new version 0, signed by the server.
    pub fn submit_with_pin(&self, rule: &Rule, pin: &str, record: Darc) -> Result<PinCommit> {
        let slot = self.slot(rule).ok_or_else(|| {
            DarcError::wrong_state(format!("no PIN was requested for '{}'", rule))
        })?;
        // Held across the commit so one PIN can only ever be redeemed once.
        let mut current = slot.lock();
        let session = match &mut *current {
            Some(session) if session.state() == PinState::PinIssued => session,
            Some(_) => {
                return Err(DarcError::wrong_state(format!(
                    "PIN for '{}' was already used; request a new one",
                    rule
                )))
            }
            None => {
                return Err(DarcError::wrong_state(format!(
                    "no PIN was requested for '{}'",
                    rule
                )))
            }
        };

        if !session.matches(pin) {
            warn!(rule = %rule, "Rejected wrong recovery PIN");
            return Err(DarcError::pin_mismatch(rule.as_str()));
        }
        if record.rule() != rule {
            return Err(DarcError::rule_mismatch(rule.as_str(), record.rule().as_str()));
        }
        if record.version() != 0 {
            return Err(DarcError::stale_version(0, record.version()));
        }

        let server_signature = self
            .server
            .sign(self.store.scheme(), record.id().as_bytes());
        let committed = self.store.overwrite(record)?;
        session.consumed_at = Some(Utc::now());
        info!(rule = %rule, id = %committed.id(), "Recovery PIN redeemed");

        Ok(PinCommit {
            record: committed,
            server_signature,
        })
    }
}
