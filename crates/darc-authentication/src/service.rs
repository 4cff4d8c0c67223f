//! The policy service
//!
//! Owns the record store and the PIN recovery controller, and exposes the
//! four policy-management calls plus signed-action verification. At
//! construction the store is seeded with the root record for `*`, owned
//! and used by the server's own key.

use crate::config::ServiceConfig;
use crate::messages::{
    AddPolicy, AddPolicyReply, Auth, GetPolicy, GetPolicyReply, UpdatePolicy, UpdatePolicyPin,
    UpdatePolicyPinReply, UpdatePolicyReply,
};
use darc_authorization::{RecordStore, RuleMatcher, Verifier};
use darc_core::{
    DarcError, Ed25519Scheme, KeyPair, OsRandom, PinSink, PublicKey, RandomSource, Result, Rule,
    Signature, SignatureScheme,
};
use darc_recovery::{PinRecoveryController, TracingPinSink};
use std::sync::Arc;
use tracing::info;

/// Service name under which callers address this service.
pub const SERVICE_NAME: &str = "authentication";

/// Central policy authority embedded in a node.
#[derive(Debug)]
pub struct AuthenticationService {
    config: ServiceConfig,
    server_key: PublicKey,
    store: Arc<RecordStore>,
    recovery: PinRecoveryController,
}

impl AuthenticationService {
    /// Build a service around an explicit server key and capabilities.
    pub fn new(
        config: ServiceConfig,
        server: KeyPair,
        scheme: Arc<dyn SignatureScheme>,
        random: Arc<dyn RandomSource>,
        sink: Arc<dyn PinSink>,
    ) -> Result<Self> {
        config.validate()?;
        let server_key = server.public();
        let store = Arc::new(RecordStore::bootstrap(
            scheme,
            server_key,
            config.max_reference_depth,
        ));
        let recovery = PinRecoveryController::new(store.clone(), server, random, sink);
        info!(
            server_key = %server_key,
            max_reference_depth = config.max_reference_depth,
            "Authentication service started"
        );
        Ok(Self {
            config,
            server_key,
            store,
            recovery,
        })
    }

    /// Build a production service: ed25519, OS randomness, PINs to the log,
    /// server key as configured.
    pub fn from_config(config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        let scheme: Arc<dyn SignatureScheme> = Arc::new(Ed25519Scheme);
        let random: Arc<dyn RandomSource> = Arc::new(OsRandom);
        let server = config.load_server_key(scheme.as_ref(), random.as_ref())?;
        Self::new(config, server, scheme, random, Arc::new(TracingPinSink))
    }

    /// Active configuration
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Public key of the server, the initial root owner and user
    pub fn server_public_key(&self) -> PublicKey {
        self.server_key
    }

    /// Underlying record store
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// PIN recovery controller
    pub fn recovery(&self) -> &PinRecoveryController {
        &self.recovery
    }

    /// Latest record for the rule, falling back along
    /// `Service.Method → Service → *` when the exact rule has none. Without
    /// a rule the root record is returned.
    pub fn get_policy(&self, request: &GetPolicy) -> Result<GetPolicyReply> {
        let requested = request.rule.clone().unwrap_or_else(Rule::root);
        let latest = RuleMatcher::new(&self.store).closest(&requested)?;
        let exact = latest.rule() == &requested;
        Ok(GetPolicyReply {
            latest: latest.as_ref().clone(),
            exact,
        })
    }

    /// Propose a new record or the next version of an existing one.
    pub fn update_policy(&self, request: UpdatePolicy) -> Result<UpdatePolicyReply> {
        let committed = self.store.propose(request.new_darc, &request.signatures)?;
        Ok(UpdatePolicyReply {
            id: committed.id(),
            version: committed.version(),
        })
    }

    /// Create a new lineage under root-owner authority.
    pub fn add_policy(&self, request: AddPolicy) -> Result<AddPolicyReply> {
        if request.new_darc.version() != 0 {
            return Err(DarcError::invalid(format!(
                "AddPolicy creates lineages; got version {} for '{}'",
                request.new_darc.version(),
                request.new_darc.rule()
            )));
        }
        let committed = self.store.propose(request.new_darc, &request.signatures)?;
        Ok(AddPolicyReply { id: committed.id() })
    }

    /// Request a PIN (empty `pin`) or redeem one.
    pub fn update_policy_pin(&self, request: UpdatePolicyPin) -> Result<UpdatePolicyPinReply> {
        let rule = request.new_darc.rule().clone();
        if request.pin.is_empty() {
            self.recovery.request_pin(&rule);
            return Ok(UpdatePolicyPinReply::PinIssued { rule });
        }
        let commit = self
            .recovery
            .submit_with_pin(&rule, &request.pin, request.new_darc)?;
        Ok(UpdatePolicyPinReply::Committed {
            id: commit.record.id(),
            server_signature: commit.server_signature,
        })
    }

    /// Whether the signer of `message` may invoke `service.method`.
    pub fn verify(
        &self,
        service: &str,
        method: &str,
        message: &[u8],
        signature: &Signature,
    ) -> Result<()> {
        Verifier::new(&self.store).verify(service, method, message, signature)
    }

    /// `verify` for the `Auth` block embedded in a client request.
    pub fn verify_auth(
        &self,
        service: &str,
        method: &str,
        message: &[u8],
        auth: &Auth,
    ) -> Result<()> {
        self.verify(service, method, message, &auth.signature)
    }
}
