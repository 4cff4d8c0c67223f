//! Signed-action verification
//!
//! The single entry point services call with the signature embedded in
//! their own requests. A forged signature (`BadSignature`) is reported
//! separately from a correctly signed but unprivileged one (`Unauthorized`).

use crate::matcher::RuleMatcher;
use crate::store::RecordStore;
use darc_core::{DarcError, Result, Role, Signature};
use tracing::{debug, warn};

/// Answers "may the signer invoke `service.method`?"
#[derive(Debug, Clone, Copy)]
pub struct Verifier<'a> {
    store: &'a RecordStore,
}

impl<'a> Verifier<'a> {
    /// Verifier over `store`
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Check `signature` over `message` and the signer's user rights on the
    /// record governing `service.method`.
    pub fn verify(
        &self,
        service: &str,
        method: &str,
        message: &[u8],
        signature: &Signature,
    ) -> Result<()> {
        let governing = RuleMatcher::new(self.store).governing(service, method)?;

        if !signature.verify_with(self.store.scheme(), message) {
            warn!(service, method, signer = %signature.signer, "Rejected forged signature");
            return Err(DarcError::bad_signature(format!(
                "signature by {} does not verify",
                signature.signer
            )));
        }

        if !self
            .store
            .resolver()
            .is_authorized(&governing, Role::User, &signature.signer)
        {
            warn!(
                service,
                method,
                rule = %governing.rule(),
                signer = %signature.signer,
                "Denied unauthorized signer"
            );
            return Err(DarcError::unauthorized(format!(
                "{} is not a user of '{}' v{}",
                signature.signer,
                governing.rule(),
                governing.version()
            )));
        }

        debug!(service, method, rule = %governing.rule(), "Authorized signed action");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use darc_core::{Ed25519Scheme, KeyPair, SecretKey};
    use std::sync::Arc;

    #[test]
    fn test_root_key_authorized_everywhere() {
        let root = KeyPair::from_secret(&Ed25519Scheme, SecretKey::from_bytes([1; 32]));
        let other = KeyPair::from_secret(&Ed25519Scheme, SecretKey::from_bytes([2; 32]));
        let store = RecordStore::bootstrap(Arc::new(Ed25519Scheme), root.public(), 10);
        let verifier = Verifier::new(&store);

        let message = b"do the thing";
        let ok = root.sign(&Ed25519Scheme, message);
        assert!(verifier.verify("Anything", "Anything", message, &ok).is_ok());

        let denied = other.sign(&Ed25519Scheme, message);
        let err = verifier.verify("Anything", "Anything", message, &denied).unwrap_err();
        assert!(matches!(err, DarcError::Unauthorized { .. }));
    }

    #[test]
    fn test_forged_signature_is_bad_signature() {
        let root = KeyPair::from_secret(&Ed25519Scheme, SecretKey::from_bytes([1; 32]));
        let store = RecordStore::bootstrap(Arc::new(Ed25519Scheme), root.public(), 10);
        let sig = root.sign(&Ed25519Scheme, b"original");
        let err = Verifier::new(&store)
            .verify("Anything", "Anything", b"tampered", &sig)
            .unwrap_err();
        assert!(matches!(err, DarcError::BadSignature { .. }));
    }
}
