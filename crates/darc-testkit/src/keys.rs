//! Key test helpers
//!
//! Standardized helpers for creating test keys and signatures.

use darc_core::{Darc, Ed25519Scheme, KeyPair, PublicKey, SecretKey, Signature, SignatureScheme};
use sha2::{Digest, Sha256};

/// Key fixture with deterministic generation from a seed
#[derive(Debug, Clone)]
pub struct KeyFixture {
    pair: KeyPair,
    label: String,
}

impl KeyFixture {
    /// Create a fixture from raw seed bytes
    pub fn from_seed(seed: [u8; 32], label: impl Into<String>) -> Self {
        Self {
            pair: KeyPair::from_secret(&Ed25519Scheme, SecretKey::from_bytes(seed)),
            label: label.into(),
        }
    }

    /// Create a fixture whose seed is the SHA-256 of `seed`
    pub fn from_seed_string(seed: &str) -> Self {
        let digest = Sha256::digest(seed.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self::from_seed(bytes, seed)
    }

    /// Human readable label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Public key
    pub fn public(&self) -> PublicKey {
        self.pair.public()
    }

    /// Underlying key pair
    pub fn pair(&self) -> &KeyPair {
        &self.pair
    }

    /// Hex-encoded seed, the format of server key files
    pub fn secret_hex(&self) -> String {
        hex::encode(self.pair.secret().expose())
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Signature {
        Ed25519Scheme.sign(self.pair.secret(), message)
    }

    /// Sign a record's identifier, as proposers do
    pub fn endorse(&self, darc: &Darc) -> Signature {
        self.sign(darc.id().as_bytes())
    }
}

/// Endorsements of `darc` by each fixture
pub fn signed_by(darc: &Darc, signers: &[&KeyFixture]) -> Vec<Signature> {
    signers.iter().map(|signer| signer.endorse(darc)).collect()
}
