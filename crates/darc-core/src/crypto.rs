//! Signing capability and key material
//!
//! Signing and verification are consumed through the `SignatureScheme`
//! trait so the store, verifier and recovery flow never depend on a
//! concrete algorithm. `Ed25519Scheme` is the production implementation.
//!
//! A `Signature` carries the public key it claims to be made by. Ed25519
//! cannot recover a key from a signature, so "recovering the signer" means
//! checking the signature under that claimed key.

use crate::random::RandomSource;
use crate::{DarcError, Result};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Hex (de)serialization for fixed-size byte arrays.
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let decoded = hex::decode(&encoded).map_err(serde::de::Error::custom)?;
        decoded
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("expected {} bytes", N)))
    }
}

/// 32-byte public key identifying a signer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "hex_bytes")] pub [u8; 32]);

impl PublicKey {
    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a hex-encoded key
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let decoded = hex::decode(encoded.trim())
            .map_err(|e| DarcError::crypto(format!("invalid public key hex: {}", e)))?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| DarcError::crypto("public key must be 32 bytes"))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &hex::encode(self.0)[..16])
    }
}

/// 32-byte secret seed. Zeroized on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; 32]);

impl SecretKey {
    /// Wrap raw seed bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a hex-encoded seed, as stored in key files
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let mut decoded = hex::decode(encoded.trim())
            .map_err(|e| DarcError::crypto(format!("invalid secret key hex: {}", e)))?;
        if decoded.len() != 32 {
            decoded.zeroize();
            return Err(DarcError::crypto("secret key must be 32 bytes"));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(bytes))
    }

    /// Raw seed bytes. Handle with care.
    pub fn expose(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// A signature together with the key that claims to have produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Claimed signer
    pub signer: PublicKey,
    /// Raw signature bytes
    #[serde(with = "hex_bytes")]
    pub bytes: [u8; 64],
}

impl Signature {
    /// Check this signature over `message` under its claimed signer.
    pub fn verify_with(&self, scheme: &dyn SignatureScheme, message: &[u8]) -> bool {
        scheme.verify(&self.signer, message, self)
    }
}

/// Opaque signing/verification capability.
pub trait SignatureScheme: Send + Sync + fmt::Debug {
    /// Derive the public key for a secret
    fn public_key(&self, secret: &SecretKey) -> PublicKey;

    /// Sign `message`; the result names the derived public key as signer.
    fn sign(&self, secret: &SecretKey, message: &[u8]) -> Signature;

    /// Verify `signature` over `message` under `public_key`.
    ///
    /// A signature whose embedded signer differs from `public_key` is invalid.
    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool;
}

/// Ed25519 with strict verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Scheme;

impl SignatureScheme for Ed25519Scheme {
    fn public_key(&self, secret: &SecretKey) -> PublicKey {
        PublicKey(SigningKey::from_bytes(secret.expose()).verifying_key().to_bytes())
    }

    fn sign(&self, secret: &SecretKey, message: &[u8]) -> Signature {
        let signing_key = SigningKey::from_bytes(secret.expose());
        Signature {
            signer: PublicKey(signing_key.verifying_key().to_bytes()),
            bytes: signing_key.sign(message).to_bytes(),
        }
    }

    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
        if signature.signer != *public_key {
            return false;
        }
        let Ok(verifying_key) = VerifyingKey::from_bytes(public_key.as_bytes()) else {
            return false;
        };
        let sig = ed25519_dalek::Signature::from_bytes(&signature.bytes);
        verifying_key.verify_strict(message, &sig).is_ok()
    }
}

/// A secret together with its public key.
#[derive(Debug, Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Derive a key pair from a seed
    pub fn from_secret(scheme: &dyn SignatureScheme, secret: SecretKey) -> Self {
        let public = scheme.public_key(&secret);
        Self { secret, public }
    }

    /// Generate a fresh key pair from the given random source
    pub fn generate(scheme: &dyn SignatureScheme, random: &dyn RandomSource) -> Self {
        let mut seed = [0u8; 32];
        random.fill_bytes(&mut seed);
        let pair = Self::from_secret(scheme, SecretKey::from_bytes(seed));
        seed.zeroize();
        pair
    }

    /// Public half
    pub fn public(&self) -> PublicKey {
        self.public
    }

    /// Secret half
    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    /// Sign a message with this key pair
    pub fn sign(&self, scheme: &dyn SignatureScheme, message: &[u8]) -> Signature {
        scheme.sign(&self.secret, message)
    }
}
