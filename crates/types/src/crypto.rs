//! Cryptographic key pairs and signatures.
//!
//! Supports:
//! - ED25519: Fast signing for general use
//! - BLS12-381: Alternative scheme for notaries sharing keys with other committees

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported key types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    /// ED25519 - Fast, widely supported.
    Ed25519,
    /// BLS12-381.
    Bls12381,
}

/// A cryptographic key pair for signing.
#[derive(Clone)]
pub enum KeyPair {
    /// ED25519 key pair.
    Ed25519(ed25519_dalek::SigningKey),
    /// BLS12-381 key pair.
    Bls12381(blst::min_pk::SecretKey),
}

impl KeyPair {
    /// Generate a new random Ed25519 keypair.
    pub fn generate_ed25519() -> Self {
        let mut csprng = rand::rngs::OsRng;
        let signing_key = ed25519_dalek::SigningKey::generate(&mut csprng);
        KeyPair::Ed25519(signing_key)
    }

    /// Generate a new random BLS12-381 keypair.
    pub fn generate_bls() -> Result<Self, CryptoError> {
        let mut ikm = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut ikm);
        let sk = blst::min_pk::SecretKey::key_gen(&ikm, &[])
            .map_err(|_| CryptoError::KeyGeneration)?;
        Ok(KeyPair::Bls12381(sk))
    }

    /// Generate a keypair from a seed (for testing/simulation).
    pub fn from_seed(key_type: KeyType, seed: &[u8; 32]) -> Result<Self, CryptoError> {
        match key_type {
            KeyType::Ed25519 => Ok(KeyPair::Ed25519(ed25519_dalek::SigningKey::from_bytes(
                seed,
            ))),
            KeyType::Bls12381 => {
                let sk = blst::min_pk::SecretKey::key_gen(seed, &[])
                    .map_err(|_| CryptoError::KeyGeneration)?;
                Ok(KeyPair::Bls12381(sk))
            }
        }
    }

    /// Key type of this pair.
    pub fn key_type(&self) -> KeyType {
        match self {
            KeyPair::Ed25519(_) => KeyType::Ed25519,
            KeyPair::Bls12381(_) => KeyType::Bls12381,
        }
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        match self {
            KeyPair::Ed25519(signing_key) => {
                use ed25519_dalek::Signer;
                let sig = signing_key.sign(message);
                Signature::Ed25519(sig.to_bytes().to_vec())
            }
            KeyPair::Bls12381(sk) => {
                let sig = sk.sign(message, &[], &[]);
                Signature::Bls12381(sig.to_bytes().to_vec())
            }
        }
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            KeyPair::Ed25519(signing_key) => {
                PublicKey::Ed25519(signing_key.verifying_key().to_bytes())
            }
            KeyPair::Bls12381(sk) => PublicKey::Bls12381(sk.sk_to_pk().to_bytes().to_vec()),
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({:?})", self.public_key())
    }
}

/// A public key for signature verification.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PublicKey {
    /// ED25519 public key (32 bytes).
    Ed25519([u8; 32]),
    /// BLS12-381 public key (48 bytes compressed).
    Bls12381(Vec<u8>),
}

impl PublicKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PublicKey::Ed25519(bytes) => bytes.as_slice(),
            PublicKey::Bls12381(bytes) => bytes.as_slice(),
        }
    }

    /// Verify a signature, treating malformed input as a failed check.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.try_verify(message, signature).unwrap_or(false)
    }

    /// Verify a signature.
    ///
    /// Returns `Err` when the key or signature bytes cannot be decoded, and
    /// `Ok(false)` when they decode but the signature does not match.
    pub fn try_verify(&self, message: &[u8], signature: &Signature) -> Result<bool, CryptoError> {
        match (self, signature) {
            (PublicKey::Ed25519(pk_bytes), Signature::Ed25519(sig_bytes)) => {
                use ed25519_dalek::Verifier;
                let pk = ed25519_dalek::VerifyingKey::from_bytes(pk_bytes)
                    .map_err(|_| CryptoError::MalformedPublicKey)?;
                let sig_array: [u8; 64] = sig_bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| CryptoError::MalformedSignature)?;
                let sig = ed25519_dalek::Signature::from_bytes(&sig_array);
                Ok(pk.verify(message, &sig).is_ok())
            }
            (PublicKey::Bls12381(pk_bytes), Signature::Bls12381(sig_bytes)) => {
                let pk = blst::min_pk::PublicKey::from_bytes(pk_bytes)
                    .map_err(|_| CryptoError::MalformedPublicKey)?;
                let sig = blst::min_pk::Signature::from_bytes(sig_bytes)
                    .map_err(|_| CryptoError::MalformedSignature)?;
                Ok(sig.verify(true, message, &[], &[], &pk, true)
                    == blst::BLST_ERROR::BLST_SUCCESS)
            }
            _ => Err(CryptoError::SchemeMismatch),
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicKey::Ed25519(bytes) => {
                write!(f, "PublicKey::Ed25519({})", hex::encode(bytes))
            }
            PublicKey::Bls12381(bytes) => {
                let hex = hex::encode(bytes);
                if hex.len() < 16 {
                    return write!(f, "PublicKey::Bls12381({})", hex);
                }
                write!(
                    f,
                    "PublicKey::Bls12381({}..{})",
                    &hex[..8],
                    &hex[hex.len() - 8..]
                )
            }
        }
    }
}

/// A cryptographic signature.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signature {
    /// ED25519 signature (64 bytes).
    Ed25519(Vec<u8>),
    /// BLS12-381 signature (96 bytes compressed).
    Bls12381(Vec<u8>),
}

impl Signature {
    /// Create a zero/placeholder signature for testing.
    pub fn zero() -> Self {
        Signature::Ed25519(vec![0u8; 64])
    }

    /// Get signature as byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Signature::Ed25519(bytes) => bytes.as_slice(),
            Signature::Bls12381(bytes) => bytes.as_slice(),
        }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(self.as_bytes());
        let short = &hex[..hex.len().min(16)];
        match self {
            Signature::Ed25519(_) => write!(f, "Signature::Ed25519({}..)", short),
            Signature::Bls12381(_) => write!(f, "Signature::Bls12381({}..)", short),
        }
    }
}

/// Errors raised while decoding keys or signatures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// Key material could not be derived.
    #[error("Key generation failed")]
    KeyGeneration,

    /// Public key bytes are not a valid point.
    #[error("Malformed public key")]
    MalformedPublicKey,

    /// Signature bytes have the wrong length or encoding.
    #[error("Malformed signature")]
    MalformedSignature,

    /// Key and signature belong to different schemes.
    #[error("Public key and signature use different schemes")]
    SchemeMismatch,
}
