//! X25519 key types for per-hop key exchange.
//!
//! During path build the originator generates one ephemeral keypair per
//! chosen hop and performs Diffie-Hellman against that hop's long-term
//! encryption key. All secret key material is zeroized on drop.

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of X25519 keys in bytes.
pub const X25519_KEY_SIZE: usize = 32;

/// An X25519 public key for key exchange.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
pub struct X25519PublicKey([u8; X25519_KEY_SIZE]);

impl X25519PublicKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; X25519_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; X25519_KEY_SIZE] {
        &self.0
    }

    pub(crate) fn to_dalek(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl fmt::Debug for X25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only show first 8 bytes in debug output
        write!(f, "X25519PublicKey({}...)", hex::encode(&self.0[..8]))
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(key: PublicKey) -> Self {
        Self(*key.as_bytes())
    }
}

/// A long-term X25519 encryption secret key.
///
/// Zeroized on drop to prevent key material from persisting in memory.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct X25519SecretKey([u8; X25519_KEY_SIZE]);

impl X25519SecretKey {
    /// Generate a new random secret key.
    pub fn random() -> Self {
        Self(StaticSecret::random_from_rng(OsRng).to_bytes())
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; X25519_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> X25519PublicKey {
        let secret = StaticSecret::from(self.0);
        X25519PublicKey::from(PublicKey::from(&secret))
    }
}

impl fmt::Debug for X25519SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X25519SecretKey([REDACTED])")
    }
}

/// A shared secret derived from X25519 key exchange.
///
/// Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; X25519_KEY_SIZE]);

impl SharedSecret {
    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; X25519_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret([REDACTED])")
    }
}

/// An ephemeral X25519 keypair, generated once per hop during path build.
///
/// Note: backed by `StaticSecret` because x25519-dalek's `EphemeralSecret`
/// can only perform DH once, and frame sealing needs the public half after
/// the exchange.
#[derive(ZeroizeOnDrop)]
pub struct EphemeralKeypair {
    #[zeroize(skip)]
    secret: StaticSecret,
    public: X25519PublicKey,
}

impl EphemeralKeypair {
    /// Generate a new random ephemeral keypair.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(PublicKey::from(&secret));
        Self { secret, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> &X25519PublicKey {
        &self.public
    }

    /// Perform Diffie-Hellman key exchange.
    pub fn diffie_hellman(&self, their_public: &X25519PublicKey) -> SharedSecret {
        let shared = self.secret.diffie_hellman(&their_public.to_dalek());
        SharedSecret(*shared.as_bytes())
    }
}

impl fmt::Debug for EphemeralKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeypair")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Perform X25519 Diffie-Hellman with our long-term secret key.
pub fn derive_shared_secret(
    our_secret: &X25519SecretKey,
    their_public: &X25519PublicKey,
) -> SharedSecret {
    let secret = StaticSecret::from(our_secret.0);
    let shared = secret.diffie_hellman(&their_public.to_dalek());
    SharedSecret(*shared.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dh_agreement() {
        let hop_secret = X25519SecretKey::random();
        let ephemeral = EphemeralKeypair::generate();

        let originator_side = ephemeral.diffie_hellman(&hop_secret.public_key());
        let hop_side = derive_shared_secret(&hop_secret, ephemeral.public_key());

        assert_eq!(originator_side.as_bytes(), hop_side.as_bytes());
    }

    #[test]
    fn test_distinct_ephemerals_distinct_secrets() {
        let hop_secret = X25519SecretKey::random();
        let e1 = EphemeralKeypair::generate();
        let e2 = EphemeralKeypair::generate();

        let s1 = e1.diffie_hellman(&hop_secret.public_key());
        let s2 = e2.diffie_hellman(&hop_secret.public_key());

        assert_ne!(s1.as_bytes(), s2.as_bytes());
    }

    #[test]
    fn test_secret_key_persistence() {
        let original = X25519SecretKey::random();
        let restored = X25519SecretKey::from_bytes(original.0);
        assert_eq!(original.public_key(), restored.public_key());
    }
}
