//! The per-hop stream transform used for layered path encryption.
//!
//! Each hop of a path holds a [`SymmetricKey`] shared with the originator.
//! Wrapping a payload applies [`stream_transform`] once per hop; each hop
//! strips its own layer by applying the identical transform with its key.
//! Because the transform is XOR with an XChaCha20 keystream it is its own
//! inverse, and layers keyed independently commute — the layer order of the
//! unwrap does not have to mirror the wrap.

use crate::crypto::SharedSecret;
use crate::error::Result;
use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::XChaCha20;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a per-hop symmetric key in bytes.
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Size of a tunnel nonce in bytes (XChaCha20 nonce).
pub const TUNNEL_NONCE_SIZE: usize = 24;

/// HKDF info label for deriving a path key from a key exchange.
const PATH_KEY_INFO: &[u8] = b"veilnet path layer key";

/// A fresh random nonce carried with every relayed payload.
///
/// The same nonce is used for every layer of one message; uniqueness across
/// messages is what matters, and each key only ever sees nonces chosen by
/// the path originator.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelNonce([u8; TUNNEL_NONCE_SIZE]);

impl TunnelNonce {
    /// Create a new random nonce.
    pub fn random() -> Self {
        Self(crate::crypto::random_bytes())
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; TUNNEL_NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; TUNNEL_NONCE_SIZE] {
        &self.0
    }
}

impl fmt::Debug for TunnelNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TunnelNonce({})", hex::encode(&self.0[..8]))
    }
}

/// A per-hop symmetric key shared between a hop and the path originator.
///
/// Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_SIZE]);

impl SymmetricKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Derive a path key from a key-exchange output.
    pub fn derive(shared: &SharedSecret) -> Result<Self> {
        let okm = crate::crypto::hkdf_derive(None, shared.as_bytes(), PATH_KEY_INFO, 32)?;
        let mut bytes = [0u8; SYMMETRIC_KEY_SIZE];
        bytes.copy_from_slice(&okm);
        Ok(Self(bytes))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey([REDACTED])")
    }
}

/// Apply the XChaCha20 stream transform in place.
///
/// The same call both applies and strips a layer given matching key and
/// nonce.
pub fn stream_transform(buf: &mut [u8], key: &SymmetricKey, nonce: &TunnelNonce) {
    let mut cipher = XChaCha20::new(key.as_bytes().into(), nonce.as_bytes().into());
    cipher.apply_keystream(buf);
}
