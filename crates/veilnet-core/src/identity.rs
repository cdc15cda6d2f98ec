//! Router and path identifiers.
//!
//! A [`RouterID`] is a router's long-term public identity key. A [`PathID`]
//! is a fixed-size random value naming one direction of one circuit at one
//! hop; two are allocated per hop (transmit and receive). Uniqueness of
//! path identifiers is probabilistic — the registry does not enforce it,
//! and correctness relies on 128-bit collision probability being negligible
//! at network scale.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of a path identifier in bytes.
pub const PATH_ID_SIZE: usize = 16;

/// Size of a router identity in bytes.
pub const ROUTER_ID_SIZE: usize = 32;

/// Opaque random identifier for one direction of a circuit at one hop.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathID([u8; PATH_ID_SIZE]);

impl PathID {
    /// Generate a fresh random identifier.
    pub fn random() -> Self {
        let mut bytes = [0u8; PATH_ID_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; PATH_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; PATH_ID_SIZE] {
        &self.0
    }
}

impl fmt::Debug for PathID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathID({})", hex::encode(self.0))
    }
}

impl fmt::Display for PathID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// A router's long-term public identity key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouterID([u8; ROUTER_ID_SIZE]);

impl RouterID {
    /// Create from raw public key bytes.
    pub fn from_bytes(bytes: [u8; ROUTER_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ROUTER_ID_SIZE] {
        &self.0
    }
}

impl fmt::Debug for RouterID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only show first 8 bytes in debug output
        write!(f, "RouterID({}...)", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for RouterID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}
