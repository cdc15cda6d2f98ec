//! Routing messages carried inside a path's layered encryption.
//!
//! Once every layer is stripped, the plaintext is a [`RoutingMessage`].
//! The path originator parses inbound plaintexts and dispatches them to a
//! [`RoutingMessageHandler`] bound to the path; what handlers do with the
//! messages is an application concern outside this crate.
//!
//! Malformed or rejected messages are dropped without tearing down the
//! circuit they arrived on.

use crate::error::{Error, Result};
use crate::path::Path;
use serde::{Deserialize, Serialize};

/// Maximum serialized routing message size in bytes (32 KiB).
///
/// Half the link message limit, leaving headroom for the relay wrapping.
pub const MAX_ROUTING_MESSAGE_SIZE: usize = crate::MAX_LINK_MESSAGE_SIZE / 2;

/// A message exchanged between a path originator and its terminal hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingMessage {
    /// Terminal hop acknowledges the path is live.
    PathConfirm {
        /// Build-to-confirm latency measured by the originator, if known.
        latency_ms: u64,
    },
    /// Latency probe echoed by the terminal hop.
    PathLatency {
        /// Millisecond timestamp the probe left the originator.
        sent_at_ms: u64,
    },
    /// Opaque application traffic.
    Data {
        /// Application payload.
        payload: Vec<u8>,
    },
}

impl RoutingMessage {
    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Encoding(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Encoding(e.to_string()))
    }
}

/// Consumer of routing messages arriving on a path.
///
/// Returning `false` rejects the message; the path layer logs and drops it.
pub trait RoutingMessageHandler: Send + Sync {
    /// Handle one decoded message delivered on `path`.
    fn handle_message(&self, msg: RoutingMessage, path: &Path) -> bool;
}
