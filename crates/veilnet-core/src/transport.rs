//! Link-layer message types and the router facade.
//!
//! The path layer never touches sockets. Everything outbound goes through
//! [`Router::send_to`], a "send this message to that router identity"
//! primitive supplied by the owning router process. A send returning
//! `false` is surfaced to callers as a transport error and never retried
//! at this layer.

use crate::crypto::{EncryptedFrame, TunnelNonce, X25519SecretKey};
use crate::error::{Error, Result};
use crate::identity::{PathID, RouterID};
use serde::{Deserialize, Serialize};

/// Messages exchanged between directly connected routers on behalf of the
/// path layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LinkMessage {
    /// Payload travelling away from the path originator.
    RelayUpstream {
        /// Transmit identifier of the circuit at the receiving hop.
        path_id: PathID,
        /// Nonce the originator chose for this message.
        nonce: TunnelNonce,
        /// Layered ciphertext.
        payload: Vec<u8>,
    },
    /// Payload travelling back toward the path originator.
    RelayDownstream {
        /// Receive identifier of the circuit at the receiving hop.
        path_id: PathID,
        /// Nonce chosen when the reply entered the path.
        nonce: TunnelNonce,
        /// Layered ciphertext.
        payload: Vec<u8>,
    },
    /// Circuit construction request: one sealed frame per remaining hop,
    /// in hop order.
    PathBuild {
        /// Sealed per-hop build records.
        frames: Vec<EncryptedFrame>,
    },
}

impl LinkMessage {
    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Encoding(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Encoding(e.to_string()))
    }
}

/// Facade over the owning router process.
///
/// The path layer consumes the router's identity, its long-term encryption
/// key, and its link transport through this trait; it holds no lifecycle
/// for any of them.
pub trait Router: Send + Sync + 'static {
    /// Hand `msg` to the link layer addressed to `target`.
    ///
    /// Returns `false` if the transport rejects the send.
    fn send_to(&self, target: &RouterID, msg: LinkMessage) -> bool;

    /// This node's public router identity.
    fn our_id(&self) -> &RouterID;

    /// This node's long-term encryption secret key.
    fn encryption_secret(&self) -> &X25519SecretKey;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::X25519PublicKey;

    #[test]
    fn test_relay_upstream_roundtrip() {
        let msg = LinkMessage::RelayUpstream {
            path_id: PathID::random(),
            nonce: TunnelNonce::random(),
            payload: vec![1, 2, 3, 4],
        };

        let bytes = msg.to_bytes().expect("encode");
        let decoded = LinkMessage::from_bytes(&bytes).expect("decode");

        match decoded {
            LinkMessage::RelayUpstream { payload, .. } => assert_eq!(payload, vec![1, 2, 3, 4]),
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_path_build_roundtrip() {
        let recipient = X25519SecretKey::random();
        let frame = EncryptedFrame::seal(b"record", &recipient.public_key()).expect("seal");
        let msg = LinkMessage::PathBuild {
            frames: vec![frame.clone(), frame],
        };

        let bytes = msg.to_bytes().expect("encode");
        let decoded = LinkMessage::from_bytes(&bytes).expect("decode");

        match decoded {
            LinkMessage::PathBuild { frames } => assert_eq!(frames.len(), 2),
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(LinkMessage::from_bytes(&[0xFF; 3]).is_err());
    }
}
