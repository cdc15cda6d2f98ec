//! Sealed frames carrying per-hop build records.
//!
//! A path build message is an ordered queue of frames, one per hop, each
//! readable only by the hop it is addressed to. A frame is sealed against
//! the hop's long-term encryption key with a fresh ephemeral keypair:
//!
//! ```text
//! ephemeral pub (32) || nonce (24) || XChaCha20-Poly1305 ciphertext
//! ```
//!
//! The ephemeral public key and nonce are bound as associated data, so any
//! tampering with the clear prefix fails authentication.

use crate::crypto::{
    derive_shared_secret, EphemeralKeypair, X25519PublicKey, X25519SecretKey, X25519_KEY_SIZE,
};
use crate::error::{Error, Result};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use serde::{Deserialize, Serialize};

/// Nonce size for the frame AEAD (XChaCha20-Poly1305).
const FRAME_NONCE_SIZE: usize = 24;

/// Minimum wire size of a sealed frame: prefix plus AEAD tag.
const MIN_FRAME_SIZE: usize = X25519_KEY_SIZE + FRAME_NONCE_SIZE + 16;

/// HKDF info label for deriving a frame sealing key.
const FRAME_KEY_INFO: &[u8] = b"veilnet build frame key";

/// An opaque encrypted frame within a path build message.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedFrame(Vec<u8>);

impl EncryptedFrame {
    /// Seal `plaintext` so only the holder of `recipient`'s secret key can
    /// open it.
    pub fn seal(plaintext: &[u8], recipient: &X25519PublicKey) -> Result<Self> {
        let ephemeral = EphemeralKeypair::generate();
        let shared = ephemeral.diffie_hellman(recipient);
        let key_bytes =
            crate::crypto::hkdf_derive(None, shared.as_bytes(), FRAME_KEY_INFO, 32)?;

        let nonce_bytes: [u8; FRAME_NONCE_SIZE] = crate::crypto::random_bytes();

        let mut prefix = Vec::with_capacity(X25519_KEY_SIZE + FRAME_NONCE_SIZE);
        prefix.extend_from_slice(ephemeral.public_key().as_bytes());
        prefix.extend_from_slice(&nonce_bytes);

        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key_bytes));
        let ciphertext = cipher
            .encrypt(
                XNonce::from_slice(&nonce_bytes),
                Payload {
                    msg: plaintext,
                    aad: &prefix,
                },
            )
            .map_err(|_| Error::Crypto("frame seal failed".into()))?;

        let mut bytes = prefix;
        bytes.extend_from_slice(&ciphertext);
        Ok(Self(bytes))
    }

    /// Open a frame sealed against our encryption key.
    ///
    /// Returns a generic error on any failure to prevent oracle attacks.
    pub fn open(&self, our_secret: &X25519SecretKey) -> Result<Vec<u8>> {
        if self.0.len() < MIN_FRAME_SIZE {
            return Err(Error::Crypto("frame too short".into()));
        }

        let ephemeral_bytes: [u8; X25519_KEY_SIZE] = self.0[..X25519_KEY_SIZE]
            .try_into()
            .map_err(|_| Error::Crypto("bad frame prefix".into()))?;
        let ephemeral = X25519PublicKey::from_bytes(ephemeral_bytes);

        let prefix = &self.0[..X25519_KEY_SIZE + FRAME_NONCE_SIZE];
        let nonce = &self.0[X25519_KEY_SIZE..X25519_KEY_SIZE + FRAME_NONCE_SIZE];
        let ciphertext = &self.0[X25519_KEY_SIZE + FRAME_NONCE_SIZE..];

        let shared = derive_shared_secret(our_secret, &ephemeral);
        let key_bytes = crate::crypto::hkdf_derive(None, shared.as_bytes(), FRAME_KEY_INFO, 32)?;

        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key_bytes));
        cipher
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: prefix,
                },
            )
            .map_err(|_| Error::Crypto("frame open failed".into()))
    }

    /// Wire size of the sealed frame in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the frame carries no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for EncryptedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncryptedFrame([{} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let hop_secret = X25519SecretKey::random();
        let frame =
            EncryptedFrame::seal(b"build record", &hop_secret.public_key()).expect("seal");

        let opened = frame.open(&hop_secret).expect("open");
        assert_eq!(opened, b"build record");
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let intended = X25519SecretKey::random();
        let other = X25519SecretKey::random();

        let frame = EncryptedFrame::seal(b"build record", &intended.public_key()).expect("seal");
        assert!(frame.open(&other).is_err());
    }

    #[test]
    fn test_tampered_frame_fails() {
        let hop_secret = X25519SecretKey::random();
        let mut frame =
            EncryptedFrame::seal(b"build record", &hop_secret.public_key()).expect("seal");

        let last = frame.0.len() - 1;
        frame.0[last] ^= 0xFF;
        assert!(frame.open(&hop_secret).is_err());

        // Tampering with the clear prefix must also fail (bound as AAD)
        let mut frame2 =
            EncryptedFrame::seal(b"build record", &hop_secret.public_key()).expect("seal");
        frame2.0[0] ^= 0x01;
        assert!(frame2.open(&hop_secret).is_err());
    }

    #[test]
    fn test_truncated_frame_fails() {
        let frame = EncryptedFrame(vec![0u8; MIN_FRAME_SIZE - 1]);
        assert!(frame.open(&X25519SecretKey::random()).is_err());
    }
}
