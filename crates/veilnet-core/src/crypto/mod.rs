//! Cryptographic primitives for the path layer.
//!
//! Only well-audited primitives are used:
//!
//! - **X25519**: per-hop key exchange during path build
//! - **HKDF-SHA256**: key derivation from exchange output
//! - **XChaCha20**: stream cipher for the per-hop layered transform
//! - **XChaCha20-Poly1305**: sealed build-record frames
//!
//! Secret key material is zeroized on drop. The layered transform relies
//! on XChaCha20 keystream XOR being self-inverse and commutative across
//! independently keyed layers: applying the same ordered sequence of
//! transforms twice is an identity, which is what lets the originator use
//! one code path for wrapping and unwrapping.

mod frame;
mod keys;
mod stream;

pub use frame::EncryptedFrame;
pub use keys::{
    derive_shared_secret, EphemeralKeypair, SharedSecret, X25519PublicKey, X25519SecretKey,
    X25519_KEY_SIZE,
};
pub use stream::{stream_transform, SymmetricKey, TunnelNonce, SYMMETRIC_KEY_SIZE, TUNNEL_NONCE_SIZE};

use crate::error::{Error, Result};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Derive keys using HKDF-SHA256.
pub fn hkdf_derive(
    salt: Option<&[u8]>,
    input_key_material: &[u8],
    info: &[u8],
    output_length: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let hkdf = Hkdf::<Sha256>::new(salt, input_key_material);
    let mut output = Zeroizing::new(vec![0u8; output_length]);
    hkdf.expand(info, &mut output)
        .map_err(|_| Error::Crypto("HKDF expansion failed".into()))?;
    Ok(output)
}

/// Generate cryptographically secure random bytes.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut bytes);
    bytes
}
