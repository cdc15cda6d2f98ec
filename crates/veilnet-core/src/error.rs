//! Error types for the VeilNet path layer.
//!
//! All failures in this crate are local and recoverable: a failed send,
//! parse, or build never tears down unrelated circuits and never panics.
//! A registry lookup that finds nothing is not an error — it is the normal
//! "not for us" signal and is expressed as `Option`, not `Err`.

use thiserror::Error;

/// Core error type for path-layer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Cryptographic operation failed (bad frame, failed key exchange).
    /// Details are intentionally vague to prevent oracle attacks.
    #[error("cryptographic operation failed")]
    Crypto(String),

    /// Encoding or decoding of a message failed.
    #[error("encoding error")]
    Encoding(String),

    /// The transport layer rejected a send. Not retried at this layer.
    #[error("transport rejected send")]
    Transport(String),

    /// A decoded routing message was rejected by its handler.
    #[error("invalid routing message")]
    InvalidMessage(String),

    /// Serialized message exceeds the outbound scratch capacity.
    #[error("message too large")]
    MessageTooLarge(usize),

    /// A path build request was malformed or not acceptable here.
    #[error("path build rejected")]
    Build(String),
}

/// Result type alias using the path layer's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
