//! # VeilNet Path Layer
//!
//! The circuit layer of the VeilNet onion-routing overlay. This crate
//! builds, indexes, and relays traffic over multi-hop encrypted paths
//! between routers.
//!
//! ## Responsibilities
//!
//! - **Path registry**: process-wide tracking of locally originated
//!   circuits and circuits this node relays for others, with concurrent
//!   lookup, insertion, and time-based eviction.
//! - **Layered encryption**: one symmetric transform per hop, composed so
//!   each hop strips exactly its own layer.
//! - **Hop chaining**: successive hops share identifiers so each hop only
//!   knows its immediate neighbors, never the full path.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         link layer (external)           │
//! ├─────────────────────────────────────────┤
//! │     path (registry, build, transit)     │
//! ├─────────────────────────────────────────┤
//! │    routing    │       transport         │
//! ├─────────────────────────────────────────┤
//! │    crypto     │       identity          │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The wire transport, path selection policy, and on-disk persistence are
//! outside this crate. Routers plug in through the [`transport::Router`]
//! facade; circuits are purely in-memory and ephemeral.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod crypto;
pub mod error;
pub mod identity;
pub mod path;
pub mod routing;
pub mod transport;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum link-layer message size in bytes (64 KiB).
pub const MAX_LINK_MESSAGE_SIZE: usize = 65536;
