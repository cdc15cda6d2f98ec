//! Circuits: locally originated paths, transit hops, and their registry.
//!
//! A [`Path`] is a circuit this node originated: an ordered chain of hops,
//! each holding a shared key established at build time. A
//! [`TransitHop`](transit::TransitHop) is the state kept for a circuit this
//! node merely relays. Both are owned exclusively by the
//! [`PathContext`](context::PathContext) once registered.
//!
//! Hop chaining: `hops[i].tx_id == hops[i - 1].rx_id` for every `i > 0`, so
//! each hop only ever sees its own identifier pair and the chain needs no
//! central coordinator. A path's externally visible identifiers are those
//! of its first hop.

mod build;
mod context;
mod transit;

pub use build::{build_path, handle_build_request, BuildRecord, HopCandidate};
pub use context::{spawn_reaper, HopMatch, PathContext};
pub use transit::{HopInfo, TransitHop};

use crate::crypto::{stream_transform, SymmetricKey, TunnelNonce};
use crate::error::{Error, Result};
use crate::identity::{PathID, RouterID};
use crate::routing::{RoutingMessage, RoutingMessageHandler, MAX_ROUTING_MESSAGE_SIZE};
use crate::transport::{LinkMessage, Router};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Default circuit lifetime.
pub const DEFAULT_PATH_LIFETIME: Duration = Duration::from_secs(10 * 60);

/// One hop of a locally originated path.
pub struct PathHop {
    /// The hop's router identity.
    pub router: RouterID,
    /// Identifier for traffic we transmit toward this hop.
    pub tx_id: PathID,
    /// Identifier for traffic this hop sends back to us.
    pub rx_id: PathID,
    /// How long the hop agreed to keep the circuit alive.
    pub lifetime: Duration,
    /// Key shared with this hop, established during build.
    pub shared: SymmetricKey,
}

/// A circuit this node originated.
///
/// The hop chain and shared keys are written once during build and
/// read-only afterward, so a registered `Path` is safe to share across
/// worker threads behind an [`Arc`].
pub struct Path {
    hops: Vec<PathHop>,
    build_started: Instant,
    handler: Arc<dyn RoutingMessageHandler>,
}

impl Path {
    /// Assemble a path from an already-chained hop list.
    ///
    /// Callers must uphold the chain invariant; [`build_path`] is the only
    /// public way to construct one.
    pub(crate) fn from_hops(
        hops: Vec<PathHop>,
        handler: Arc<dyn RoutingMessageHandler>,
    ) -> Result<Self> {
        if hops.is_empty() {
            return Err(Error::Build("path needs at least one hop".into()));
        }
        Ok(Self {
            hops,
            build_started: Instant::now(),
            handler,
        })
    }

    /// The path's externally visible transmit identifier.
    pub fn transmit_id(&self) -> PathID {
        self.hops[0].tx_id
    }

    /// The path's externally visible receive identifier.
    pub fn receive_id(&self) -> PathID {
        self.hops[0].rx_id
    }

    /// The first hop, toward which all outbound traffic is sent.
    pub fn upstream_router(&self) -> RouterID {
        self.hops[0].router
    }

    /// Number of hops in the chain.
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// The hop chain, first hop at index 0.
    pub fn hops(&self) -> &[PathHop] {
        &self.hops
    }

    /// Whether the circuit has outlived its first hop's lifetime.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.build_started) > self.hops[0].lifetime
    }

    /// Wrap `payload` in one encryption layer per hop and send it upstream.
    pub fn send_outbound<R: Router>(
        &self,
        mut payload: Vec<u8>,
        nonce: TunnelNonce,
        router: &R,
    ) -> Result<()> {
        for hop in &self.hops {
            stream_transform(&mut payload, &hop.shared, &nonce);
        }
        let msg = LinkMessage::RelayUpstream {
            path_id: self.transmit_id(),
            nonce,
            payload,
        };
        if !router.send_to(&self.upstream_router(), msg) {
            return Err(Error::Transport(format!(
                "upstream {} rejected relay",
                self.upstream_router()
            )));
        }
        Ok(())
    }

    /// Strip every layer from an inbound payload and dispatch the decoded
    /// routing message to the path's handler.
    ///
    /// The transform sequence is identical to the outbound one: each layer
    /// is XOR with an independently keyed keystream, so the composition is
    /// self-inverse regardless of direction.
    pub fn receive_inbound(&self, mut payload: Vec<u8>, nonce: TunnelNonce) -> Result<()> {
        for hop in &self.hops {
            stream_transform(&mut payload, &hop.shared, &nonce);
        }
        let msg = match RoutingMessage::from_bytes(&payload) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(path = %self.receive_id(), "failed to parse inbound routing message");
                return Err(e);
            }
        };
        if !self.handler.handle_message(msg, self) {
            return Err(Error::InvalidMessage("handler rejected message".into()));
        }
        Ok(())
    }

    /// Serialize a routing message, generate a fresh nonce, and send it
    /// outbound.
    ///
    /// Fails with [`Error::MessageTooLarge`] if the encoding exceeds the
    /// outbound scratch capacity.
    pub fn send_routing_message<R: Router>(
        &self,
        msg: &RoutingMessage,
        router: &R,
    ) -> Result<()> {
        let encoded = msg.to_bytes()?;
        if encoded.len() > MAX_ROUTING_MESSAGE_SIZE {
            warn!(size = encoded.len(), "routing message exceeds scratch capacity");
            return Err(Error::MessageTooLarge(encoded.len()));
        }
        self.send_outbound(encoded, TunnelNonce::random(), router)
    }
}

impl std::fmt::Debug for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Path")
            .field("tx", &self.transmit_id())
            .field("rx", &self.receive_id())
            .field("hops", &self.hops.len())
            .finish()
    }
}
