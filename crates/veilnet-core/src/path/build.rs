//! Path construction and transit-side build acceptance.
//!
//! The originator picks an ordered list of hops, allocates a fresh
//! identifier pair per hop, and chains them so `hops[i].tx_id ==
//! hops[i - 1].rx_id`. One sealed [`BuildRecord`] per hop travels in the
//! build request; each relay opens exactly the first frame, registers a
//! [`TransitHop`], and forwards the remainder downstream. No hop ever
//! learns more than its own identifier pair and immediate neighbors.

use crate::crypto::{EncryptedFrame, EphemeralKeypair, SymmetricKey, X25519PublicKey};
use crate::error::{Error, Result};
use crate::identity::{PathID, RouterID};
use crate::path::{HopInfo, Path, PathContext, PathHop, TransitHop};
use crate::routing::RoutingMessageHandler;
use crate::transport::Router;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A hop chosen by the (external) path selection policy.
#[derive(Debug, Clone)]
pub struct HopCandidate {
    /// The hop's router identity.
    pub router: RouterID,
    /// The hop's long-term encryption key, used to seal its build record
    /// and to establish the per-hop shared key.
    pub encryption_key: X25519PublicKey,
}

/// The per-hop payload of a build request, readable only by its hop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRecord {
    /// The router this record is addressed to.
    pub router: RouterID,
    /// Identifier for traffic arriving from upstream.
    pub tx_id: PathID,
    /// Identifier for traffic arriving from downstream.
    pub rx_id: PathID,
    /// Neighbor toward the path originator.
    pub upstream: RouterID,
    /// Neighbor away from the originator; `None` at the terminal hop.
    pub downstream: Option<RouterID>,
    /// Requested circuit lifetime.
    pub lifetime: Duration,
    /// Originator's ephemeral public key for the per-hop key exchange.
    pub ephemeral: X25519PublicKey,
}

impl BuildRecord {
    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Encoding(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Encoding(e.to_string()))
    }
}

/// Build a path over `candidates`, establishing one shared key per hop.
///
/// Returns the path (hop chain plus keys) and the ordered frame queue to
/// hand to [`PathContext::forward_build_request`] addressed at the first
/// hop. `our_id` becomes the first hop's upstream neighbor.
pub fn build_path(
    our_id: &RouterID,
    candidates: &[HopCandidate],
    lifetime: Duration,
    handler: Arc<dyn RoutingMessageHandler>,
) -> Result<(Path, VecDeque<EncryptedFrame>)> {
    if candidates.is_empty() {
        return Err(Error::Build("path needs at least one hop".into()));
    }

    let n = candidates.len();
    let mut tx_ids: Vec<PathID> = (0..n).map(|_| PathID::random()).collect();
    let rx_ids: Vec<PathID> = (0..n).map(|_| PathID::random()).collect();
    // Chain the hops: each hop's transmit id is its predecessor's receive id
    for i in (1..n).rev() {
        tx_ids[i] = rx_ids[i - 1];
    }

    let mut hops = Vec::with_capacity(n);
    let mut frames = VecDeque::with_capacity(n);
    for (i, candidate) in candidates.iter().enumerate() {
        let ephemeral = EphemeralKeypair::generate();
        let shared = SymmetricKey::derive(&ephemeral.diffie_hellman(&candidate.encryption_key))?;

        let record = BuildRecord {
            router: candidate.router,
            tx_id: tx_ids[i],
            rx_id: rx_ids[i],
            upstream: if i == 0 {
                *our_id
            } else {
                candidates[i - 1].router
            },
            downstream: candidates.get(i + 1).map(|c| c.router),
            lifetime,
            ephemeral: *ephemeral.public_key(),
        };
        frames.push_back(EncryptedFrame::seal(
            &record.to_bytes()?,
            &candidate.encryption_key,
        )?);

        hops.push(PathHop {
            router: candidate.router,
            tx_id: tx_ids[i],
            rx_id: rx_ids[i],
            lifetime,
            shared,
        });
    }

    let path = Path::from_hops(hops, handler)?;
    debug!(tx = %path.transmit_id(), hops = n, "built path");
    Ok((path, frames))
}

/// Accept a build request arriving from `from` at a relay.
///
/// Opens the first frame with our encryption key, registers the transit
/// hop, and forwards the remaining frames downstream when the record names
/// a downstream neighbor. Duplicate requests (an identical hop already
/// registered) succeed without re-registering.
pub fn handle_build_request<R: Router>(
    ctx: &PathContext<R>,
    from: RouterID,
    mut frames: VecDeque<EncryptedFrame>,
) -> Result<()> {
    if !ctx.is_allowing_transit() {
        warn!(from = %from, "rejecting build request: transit disabled");
        return Err(Error::Build("transit not allowed".into()));
    }

    let frame = frames
        .pop_front()
        .ok_or_else(|| Error::Build("build request carried no frames".into()))?;
    let record = BuildRecord::from_bytes(&frame.open(ctx.encryption_secret())?)?;

    if !ctx.is_hop_for_us(&record.router) {
        return Err(Error::Build("record addressed to another router".into()));
    }
    if record.upstream != from {
        return Err(Error::Build("claimed upstream does not match sender".into()));
    }
    if record.downstream.is_some() && frames.is_empty() {
        return Err(Error::Build("no frames left for downstream hop".into()));
    }

    let info = HopInfo {
        router: record.router,
        upstream: record.upstream,
        downstream: record.downstream,
        tx_id: record.tx_id,
        rx_id: record.rx_id,
        lifetime: record.lifetime,
    };
    if ctx.has_transit_hop(&info) {
        debug!(tx = %info.tx_id, "duplicate build request, already registered");
        return Ok(());
    }

    let downstream = info.downstream;
    ctx.put_transit_hop(Arc::new(TransitHop::new(info)));

    match downstream {
        Some(next) => ctx.forward_build_request(&next, &mut frames),
        None => {
            info!(from = %from, "registered terminal transit hop");
            Ok(())
        }
    }
}
