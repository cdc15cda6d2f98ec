//! Process-wide circuit registry and relay coordination.
//!
//! The [`PathContext`] is the sole owner of all circuit state on this node:
//! the only component that creates and destroys [`Path`] and [`TransitHop`]
//! entries. Own paths and transit paths live in independent multimaps under
//! independent locks, so originate-side and relay-side operations never
//! contend with each other.
//!
//! A single identifier may map to several entries (uniqueness is only
//! probabilistic); lookups disambiguate with a caller-supplied predicate,
//! typically "does this entry's neighbor equal the router the packet came
//! from". Lookup results are cloned [`Arc`]s, so an entry reaped while a
//! worker still holds a reference stays alive until that worker is done.

use crate::crypto::{EncryptedFrame, X25519SecretKey};
use crate::error::{Error, Result};
use crate::identity::{PathID, RouterID};
use crate::path::{HopInfo, Path, TransitHop};
use crate::transport::{LinkMessage, Router};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A PathID-keyed multimap guarded by its own lock.
type EntryMap<T> = Mutex<HashMap<PathID, Vec<Arc<T>>>>;

fn lock<T>(map: &Mutex<T>) -> MutexGuard<'_, T> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

fn map_put<T>(map: &EntryMap<T>, key: PathID, value: Arc<T>) {
    lock(map).entry(key).or_default().push(value);
}

fn map_get<T>(map: &EntryMap<T>, key: &PathID, check: impl Fn(&T) -> bool) -> Option<Arc<T>> {
    lock(map)
        .get(key)?
        .iter()
        .find(|entry| check(entry.as_ref()))
        .cloned()
}

fn map_has<T>(map: &EntryMap<T>, key: &PathID, check: impl Fn(&T) -> bool) -> bool {
    lock(map)
        .get(key)
        .is_some_and(|entries| entries.iter().any(|entry| check(entry.as_ref())))
}

/// Result of resolving an identifier to a circuit handler.
#[derive(Debug, Clone)]
pub enum HopMatch {
    /// A circuit this node originated.
    Own(Arc<Path>),
    /// A circuit this node relays.
    Transit(Arc<TransitHop>),
}

/// Process-wide registry of all circuits this node originates or relays.
pub struct PathContext<R: Router> {
    router: Arc<R>,
    own_paths: EntryMap<Path>,
    transit_paths: EntryMap<TransitHop>,
    allow_transit: bool,
}

impl<R: Router> PathContext<R> {
    /// Create a registry for `router`.
    ///
    /// `allow_transit` is fixed for the registry's lifetime; a node that
    /// does not allow transit rejects every incoming build request.
    pub fn new(router: Arc<R>, allow_transit: bool) -> Self {
        Self {
            router,
            own_paths: Mutex::new(HashMap::new()),
            transit_paths: Mutex::new(HashMap::new()),
            allow_transit,
        }
    }

    /// Whether this node accepts transit circuits at all.
    pub fn is_allowing_transit(&self) -> bool {
        self.allow_transit
    }

    /// The owning router facade.
    pub fn router(&self) -> &R {
        self.router.as_ref()
    }

    /// This node's public router identity.
    pub fn our_router_id(&self) -> &RouterID {
        self.router.our_id()
    }

    /// This node's long-term encryption secret key.
    pub fn encryption_secret(&self) -> &X25519SecretKey {
        self.router.encryption_secret()
    }

    /// Whether a build or relay request terminates at this node.
    pub fn is_hop_for_us(&self, router: &RouterID) -> bool {
        router == self.router.our_id()
    }

    /// Register a newly built path under both its identifiers.
    ///
    /// No uniqueness check: callers rely on identifiers being drawn from a
    /// 128-bit random space.
    pub fn add_own_path(&self, path: Arc<Path>) {
        map_put(&self.own_paths, path.transmit_id(), path.clone());
        map_put(&self.own_paths, path.receive_id(), path);
    }

    /// Register a transit hop under both its identifiers. From this point
    /// on the node forwards traffic for the circuit.
    pub fn put_transit_hop(&self, hop: Arc<TransitHop>) {
        map_put(&self.transit_paths, hop.info.tx_id, hop.clone());
        map_put(&self.transit_paths, hop.info.rx_id, hop);
    }

    /// Whether a transit entry with exactly this hop description exists.
    /// Used to detect duplicate or replayed build requests.
    pub fn has_transit_hop(&self, info: &HopInfo) -> bool {
        map_has(&self.transit_paths, &info.tx_id, |hop| hop.info == *info)
    }

    /// Resolve `id` for traffic arriving from `remote` on the upstream
    /// side. Own paths are checked first: a node can originate and relay
    /// at the same time, and its own circuits take precedence.
    pub fn get_by_upstream(&self, remote: &RouterID, id: PathID) -> Option<HopMatch> {
        if let Some(path) = map_get(&self.own_paths, &id, |p| p.upstream_router() == *remote) {
            return Some(HopMatch::Own(path));
        }
        map_get(&self.transit_paths, &id, |hop| hop.info.upstream == *remote)
            .map(HopMatch::Transit)
    }

    /// Resolve `id` for traffic arriving from `remote` on the downstream
    /// side. Only transit circuits have a downstream; the originator is
    /// always the last logical node of its own paths.
    pub fn get_by_downstream(&self, remote: &RouterID, id: PathID) -> Option<Arc<TransitHop>> {
        map_get(&self.transit_paths, &id, |hop| {
            hop.info.downstream == Some(*remote)
        })
    }

    /// Drain a queue of build frames into one construction message and send
    /// it to the next hop. The queue is empty on return even on failure;
    /// transport rejection is not retried here.
    pub fn forward_build_request(
        &self,
        next_hop: &RouterID,
        frames: &mut VecDeque<EncryptedFrame>,
    ) -> Result<()> {
        info!(next_hop = %next_hop, frames = frames.len(), "forwarding path build request");
        let msg = LinkMessage::PathBuild {
            frames: frames.drain(..).collect(),
        };
        if !self.router.send_to(next_hop, msg) {
            return Err(Error::Transport(format!(
                "next hop {} rejected build request",
                next_hop
            )));
        }
        Ok(())
    }

    /// Remove every transit entry whose age exceeds its lifetime.
    ///
    /// Two-phase under one lock acquisition: collect expired entries during
    /// the scan, then erase them under both their identifiers. Never
    /// mutates the map mid-scan. Own paths are not swept here; see
    /// [`remove_expired_own_paths`](Self::remove_expired_own_paths).
    ///
    /// Returns the number of circuits reaped.
    pub fn expire_and_reap(&self, now: Instant) -> usize {
        let mut map = lock(&self.transit_paths);

        let mut expired: Vec<Arc<TransitHop>> = Vec::new();
        for entries in map.values() {
            for hop in entries {
                if hop.is_expired(now) && !expired.iter().any(|e| Arc::ptr_eq(e, hop)) {
                    expired.push(hop.clone());
                }
            }
        }

        for hop in &expired {
            info!(tx = %hop.info.tx_id, rx = %hop.info.rx_id, "transit path expired");
            for key in [hop.info.tx_id, hop.info.rx_id] {
                if let Some(entries) = map.get_mut(&key) {
                    entries.retain(|e| !Arc::ptr_eq(e, hop));
                    if entries.is_empty() {
                        map.remove(&key);
                    }
                }
            }
        }

        expired.len()
    }

    /// Remove every own path whose age exceeds its lifetime.
    ///
    /// Kept separate from the transit sweep so a router can schedule the
    /// two independently; own paths otherwise expire lazily through
    /// [`Path::is_expired`] checks at their call sites.
    pub fn remove_expired_own_paths(&self, now: Instant) -> usize {
        let mut map = lock(&self.own_paths);

        let mut expired: Vec<Arc<Path>> = Vec::new();
        for entries in map.values() {
            for path in entries {
                if path.is_expired(now) && !expired.iter().any(|e| Arc::ptr_eq(e, path)) {
                    expired.push(path.clone());
                }
            }
        }

        for path in &expired {
            debug!(tx = %path.transmit_id(), "own path expired");
            for key in [path.transmit_id(), path.receive_id()] {
                if let Some(entries) = map.get_mut(&key) {
                    entries.retain(|e| !Arc::ptr_eq(e, path));
                    if entries.is_empty() {
                        map.remove(&key);
                    }
                }
            }
        }

        expired.len()
    }
}

/// Run the transit expiration sweep on a fixed interval until aborted.
pub fn spawn_reaper<R: Router>(
    ctx: Arc<PathContext<R>>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let reaped = ctx.expire_and_reap(Instant::now());
            if reaped > 0 {
                debug!(reaped, "expiration sweep");
            }
        }
    })
}
