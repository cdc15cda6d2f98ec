//! State held for circuits this node relays but did not originate.

use crate::identity::{PathID, RouterID};
use std::time::{Duration, Instant};

/// Description of one hop's role in a circuit.
///
/// Immutable after creation. Equality over every field is what detects
/// duplicate or replayed build requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopInfo {
    /// The hop's own router identity.
    pub router: RouterID,
    /// Neighbor toward the path originator.
    pub upstream: RouterID,
    /// Neighbor away from the originator; `None` at the terminal hop.
    pub downstream: Option<RouterID>,
    /// Identifier for traffic arriving from upstream.
    pub tx_id: PathID,
    /// Identifier for traffic arriving from downstream.
    pub rx_id: PathID,
    /// Agreed circuit lifetime.
    pub lifetime: Duration,
}

/// A circuit this node relays for another participant.
///
/// Passive data holder: expiry check and [`HopInfo`] equality only. Relay
/// forwarding for transit traffic is driven by registry lookups dispatching
/// into the link layer.
#[derive(Debug)]
pub struct TransitHop {
    /// The hop description received in the build request.
    pub info: HopInfo,
    registered_at: Instant,
}

impl TransitHop {
    /// Register a hop now.
    pub fn new(info: HopInfo) -> Self {
        Self {
            info,
            registered_at: Instant::now(),
        }
    }

    /// Whether the hop has outlived its agreed lifetime.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.registered_at) > self.info.lifetime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::testutil::random_router_id;

    fn info(lifetime: Duration) -> HopInfo {
        HopInfo {
            router: random_router_id(),
            upstream: random_router_id(),
            downstream: None,
            tx_id: PathID::random(),
            rx_id: PathID::random(),
            lifetime,
        }
    }

    #[test]
    fn test_expiry() {
        let hop = TransitHop::new(info(Duration::from_secs(3600)));
        let now = Instant::now();
        assert!(!hop.is_expired(now));
        assert!(hop.is_expired(now + Duration::from_secs(2 * 3600)));
    }

    #[test]
    fn test_info_equality_detects_duplicates() {
        let a = info(Duration::from_secs(60));
        let b = a.clone();
        assert_eq!(a, b);

        let mut c = a.clone();
        c.tx_id = PathID::random();
        assert_ne!(a, c);
    }
}
