//! End-to-end path layer scenarios: build a multi-hop circuit across
//! several simulated routers, then move traffic through it in both
//! directions, with each relay stripping or adding exactly its own layer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use veilnet_core::crypto::{
    derive_shared_secret, random_bytes, stream_transform, SymmetricKey, TunnelNonce,
    X25519PublicKey, X25519SecretKey,
};
use veilnet_core::identity::RouterID;
use veilnet_core::path::{
    build_path, handle_build_request, BuildRecord, HopCandidate, Path, PathContext,
};
use veilnet_core::routing::{RoutingMessage, RoutingMessageHandler};
use veilnet_core::transport::{LinkMessage, Router};

/// In-memory router that records outbound link messages.
struct TestRouter {
    id: RouterID,
    secret: X25519SecretKey,
    sent: Mutex<Vec<(RouterID, LinkMessage)>>,
}

impl TestRouter {
    fn new() -> Self {
        Self {
            id: RouterID::from_bytes(random_bytes()),
            secret: X25519SecretKey::random(),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn public_key(&self) -> X25519PublicKey {
        self.secret.public_key()
    }

    fn take_sent(&self) -> Vec<(RouterID, LinkMessage)> {
        std::mem::take(&mut *self.sent.lock().expect("lock"))
    }
}

impl Router for TestRouter {
    fn send_to(&self, target: &RouterID, msg: LinkMessage) -> bool {
        self.sent.lock().expect("lock").push((*target, msg));
        true
    }

    fn our_id(&self) -> &RouterID {
        &self.id
    }

    fn encryption_secret(&self) -> &X25519SecretKey {
        &self.secret
    }
}

struct CollectingHandler {
    received: Mutex<Vec<RoutingMessage>>,
}

impl CollectingHandler {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            received: Mutex::new(Vec::new()),
        })
    }
}

impl RoutingMessageHandler for CollectingHandler {
    fn handle_message(&self, msg: RoutingMessage, _path: &Path) -> bool {
        self.received.lock().expect("lock").push(msg);
        true
    }
}

/// Pull the frame queue out of a captured PathBuild message.
fn build_frames(msg: LinkMessage) -> VecDeque<veilnet_core::crypto::EncryptedFrame> {
    match msg {
        LinkMessage::PathBuild { frames } => frames.into(),
        other => panic!("expected PathBuild, got {:?}", other),
    }
}

#[test]
fn three_hop_circuit_builds_and_carries_traffic() {
    let lifetime = Duration::from_secs(3600);

    // One originator, three relays, each its own process in spirit
    let origin_router = Arc::new(TestRouter::new());
    let relays: Vec<Arc<TestRouter>> = (0..3).map(|_| Arc::new(TestRouter::new())).collect();
    let relay_ctxs: Vec<PathContext<TestRouter>> = relays
        .iter()
        .map(|r| PathContext::new(r.clone(), true))
        .collect();

    let candidates: Vec<HopCandidate> = relays
        .iter()
        .map(|r| HopCandidate {
            router: *r.our_id(),
            encryption_key: r.public_key(),
        })
        .collect();

    let origin_ctx = PathContext::new(origin_router.clone(), false);
    let handler = CollectingHandler::new();
    let (path, mut frames) = build_path(
        origin_router.our_id(),
        &candidates,
        lifetime,
        handler.clone(),
    )
    .expect("build");
    assert_eq!(path.upstream_router(), *relays[0].our_id());

    // Each relay will need its layer key for the traffic simulation; a
    // real relay derives it while accepting the build. Recover it from the
    // sealed records before they are consumed.
    let relay_keys: Vec<SymmetricKey> = relays
        .iter()
        .zip(frames.iter())
        .map(|(relay, frame)| {
            let record = BuildRecord::from_bytes(
                &frame.open(relay.encryption_secret()).expect("open"),
            )
            .expect("decode");
            let shared = derive_shared_secret(relay.encryption_secret(), &record.ephemeral);
            SymmetricKey::derive(&shared).expect("derive")
        })
        .collect();

    let path = Arc::new(path);
    origin_ctx.add_own_path(path.clone());

    // Relay the construction message hop by hop
    origin_ctx
        .forward_build_request(&path.upstream_router(), &mut frames)
        .expect("forward");

    let mut sender = *origin_router.our_id();
    let mut outbox = origin_router.take_sent();
    for (i, ctx) in relay_ctxs.iter().enumerate() {
        assert_eq!(outbox.len(), 1, "hop {} should receive one message", i);
        let (target, msg) = outbox.remove(0);
        assert_eq!(target, *relays[i].our_id());

        handle_build_request(ctx, sender, build_frames(msg)).expect("accept build");

        sender = *relays[i].our_id();
        outbox = relays[i].take_sent();
    }
    // Terminal relay forwards nothing
    assert!(outbox.is_empty());

    // Every relay holds a transit entry reachable from its upstream
    for (i, ctx) in relay_ctxs.iter().enumerate() {
        let upstream = if i == 0 {
            *origin_router.our_id()
        } else {
            *relays[i - 1].our_id()
        };
        let id = path.hops()[i].tx_id;
        assert!(
            ctx.get_by_upstream(&upstream, id).is_some(),
            "relay {} should know the circuit",
            i
        );
    }

    // Outbound: originator wraps three layers, relays strip one each
    let request = RoutingMessage::Data {
        payload: b"fetch the hidden page".to_vec(),
    };
    path.send_routing_message(&request, origin_router.as_ref())
        .expect("send");

    let (target, msg) = origin_router.take_sent().remove(0);
    assert_eq!(target, *relays[0].our_id());
    let (mut payload, nonce) = match msg {
        LinkMessage::RelayUpstream {
            path_id,
            nonce,
            payload,
        } => {
            assert_eq!(path_id, path.transmit_id());
            (payload, nonce)
        }
        other => panic!("expected RelayUpstream, got {:?}", other),
    };

    for key in &relay_keys {
        stream_transform(&mut payload, key, &nonce);
    }
    let at_exit = RoutingMessage::from_bytes(&payload).expect("exit sees plaintext");
    assert_eq!(at_exit, request);

    // Inbound: the exit replies, each relay adds its layer on the way back,
    // and the originator strips them all at once
    let reply = RoutingMessage::Data {
        payload: b"here is the hidden page".to_vec(),
    };
    let mut reply_bytes = reply.to_bytes().expect("encode");
    let reply_nonce = TunnelNonce::random();
    for key in relay_keys.iter().rev() {
        stream_transform(&mut reply_bytes, key, &reply_nonce);
    }

    path.receive_inbound(reply_bytes, reply_nonce)
        .expect("receive");
    let received = handler.received.lock().expect("lock");
    assert_eq!(received.as_slice(), &[reply]);
}

#[test]
fn non_transit_relay_refuses_circuit() {
    let origin = Arc::new(TestRouter::new());
    let relay = Arc::new(TestRouter::new());
    let relay_ctx = PathContext::new(relay.clone(), false);

    let candidates = vec![HopCandidate {
        router: *relay.our_id(),
        encryption_key: relay.public_key(),
    }];
    let (_path, frames) = build_path(
        origin.our_id(),
        &candidates,
        Duration::from_secs(600),
        CollectingHandler::new(),
    )
    .expect("build");

    assert!(handle_build_request(&relay_ctx, *origin.our_id(), frames).is_err());
    assert!(!relay_ctx.is_allowing_transit());
}
