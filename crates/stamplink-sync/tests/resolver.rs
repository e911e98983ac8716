//! Scan resolution across the three strategies.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use stamplink_canonical::MemberId;
use stamplink_core::Member;
use stamplink_ledger::{Fault, GatewayOptions, LedgerGateway, MemoryLedger};
use stamplink_peer::{HostHandler, MemoryTransport, PeerCaller, PeerHost, DEFAULT_PEER_TIMEOUT};
use stamplink_sync::{CodePayload, IdentityResolver, ResolutionSource, SyncError};

fn id(raw: &str) -> MemberId {
    MemberId::parse(raw).unwrap()
}

struct Fixture {
    ledger: Arc<MemoryLedger>,
    transport: Arc<MemoryTransport>,
    resolver: IdentityResolver,
}

fn fixture() -> Fixture {
    let ledger = Arc::new(MemoryLedger::new());
    ledger.insert(Member::provisional(id("user-1"), "Ayu", 3, 10).unwrap());
    let gateway = Arc::new(LedgerGateway::new(ledger.clone(), GatewayOptions::default()));
    let transport = Arc::new(MemoryTransport::new());
    let caller = PeerCaller::new(transport.clone(), DEFAULT_PEER_TIMEOUT);
    Fixture {
        ledger,
        transport,
        resolver: IdentityResolver::new(gateway, caller),
    }
}

struct Device {
    member: Option<Member>,
    alerts: AtomicUsize,
    alerted: tokio::sync::Notify,
}

impl Device {
    fn new(member: Option<Member>) -> Arc<Self> {
        Arc::new(Self {
            member,
            alerts: AtomicUsize::new(0),
            alerted: tokio::sync::Notify::new(),
        })
    }
}

#[async_trait]
impl HostHandler for Device {
    fn profile(&self) -> Option<Member> {
        self.member.clone()
    }

    async fn on_add_stamp(&self, _count: u32) -> bool {
        true
    }

    fn on_scan_alert(&self) {
        self.alerts.fetch_add(1, Ordering::SeqCst);
        self.alerted.notify_one();
    }
}

#[tokio::test]
async fn embedded_code_resolves_without_any_ledger_call() {
    let f = fixture();
    let member = Member::provisional(id("user-1"), "Ayu", 3, 10).unwrap();
    let raw = CodePayload::for_member(&member, None).encode();

    let resolution = f.resolver.resolve(&raw).await.unwrap();

    assert_eq!(resolution.source, ResolutionSource::Embedded);
    assert_eq!(resolution.member.stamps, 3);
    assert!(resolution.peer.is_none());
    assert_eq!(f.ledger.total_calls(), 0);
}

#[tokio::test]
async fn bare_id_resolves_through_the_ledger() {
    let f = fixture();

    let resolution = f.resolver.resolve("user-1").await.unwrap();

    assert_eq!(resolution.source, ResolutionSource::Ledger);
    assert_eq!(resolution.member.name, "Ayu");
    assert_eq!(f.ledger.calls("getUser"), 1);
}

#[tokio::test]
async fn id_without_embedded_fields_resolves_through_the_ledger() {
    let f = fixture();
    let raw = json!({"id": "user-1", "n": "", "s": "three"}).to_string();

    let resolution = f.resolver.resolve(&raw).await.unwrap();

    assert_eq!(resolution.source, ResolutionSource::Ledger);
    assert_eq!(resolution.member.stamps, 3);
}

#[tokio::test]
async fn unknown_member_and_outage_are_distinct() {
    let f = fixture();
    assert!(matches!(
        f.resolver.resolve("user-404").await,
        Err(SyncError::NotFound(_))
    ));

    f.ledger.inject("getUser", Fault::Unavailable);
    assert!(matches!(
        f.resolver.resolve("user-1").await,
        Err(SyncError::Network(_))
    ));
}

#[tokio::test]
async fn peer_only_code_asks_the_device() {
    let f = fixture();
    let profile = Member::provisional(id("user-9"), "Dewi", 6, 10).unwrap();
    let device = Device::new(Some(profile.clone()));
    let host = PeerHost::start(f.transport.as_ref(), device.clone()).await.unwrap();
    let raw = json!({"pid": host.session_id().as_str()}).to_string();

    let resolution = f.resolver.resolve(&raw).await.unwrap();

    assert_eq!(resolution.source, ResolutionSource::Peer);
    assert_eq!(resolution.member, profile);
    assert_eq!(resolution.peer.as_ref(), Some(host.session_id()));
    assert_eq!(f.ledger.total_calls(), 0);
}

#[tokio::test]
async fn device_without_profile_is_unreachable() {
    let f = fixture();
    let device = Device::new(None);
    let host = PeerHost::start(f.transport.as_ref(), device).await.unwrap();
    let raw = json!({"pid": host.session_id().as_str()}).to_string();

    assert!(matches!(
        f.resolver.resolve(&raw).await,
        Err(SyncError::PeerUnreachable(_))
    ));
}

#[tokio::test]
async fn closed_peer_session_is_unreachable() {
    let f = fixture();
    let raw = json!({"pid": "9b2f4e0c-6a43-4c6e-9d55-0f4a0c1b7e21"}).to_string();

    let err = f.resolver.resolve(&raw).await.unwrap_err();
    assert!(matches!(err, SyncError::PeerUnreachable(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unusable_codes_are_malformed() {
    let f = fixture();
    for raw in ["hello there", "[1, 2, 3]", "{\"n\": \"Ayu\"}", ""] {
        assert!(
            matches!(f.resolver.resolve(raw).await, Err(SyncError::Malformed(_))),
            "{raw:?} should be malformed"
        );
    }
    assert_eq!(f.ledger.total_calls(), 0);
}

#[tokio::test]
async fn scan_alert_reaches_the_device() {
    let f = fixture();
    let member = Member::provisional(id("user-1"), "Ayu", 3, 10).unwrap();
    let device = Device::new(Some(member.clone()));
    let host = PeerHost::start(f.transport.as_ref(), device.clone()).await.unwrap();
    let raw = CodePayload::for_member(&member, Some(host.session_id())).encode();

    let resolution = f.resolver.resolve(&raw).await.unwrap();
    assert_eq!(resolution.source, ResolutionSource::Embedded);

    tokio::time::timeout(Duration::from_secs(5), device.alerted.notified())
        .await
        .expect("scan alert not delivered");
    assert_eq!(device.alerts.load(Ordering::SeqCst), 1);
}
