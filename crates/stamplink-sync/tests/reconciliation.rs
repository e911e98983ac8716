//! Member-side engine under paused time.

use std::sync::Arc;
use std::time::Duration;

use stamplink_canonical::MemberId;
use stamplink_core::Member;
use stamplink_ledger::{Fault, GatewayOptions, LedgerGateway, MemoryLedger};
use stamplink_sync::{EngineOptions, ReconciliationEngine, SyncBus, SyncPhase};
use tokio::time::{sleep, Instant};

fn id(raw: &str) -> MemberId {
    MemberId::parse(raw).unwrap()
}

struct Fixture {
    ledger: Arc<MemoryLedger>,
    /// The admin's gateway: commits without reaching this device's bus.
    admin: LedgerGateway,
    engine: ReconciliationEngine,
}

fn fixture(stamps: u32, max_stamps: u32) -> Fixture {
    let ledger = Arc::new(MemoryLedger::new());
    ledger.insert(Member::provisional(id("user-1"), "Ayu", stamps, max_stamps).unwrap());
    let admin = LedgerGateway::new(ledger.clone(), GatewayOptions::default());
    let member_gateway = Arc::new(LedgerGateway::new(ledger.clone(), GatewayOptions::default()));
    let initial = ledger.member(&id("user-1")).unwrap();
    let engine = ReconciliationEngine::start(
        initial,
        member_gateway,
        &SyncBus::default(),
        EngineOptions::default(),
    );
    Fixture {
        ledger,
        admin,
        engine,
    }
}

#[tokio::test(start_paused = true)]
async fn notification_is_shown_then_replaced_by_the_ledger() {
    let f = fixture(2, 10);
    let handle = f.engine.handle();
    f.admin.increment_stamps(&id("user-1"), 2).await.unwrap();

    assert!(handle.notify_stamps(2).await);
    let shown = handle.current();
    assert_eq!(shown.stamps, 4);
    assert!(shown.has_synthetic_events());
    assert_eq!(handle.current_phase(), SyncPhase::OptimisticPending);

    sleep(Duration::from_millis(1100)).await;

    let synced = handle.current();
    assert_eq!(synced, f.ledger.member(&id("user-1")).unwrap());
    assert!(!synced.has_synthetic_events());
    assert_eq!(handle.current_phase(), SyncPhase::Synced);
}

#[tokio::test(start_paused = true)]
async fn duplicate_notification_is_corrected_by_refresh() {
    let f = fixture(0, 10);
    let handle = f.engine.handle();
    f.admin.increment_stamps(&id("user-1"), 1).await.unwrap();

    assert!(handle.notify_stamps(1).await);
    assert!(handle.notify_stamps(1).await);
    assert_eq!(handle.current().stamps, 2);

    sleep(Duration::from_millis(1100)).await;
    assert_eq!(handle.current().stamps, 1);
    assert_eq!(handle.current().history.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn optimistic_balance_is_clamped_to_capacity() {
    let f = fixture(9, 10);
    let handle = f.engine.handle();
    let outcome = f.admin.increment_stamps(&id("user-1"), 3).await.unwrap();
    assert_eq!(outcome.applied, 1);

    assert!(handle.notify_stamps(3).await);
    assert_eq!(handle.current().stamps, 10);

    sleep(Duration::from_millis(1100)).await;
    assert_eq!(handle.current().stamps, 10);
    assert!(!handle.current().has_synthetic_events());
}

#[tokio::test(start_paused = true)]
async fn zero_count_is_refused_and_changes_nothing() {
    let f = fixture(2, 10);
    let handle = f.engine.handle();
    let before = handle.current();

    assert!(!handle.notify_stamps(0).await);
    assert_eq!(handle.current(), before);
    assert_eq!(handle.current_phase(), SyncPhase::Synced);
}

#[tokio::test(start_paused = true)]
async fn poll_publishes_only_when_the_record_changed() {
    let f = fixture(2, 10);
    let handle = f.engine.handle();
    let mut view = handle.view();
    view.borrow_and_update();

    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(f.ledger.calls("getUser"), 1);
    assert!(!view.has_changed().unwrap());

    f.admin.increment_stamps(&id("user-1"), 1).await.unwrap();
    sleep(Duration::from_secs(10)).await;
    assert!(view.has_changed().unwrap());
    assert_eq!(view.borrow_and_update().stamps, 3);
}

#[tokio::test(start_paused = true)]
async fn same_device_commit_refreshes_immediately() {
    let ledger = Arc::new(MemoryLedger::new());
    ledger.insert(Member::provisional(id("user-1"), "Ayu", 2, 10).unwrap());
    let bus = SyncBus::default();
    let gateway = Arc::new(
        LedgerGateway::new(ledger.clone(), GatewayOptions::default())
            .with_publisher(Arc::new(bus.clone())),
    );
    let engine = ReconciliationEngine::start(
        ledger.member(&id("user-1")).unwrap(),
        gateway.clone(),
        &bus,
        EngineOptions::default(),
    );
    let handle = engine.handle();
    let mut view = handle.view();
    let start = Instant::now();

    gateway.increment_stamps(&id("user-1"), 1).await.unwrap();
    view.wait_for(|member| member.stamps == 3).await.unwrap();

    assert!(start.elapsed() < EngineOptions::default().refresh_delay);
    assert_eq!(handle.current_phase(), SyncPhase::Synced);
}

#[tokio::test(start_paused = true)]
async fn other_members_signals_are_ignored() {
    let ledger = Arc::new(MemoryLedger::new());
    ledger.insert(Member::provisional(id("user-1"), "Ayu", 2, 10).unwrap());
    ledger.insert(Member::provisional(id("user-2"), "Budi", 0, 10).unwrap());
    let bus = SyncBus::default();
    let gateway = Arc::new(
        LedgerGateway::new(ledger.clone(), GatewayOptions::default())
            .with_publisher(Arc::new(bus.clone())),
    );
    let _engine = ReconciliationEngine::start(
        ledger.member(&id("user-1")).unwrap(),
        gateway.clone(),
        &bus,
        EngineOptions::default(),
    );

    gateway.increment_stamps(&id("user-2"), 1).await.unwrap();
    sleep(Duration::from_millis(500)).await;

    assert_eq!(ledger.calls("getUser"), 0);
}

#[tokio::test(start_paused = true)]
async fn scan_alert_clears_itself_and_leaves_phase_alone() {
    let f = fixture(2, 10);
    let handle = f.engine.handle();
    let mut alert = handle.scan_alert();
    let start = Instant::now();

    handle.raise_scan_alert();
    alert.wait_for(|raised| *raised).await.unwrap();
    assert_eq!(handle.current_phase(), SyncPhase::Synced);

    alert.wait_for(|raised| !*raised).await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert_eq!(handle.current(), f.ledger.member(&id("user-1")).unwrap());
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_stays_pending_and_retries_on_poll_interval() {
    let f = fixture(2, 10);
    let handle = f.engine.handle();
    f.admin.increment_stamps(&id("user-1"), 1).await.unwrap();
    f.ledger.inject("getUser", Fault::Unavailable);

    assert!(handle.notify_stamps(1).await);
    sleep(Duration::from_millis(1100)).await;
    assert_eq!(handle.current_phase(), SyncPhase::OptimisticPending);
    assert!(handle.current().has_synthetic_events());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(handle.current_phase(), SyncPhase::Synced);
    assert_eq!(handle.current().stamps, 3);
    assert!(!handle.current().has_synthetic_events());
}

#[tokio::test(start_paused = true)]
async fn explicit_refresh_overwrites_the_view() {
    let f = fixture(2, 10);
    let handle = f.engine.handle();
    f.admin.increment_stamps(&id("user-1"), 4).await.unwrap();

    handle.refresh().await;

    assert_eq!(handle.current().stamps, 6);
    assert_eq!(handle.current_phase(), SyncPhase::Synced);
}

#[tokio::test(start_paused = true)]
async fn stopped_engine_refuses_notifications() {
    let f = fixture(2, 10);
    let handle = f.engine.handle();
    drop(f.engine);
    tokio::task::yield_now().await;

    assert!(!handle.notify_stamps(1).await);
}
