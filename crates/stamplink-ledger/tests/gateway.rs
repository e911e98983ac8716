//! Gateway behavior against the in-process ledger.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use stamplink_canonical::MemberId;
use stamplink_core::{Checkpoint, CheckpointConfig, Member, ModelError};
use stamplink_ledger::{
    Envelope, Fault, GatewayOptions, LedgerError, LedgerGateway, LedgerRequest, LedgerTransport,
    MemoryLedger, Registration, UpdatePublisher,
};

fn id(raw: &str) -> MemberId {
    MemberId::parse(raw).unwrap()
}

fn seeded(stamps: u32, max_stamps: u32) -> Arc<MemoryLedger> {
    let ledger = Arc::new(MemoryLedger::new());
    ledger.insert(Member::provisional(id("user-1"), "Ayu", stamps, max_stamps).unwrap());
    ledger
}

fn gateway(ledger: &Arc<MemoryLedger>) -> LedgerGateway {
    let options = GatewayOptions {
        busy_backoff: Duration::from_millis(10),
        ..GatewayOptions::default()
    };
    LedgerGateway::new(ledger.clone(), options)
}

#[derive(Default)]
struct Recorder(Mutex<Vec<MemberId>>);

impl UpdatePublisher for Recorder {
    fn ledger_updated(&self, member_id: &MemberId) {
        self.0.lock().push(member_id.clone());
    }
}

/// Passes calls through to a ledger and keeps a copy of each request.
struct Tap {
    ledger: MemoryLedger,
    seen: Mutex<Vec<LedgerRequest>>,
}

#[async_trait]
impl LedgerTransport for Tap {
    async fn call(&self, request: LedgerRequest) -> Result<Envelope, LedgerError> {
        self.seen.lock().push(request.clone());
        self.ledger.call(request).await
    }
}

#[tokio::test]
async fn increment_applies_every_unit_when_room_remains() {
    let ledger = seeded(2, 10);
    let outcome = gateway(&ledger)
        .increment_stamps(&id("user-1"), 3)
        .await
        .unwrap();

    assert_eq!(outcome.applied, 3);
    assert!(!outcome.is_partial());
    assert!(outcome.stopped_by.is_none());
    assert_eq!(outcome.member.stamps, 5);
    assert_eq!(ledger.calls("addStamp"), 3);
    assert_eq!(ledger.member(&id("user-1")).unwrap().history.len(), 3);
}

#[tokio::test]
async fn cap_stops_the_loop_without_further_calls() {
    let ledger = seeded(8, 10);
    let outcome = gateway(&ledger)
        .increment_stamps(&id("user-1"), 5)
        .await
        .unwrap();

    assert_eq!(outcome.applied, 2);
    assert!(outcome.is_partial());
    assert_eq!(outcome.stopped_by, Some(LedgerError::CapReached));
    assert_eq!(outcome.member.stamps, 10);
    // Two applied units plus the one rejected attempt.
    assert_eq!(ledger.calls("addStamp"), 3);
}

#[tokio::test]
async fn full_card_is_an_error_when_nothing_applied() {
    let ledger = seeded(10, 10);
    let err = gateway(&ledger)
        .increment_stamps(&id("user-1"), 1)
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::CapReached);
    assert_eq!(ledger.calls("addStamp"), 1);
}

#[tokio::test]
async fn zero_count_is_rejected_before_any_call() {
    let ledger = seeded(0, 10);
    let err = gateway(&ledger)
        .increment_stamps(&id("user-1"), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidRequest(_)));
    assert_eq!(ledger.total_calls(), 0);
}

#[tokio::test]
async fn unknown_member_is_not_found() {
    let ledger = seeded(0, 10);
    let gateway = gateway(&ledger);

    let err = gateway.increment_stamps(&id("user-404"), 2).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
    assert_eq!(ledger.calls("addStamp"), 1);

    let err = gateway.get_member(&id("user-404")).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn busy_units_are_retried() {
    let ledger = seeded(0, 10);
    ledger.inject("addStamp", Fault::Busy);
    ledger.inject("addStamp", Fault::Busy);

    let outcome = gateway(&ledger)
        .increment_stamps(&id("user-1"), 2)
        .await
        .unwrap();
    assert_eq!(outcome.applied, 2);
    assert_eq!(ledger.calls("addStamp"), 4);
}

#[tokio::test(start_paused = true)]
async fn busy_beyond_the_retry_limit_stops_the_loop() {
    let ledger = seeded(0, 10);
    let gateway = gateway(&ledger);
    ledger.inject("addStamp", Fault::Busy);

    let outcome = gateway.increment_stamps(&id("user-1"), 2).await.unwrap();
    assert_eq!(outcome.applied, 2);

    for _ in 0..3 {
        ledger.inject("addStamp", Fault::Busy);
    }
    let err = gateway.increment_stamps(&id("user-1"), 1).await.unwrap_err();
    assert!(matches!(err, LedgerError::Busy(_)));
    assert_eq!(ledger.member(&id("user-1")).unwrap().stamps, 2);
}

#[tokio::test]
async fn network_failure_mid_loop_keeps_applied_units() {
    let ledger = seeded(0, 10);
    let gateway = gateway(&ledger);

    gateway.increment_stamps(&id("user-1"), 1).await.unwrap();
    ledger.inject("addStamp", Fault::Unavailable);
    let err = gateway.increment_stamps(&id("user-1"), 3).await.unwrap_err();
    assert!(matches!(err, LedgerError::Network(_)));
    assert_eq!(ledger.member(&id("user-1")).unwrap().stamps, 1);
}

#[tokio::test]
async fn every_applied_unit_is_published() {
    let ledger = seeded(8, 10);
    let recorder = Arc::new(Recorder::default());
    let gateway = gateway(&ledger).with_publisher(recorder.clone());

    gateway.increment_stamps(&id("user-1"), 4).await.unwrap();
    assert_eq!(recorder.0.lock().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_identical_reads_issue_one_request() {
    let ledger = seeded(3, 10);
    ledger.set_latency(Duration::from_millis(100));
    let gateway = gateway(&ledger);
    let member = id("user-1");

    let (a, b, c) = tokio::join!(
        gateway.get_member(&member),
        gateway.get_member(&member),
        gateway.get_member(&member),
    );
    assert_eq!(a.unwrap().stamps, 3);
    assert_eq!(b.unwrap().stamps, 3);
    assert_eq!(c.unwrap().stamps, 3);
    assert_eq!(ledger.calls("getUser"), 1);

    gateway.get_member(&member).await.unwrap();
    assert_eq!(ledger.calls("getUser"), 2);
}

#[tokio::test]
async fn empty_ledger_lists_no_members() {
    let ledger = Arc::new(MemoryLedger::new());
    assert!(gateway(&ledger).get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn history_reflects_committed_stamps() {
    let ledger = seeded(0, 10);
    let gateway = gateway(&ledger);
    gateway.increment_stamps(&id("user-1"), 2).await.unwrap();

    let history = gateway.get_history(&id("user-1")).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|e| !e.is_synthetic()));
}

#[tokio::test]
async fn invalid_config_never_reaches_the_ledger() {
    let ledger = seeded(0, 10);
    let config = CheckpointConfig {
        max_stamps: 10,
        checkpoints: vec![
            Checkpoint {
                stamp_count: 3,
                reward: "Tea".into(),
            },
            Checkpoint {
                stamp_count: 3,
                reward: "Fries".into(),
            },
        ],
    };

    let err = gateway(&ledger).save_config(&config).await.unwrap_err();
    assert_eq!(
        err,
        LedgerError::InvalidConfig(ModelError::DuplicateCheckpoint(3))
    );
    assert_eq!(ledger.total_calls(), 0);
}

#[tokio::test]
async fn saved_config_is_normalized_and_served_fresh() {
    let ledger = seeded(0, 10);
    let gateway = gateway(&ledger);
    let config = CheckpointConfig {
        max_stamps: 8,
        checkpoints: vec![
            Checkpoint {
                stamp_count: 8,
                reward: " Day pass ".into(),
            },
            Checkpoint {
                stamp_count: 4,
                reward: "Tea".into(),
            },
        ],
    };

    gateway.save_config(&config).await.unwrap();
    let stored = ledger.config();
    assert_eq!(stored.checkpoints[0].stamp_count, 4);
    assert_eq!(stored.checkpoints[1].reward, "Day pass");

    let lookup = gateway.get_config().unwrap();
    assert!(!lookup.is_stale);
    assert_eq!(lookup.value, stored);
    assert_eq!(ledger.calls("getCheckpointConfig"), 0);
}

#[tokio::test(start_paused = true)]
async fn config_is_served_stale_while_revalidating() {
    let ledger = seeded(0, 10);
    let gateway = gateway(&ledger);

    let cold = gateway.get_config().unwrap();
    assert!(cold.is_stale);
    assert_eq!(cold.value, CheckpointConfig::default());

    tokio::time::sleep(Duration::from_millis(1)).await;
    let warm = gateway.get_config().unwrap();
    assert!(!warm.is_stale);
    assert_eq!(ledger.calls("getCheckpointConfig"), 1);

    tokio::time::sleep(gateway.options().config_ttl).await;
    let stale = gateway.get_config().unwrap();
    assert!(stale.is_stale);
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(ledger.calls("getCheckpointConfig"), 2);
}

#[tokio::test]
async fn register_then_login_by_local_phone() {
    let ledger = Arc::new(MemoryLedger::new());
    let gateway = gateway(&ledger);
    let registration = Registration {
        name: "Budi".into(),
        email: "budi@example.com".into(),
        phone: "0812-3456-7890".into(),
        address: "Jl. Merdeka 1".into(),
        birth_date: "1999-04-01".into(),
    };

    let member = gateway.register(&registration).await.unwrap();
    assert_eq!(member.phone, "6281234567890");
    assert_eq!(member.stamps, 0);

    let logged_in = gateway.login("+62 812 3456 7890", "1999-04-01").await.unwrap();
    assert_eq!(logged_in.id, member.id);

    let err = gateway.login("081234567890", "2000-01-01").await.unwrap_err();
    assert!(matches!(err, LedgerError::Rejected(_)));

    let err = gateway.register(&registration).await.unwrap_err();
    assert!(matches!(err, LedgerError::Rejected(_)));
}

#[tokio::test]
async fn register_sends_a_client_minted_id() {
    let tap = Arc::new(Tap {
        ledger: MemoryLedger::new(),
        seen: Mutex::new(Vec::new()),
    });
    let gateway = LedgerGateway::new(tap.clone(), GatewayOptions::default());
    let registration = Registration {
        name: "Citra".into(),
        email: String::new(),
        phone: "0813 1111 2222".into(),
        address: String::new(),
        birth_date: "2001-02-03".into(),
    };

    let member = gateway.register(&registration).await.unwrap();

    let seen = tap.seen.lock();
    let body = seen[0].body.as_ref().unwrap();
    let sent = body["id"].as_str().unwrap();
    let millis = sent.strip_prefix("user-").unwrap();
    assert!(millis.parse::<i64>().unwrap() > 0);
    assert_eq!(member.id.as_str(), sent);
}
