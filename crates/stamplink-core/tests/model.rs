use serde_json::json;
use stamplink_canonical::MemberId;
use stamplink_core::{
    Checkpoint, CheckpointConfig, Member, ModelError, StampEventType, DEFAULT_MAX_STAMPS,
};

fn make_member(stamps: u32, max: u32) -> Member {
    Member::provisional(MemberId::parse("user-1").unwrap(), "Ayu", stamps, max).unwrap()
}

fn make_config(max: u32, counts: &[u32]) -> CheckpointConfig {
    CheckpointConfig {
        max_stamps: max,
        checkpoints: counts
            .iter()
            .map(|c| Checkpoint {
                stamp_count: *c,
                reward: format!("reward {c}"),
            })
            .collect(),
    }
}

#[test]
fn member_parses_ledger_json() {
    let member: Member = serde_json::from_value(json!({
        "id": "user-1717",
        "username": "ayu",
        "password": "never-read",
        "name": "Ayu",
        "email": "ayu@example.com",
        "phone": "6287783235189",
        "stamps": 4,
        "maxStamps": 10,
        "createdAt": "2024-05-01",
        "history": [
            { "id": "evt-1", "timestamp": 1714521600000i64, "type": "add", "amount": 1 },
            { "id": "evt-2", "timestamp": 1714521700000i64, "type": "voucher_earned", "amount": 1 }
        ]
    }))
    .unwrap();

    assert_eq!(member.id.as_str(), "user-1717");
    assert_eq!(member.stamps, 4);
    assert_eq!(member.max_stamps, 10);
    assert_eq!(member.history.len(), 2);
    assert_eq!(member.history[1].kind, StampEventType::VoucherEarned);
    assert_eq!(member.created_at.as_deref(), Some("2024-05-01"));
}

#[test]
fn member_history_defaults_to_empty() {
    let member: Member = serde_json::from_value(json!({
        "id": "user-2",
        "name": "Budi",
        "stamps": 0,
        "maxStamps": 10
    }))
    .unwrap();
    assert!(member.history.is_empty());
    assert_eq!(member.phone, "");
}

#[test]
fn provisional_rejects_inconsistent_snapshots() {
    let id = MemberId::parse("user-1").unwrap();
    assert_eq!(
        Member::provisional(id.clone(), "x", 1, 0).unwrap_err(),
        ModelError::ZeroMaxStamps
    );
    assert!(matches!(
        Member::provisional(id, "x", 11, 10),
        Err(ModelError::StampsBeyondMax { .. })
    ));
}

#[test]
fn optimistic_delta_clamps_to_capacity() {
    let mut member = make_member(8, 10);
    member.apply_optimistic(5, 1_000);

    assert_eq!(member.stamps, 10);
    assert_eq!(member.history.len(), 1);
    assert_eq!(member.history[0].amount, 5);
    assert_eq!(member.history[0].kind, StampEventType::Add);
    assert!(member.has_synthetic_events());
    assert!(member.is_full());
}

#[test]
fn config_rejects_duplicate_stamp_counts() {
    let config = make_config(10, &[3, 5, 3]);
    assert_eq!(config.validate(), Err(ModelError::DuplicateCheckpoint(3)));
}

#[test]
fn config_rejects_checkpoint_beyond_max() {
    let config = make_config(5, &[3, 7]);
    assert_eq!(
        config.validate(),
        Err(ModelError::CheckpointBeyondMax {
            stamp_count: 7,
            max_stamps: 5
        })
    );
}

#[test]
fn config_rejects_zero_and_blank_entries() {
    assert_eq!(make_config(0, &[]).validate(), Err(ModelError::ZeroMaxStamps));
    assert_eq!(make_config(5, &[0]).validate(), Err(ModelError::ZeroCheckpoint));

    let mut blank = make_config(5, &[2]);
    blank.checkpoints[0].reward = "  ".into();
    assert_eq!(blank.validate(), Err(ModelError::EmptyReward(2)));
}

#[test]
fn default_config_is_valid_and_ordered() {
    let config = CheckpointConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.max_stamps, DEFAULT_MAX_STAMPS);
    assert_eq!(config, config.normalized());
    assert_eq!(config.reward_at(7), Some("Free french fries"));
    assert!(!config.is_checkpoint(4));
    assert_eq!(config.next_checkpoint(5).map(|c| c.stamp_count), Some(7));
    assert!(config.next_checkpoint(10).is_none());
}

#[test]
fn normalized_sorts_checkpoints() {
    let config = make_config(10, &[7, 3, 5]).normalized();
    let counts: Vec<u32> = config.checkpoints.iter().map(|c| c.stamp_count).collect();
    assert_eq!(counts, vec![3, 5, 7]);
}

#[test]
fn config_wire_shape_uses_camel_case() {
    let config = make_config(4, &[2]);
    assert_eq!(
        serde_json::to_value(&config).unwrap(),
        json!({ "maxStamps": 4, "checkpoints": [{ "stampCount": 2, "reward": "reward 2" }] })
    );
}
