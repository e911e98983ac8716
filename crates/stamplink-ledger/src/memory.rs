//! In-process ledger.
//!
//! Behaves like the remote ledger for every action the gateway issues:
//! each call runs under one exclusive lock, `addStamp` applies exactly one
//! unit and refuses once the card is full. Call counters and fault
//! injection make it usable as a test double, and the CLI can run against it
//! when no remote ledger is configured.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use stamplink_canonical::{phone, MemberId};
use stamplink_core::{now_millis, CheckpointConfig, Member, StampEvent, StampEventType};

use crate::envelope::{to_value, Envelope};
use crate::error::LedgerError;
use crate::traits::{LedgerRequest, LedgerTransport};

/// Failure injected into the next call of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Respond as if the exclusive lock were held elsewhere.
    Busy,
    /// Fail at the transport level.
    Unavailable,
    /// Respond with a payload that is not an envelope.
    Garbage,
}

#[derive(Default)]
struct State {
    members: BTreeMap<MemberId, Member>,
    config: CheckpointConfig,
    calls: HashMap<String, usize>,
    faults: HashMap<String, VecDeque<Fault>>,
    next_seq: u64,
}

/// In-memory ledger implementing [`LedgerTransport`].
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<State>,
    latency: Mutex<Option<Duration>>,
}

impl MemoryLedger {
    /// Creates an empty ledger with the default checkpoint configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a member record.
    pub fn insert(&self, member: Member) {
        self.state.lock().members.insert(member.id.clone(), member);
    }

    /// Returns the authoritative record for `id`.
    pub fn member(&self, id: &MemberId) -> Option<Member> {
        self.state.lock().members.get(id).cloned()
    }

    /// Current checkpoint configuration.
    pub fn config(&self) -> CheckpointConfig {
        self.state.lock().config.clone()
    }

    /// Makes every call wait `latency` before answering.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Queues `fault` for the next call of `action`.
    pub fn inject(&self, action: &str, fault: Fault) {
        self.state
            .lock()
            .faults
            .entry(action.to_string())
            .or_default()
            .push_back(fault);
    }

    /// Number of calls received for `action`.
    pub fn calls(&self, action: &str) -> usize {
        self.state.lock().calls.get(action).copied().unwrap_or(0)
    }

    /// Number of calls received across all actions.
    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.values().sum()
    }

    fn handle(&self, request: &LedgerRequest) -> Result<Envelope, LedgerError> {
        let mut state = self.state.lock();
        *state.calls.entry(request.action.clone()).or_default() += 1;

        if let Some(fault) = state
            .faults
            .get_mut(&request.action)
            .and_then(VecDeque::pop_front)
        {
            return match fault {
                Fault::Busy => Ok(Envelope::failure("Server busy, lock timeout", Some("BUSY"))),
                Fault::Unavailable => Err(LedgerError::Network(format!(
                    "{}: connection refused",
                    request.action
                ))),
                Fault::Garbage => Err(LedgerError::Malformed(format!(
                    "{}: response is not a JSON envelope",
                    request.action
                ))),
            };
        }

        match request.action.as_str() {
            "getUser" => {
                let id = request.params.get("id").map(String::as_str).unwrap_or("");
                match lookup(&state, id) {
                    Some(member) => Envelope::with_user(member),
                    None => Ok(Envelope::failure("User not found", Some("NOT_FOUND"))),
                }
            }
            "getAll" => {
                let users: Vec<&Member> = state.members.values().collect();
                Ok(Envelope {
                    users: Some(to_value(&users)?),
                    ..Envelope::default()
                })
            }
            "getHistory" => {
                let id = request
                    .params
                    .get("userId")
                    .map(String::as_str)
                    .unwrap_or("");
                match lookup(&state, id) {
                    Some(member) => Ok(Envelope {
                        success: true,
                        history: Some(to_value(&member.history)?),
                        ..Envelope::default()
                    }),
                    None => Ok(Envelope::failure("User not found", Some("NOT_FOUND"))),
                }
            }
            "addStamp" => add_stamp(&mut state, body_str(request, "userId")),
            "getCheckpointConfig" => Ok(Envelope {
                success: true,
                config: Some(to_value(&state.config)?),
                ..Envelope::default()
            }),
            "saveCheckpointConfig" => {
                let body = request.body.clone().unwrap_or(Value::Null);
                match serde_json::from_value::<CheckpointConfig>(body) {
                    Ok(config) => {
                        state.config = config;
                        Ok(Envelope {
                            success: true,
                            ..Envelope::default()
                        })
                    }
                    Err(e) => Ok(Envelope::failure(format!("invalid config: {e}"), None)),
                }
            }
            "register" => register(&mut state, request),
            "login" => {
                let phone = body_str(request, "username");
                let birth_date = body_str(request, "password");
                let found = state.members.values().find(|m| {
                    m.phone == phone && m.birth_date.as_deref() == Some(birth_date)
                });
                match found {
                    Some(member) => Envelope::with_user(member),
                    None => Ok(Envelope::failure("Invalid phone number or birth date", None)),
                }
            }
            other => Ok(Envelope::failure(format!("Unknown action: {other}"), None)),
        }
    }
}

fn lookup<'a>(state: &'a State, raw_id: &str) -> Option<&'a Member> {
    let id = MemberId::parse(raw_id).ok()?;
    state.members.get(&id)
}

fn body_str<'a>(request: &'a LedgerRequest, field: &str) -> &'a str {
    request
        .body
        .as_ref()
        .and_then(|b| b.get(field))
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn add_stamp(state: &mut State, raw_id: &str) -> Result<Envelope, LedgerError> {
    state.next_seq += 1;
    let seq = state.next_seq;

    let Some(id) = MemberId::parse(raw_id).ok() else {
        return Ok(Envelope::failure("User not found", Some("NOT_FOUND")));
    };
    let Some(member) = state.members.get_mut(&id) else {
        return Ok(Envelope::failure("User not found", Some("NOT_FOUND")));
    };
    if member.is_full() {
        return Ok(Envelope::failure(
            "Maximum stamps reached",
            Some("CAP_REACHED"),
        ));
    }

    member.stamps += 1;
    member.history.push(StampEvent {
        id: format!("evt-{seq}"),
        timestamp: now_millis(),
        kind: StampEventType::Add,
        amount: 1,
    });
    Envelope::with_user(member)
}

fn register(state: &mut State, request: &LedgerRequest) -> Result<Envelope, LedgerError> {
    state.next_seq += 1;
    let seq = state.next_seq;

    let phone = match phone::standardize_registration(body_str(request, "phone")) {
        Ok(phone) => phone,
        Err(e) => return Ok(Envelope::failure(e.to_string(), None)),
    };
    if state.members.values().any(|m| m.phone == phone) {
        return Ok(Envelope::failure("Phone number already registered", None));
    }

    let requested_id = body_str(request, "id");
    let id = if requested_id.is_empty() {
        MemberId::new(format!("user-{seq}"))
    } else {
        match MemberId::parse(requested_id) {
            Ok(id) => id,
            Err(e) => return Ok(Envelope::failure(e.to_string(), None)),
        }
    };

    let optional = |field: &str| {
        let value = body_str(request, field);
        (!value.is_empty()).then(|| value.to_string())
    };
    let member = Member {
        id: id.clone(),
        username: Some(phone.clone()),
        name: body_str(request, "name").to_string(),
        email: optional("email"),
        phone,
        address: optional("address"),
        birth_date: optional("birthDate"),
        stamps: 0,
        max_stamps: state.config.max_stamps,
        history: Vec::new(),
        created_at: Some(now_millis().to_string()),
    };
    state.members.insert(id, member.clone());
    Envelope::with_user(&member)
}

#[async_trait]
impl LedgerTransport for MemoryLedger {
    async fn call(&self, request: LedgerRequest) -> Result<Envelope, LedgerError> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.handle(&request)
    }
}
