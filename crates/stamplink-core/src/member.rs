use serde::{Deserialize, Serialize};
use stamplink_canonical::MemberId;

use crate::errors::ModelError;
use crate::event_id::synthetic_event_id;
use crate::events::{StampEvent, StampEventType};

/// Member record as served by the ledger.
///
/// Field names follow the ledger's JSON (`maxStamps`, `createdAt`, ...).
/// Client-side copies are snapshots: the only mutation offered here is the
/// optimistic delta, which the next authoritative refresh overwrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Stable member id.
    pub id: MemberId,
    /// Optional login name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Display name.
    pub name: String,
    /// Optional e-mail address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number in stored form (digits, country code first).
    #[serde(default)]
    pub phone: String,
    /// Optional postal address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Optional birth date as entered at registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    /// Current stamp balance.
    pub stamps: u32,
    /// Card capacity.
    pub max_stamps: u32,
    /// Stamp history, oldest first.
    #[serde(default)]
    pub history: Vec<StampEvent>,
    /// Registration date as reported by the ledger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Member {
    /// Builds a provisional snapshot from data embedded in a scanned code.
    ///
    /// No ledger call backs this snapshot; it is as fresh as the code it was
    /// read from.
    pub fn provisional(
        id: MemberId,
        name: impl Into<String>,
        stamps: u32,
        max_stamps: u32,
    ) -> Result<Self, ModelError> {
        let member = Self {
            id,
            username: None,
            name: name.into(),
            email: None,
            phone: String::new(),
            address: None,
            birth_date: None,
            stamps,
            max_stamps,
            history: Vec::new(),
            created_at: None,
        };
        member.validate()?;
        Ok(member)
    }

    /// Checks the balance invariants.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.max_stamps == 0 {
            return Err(ModelError::ZeroMaxStamps);
        }
        if self.stamps > self.max_stamps {
            return Err(ModelError::StampsBeyondMax {
                stamps: self.stamps,
                max_stamps: self.max_stamps,
            });
        }
        Ok(())
    }

    /// Stamps still available before the card is full.
    pub fn remaining(&self) -> u32 {
        self.max_stamps.saturating_sub(self.stamps)
    }

    /// Returns true if no further stamp can be added.
    pub fn is_full(&self) -> bool {
        self.stamps >= self.max_stamps
    }

    /// Applies a local optimistic delta of `count` stamps.
    ///
    /// The balance is clamped to `max_stamps` and a single synthetic `add`
    /// event carrying the notified count is appended.
    pub fn apply_optimistic(&mut self, count: u32, now_ms: i64) {
        self.stamps = self.stamps.saturating_add(count).min(self.max_stamps);
        self.history.push(StampEvent {
            id: synthetic_event_id(now_ms),
            timestamp: now_ms,
            kind: StampEventType::Add,
            amount: count,
        });
    }

    /// Returns true if the history holds client-side placeholders.
    pub fn has_synthetic_events(&self) -> bool {
        self.history.iter().any(StampEvent::is_synthetic)
    }
}
