use serde::{Deserialize, Serialize};

/// Kind of stamp history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StampEventType {
    /// Stamps were added to the card.
    Add,
    /// Stamps were redeemed.
    Redeem,
    /// A checkpoint reward was earned.
    VoucherEarned,
    /// An earned reward was used.
    VoucherRedeemed,
}

impl StampEventType {
    /// Wire name of the event type.
    pub fn as_str(self) -> &'static str {
        match self {
            StampEventType::Add => "add",
            StampEventType::Redeem => "redeem",
            StampEventType::VoucherEarned => "voucher_earned",
            StampEventType::VoucherRedeemed => "voucher_redeemed",
        }
    }

    /// Parses a wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "add" => Some(StampEventType::Add),
            "redeem" => Some(StampEventType::Redeem),
            "voucher_earned" => Some(StampEventType::VoucherEarned),
            "voucher_redeemed" => Some(StampEventType::VoucherRedeemed),
            _ => None,
        }
    }
}

/// Immutable stamp history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampEvent {
    /// Event id (ledger-issued, or synthetic for optimistic placeholders).
    pub id: String,
    /// Wall clock time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: StampEventType,
    /// Number of stamps the event covers.
    pub amount: u32,
}

impl StampEvent {
    /// Returns true if this entry is a client-side placeholder.
    pub fn is_synthetic(&self) -> bool {
        crate::event_id::is_synthetic(&self.id)
    }
}
