use serde::{Deserialize, Serialize};
use stamplink_core::Member;

/// One peer message. On the wire: a JSON object tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerMessage {
    /// Caller asks the host for its current in-memory profile.
    GetProfile,
    /// Host's reply to `GET_PROFILE`. `user` is null before the first load.
    ProfileData {
        /// Profile snapshot held by the host.
        #[serde(default)]
        user: Option<Member>,
    },
    /// Notification that `count` stamps were already committed to the ledger.
    AddStamp {
        /// Units committed.
        #[serde(default = "default_count")]
        count: u32,
    },
    /// Host's reply to `ADD_STAMP`.
    StampAck {
        /// Whether the host's handler accepted the notification.
        success: bool,
    },
    /// Someone is scanning the host's code. No reply.
    ScanAlert,
}

fn default_count() -> u32 {
    1
}

impl PeerMessage {
    /// Wire name of the message type.
    pub fn name(&self) -> &'static str {
        match self {
            PeerMessage::GetProfile => "GET_PROFILE",
            PeerMessage::ProfileData { .. } => "PROFILE_DATA",
            PeerMessage::AddStamp { .. } => "ADD_STAMP",
            PeerMessage::StampAck { .. } => "STAMP_ACK",
            PeerMessage::ScanAlert => "SCAN_ALERT",
        }
    }
}
