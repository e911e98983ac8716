//! The member's scannable code, parsed at the boundary.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stamplink_canonical::{MemberId, PeerSessionId};
use stamplink_core::{Member, DEFAULT_MAX_STAMPS};
use tracing::debug;

/// Wire form of the code a member device displays:
/// `{id, pid, n, s, m}` with `pid` empty when no peer session is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePayload {
    /// Member id.
    pub id: String,
    /// Peer session id, possibly empty.
    pub pid: String,
    /// Member name.
    pub n: String,
    /// Stamp count when the code was rendered.
    pub s: u32,
    /// Card capacity.
    pub m: u32,
}

impl CodePayload {
    /// Builds the payload for `member`, optionally reachable at `peer`.
    pub fn for_member(member: &Member, peer: Option<&PeerSessionId>) -> Self {
        Self {
            id: member.id.to_string(),
            pid: peer.map(|p| p.to_string()).unwrap_or_default(),
            n: member.name.clone(),
            s: member.stamps,
            m: member.max_stamps,
        }
    }

    /// Encodes the payload as the JSON string placed in the code.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A scanned code, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanPayload {
    /// Id plus well-typed name and stamp count. Resolves with no network call,
    /// at the cost of being as old as the code itself.
    Embedded {
        /// Snapshot built from the code.
        member: Member,
        /// Peer session id, if the code carried one.
        peer: Option<PeerSessionId>,
    },
    /// Id without usable embedded data. Resolves through the ledger.
    IdOnly {
        /// Member id.
        id: MemberId,
        /// Peer session id, if the code carried one.
        peer: Option<PeerSessionId>,
    },
    /// Only a peer session id. Resolves by asking the member's device.
    PeerOnly {
        /// Peer session id.
        peer: PeerSessionId,
    },
    /// Nothing usable.
    Malformed {
        /// Why the code was rejected.
        reason: String,
    },
}

impl ScanPayload {
    /// Classifies a raw scanned string.
    ///
    /// Structured JSON is read field by field. Anything that is not JSON is
    /// accepted as a bare member id only if it carries a known id prefix.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(fields)) => Self::from_fields(&fields),
            Ok(_) => Self::malformed("code is not a JSON object"),
            Err(_) if MemberId::looks_like_bare_id(raw) => match MemberId::parse(raw) {
                Ok(id) => ScanPayload::IdOnly { id, peer: None },
                Err(e) => Self::malformed(e.to_string()),
            },
            Err(_) => Self::malformed("unrecognized code format"),
        }
    }

    fn from_fields(fields: &Map<String, Value>) -> Self {
        let text = |key: &str| {
            fields
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        let peer = text("pid").and_then(|raw| match PeerSessionId::parse(raw) {
            Ok(peer) => Some(peer),
            Err(e) => {
                debug!(error = %e, "ignoring invalid peer session id in code");
                None
            }
        });

        let id = match text("id").map(MemberId::parse) {
            Some(Ok(id)) => id,
            Some(Err(e)) => return Self::malformed(e.to_string()),
            None => {
                return match peer {
                    Some(peer) => ScanPayload::PeerOnly { peer },
                    None => Self::malformed("code carries neither a member id nor a peer id"),
                }
            }
        };

        if let Some(member) = embedded_member(&id, fields) {
            return ScanPayload::Embedded { member, peer };
        }
        ScanPayload::IdOnly { id, peer }
    }

    fn malformed(reason: impl Into<String>) -> Self {
        ScanPayload::Malformed {
            reason: reason.into(),
        }
    }

    /// Peer session id carried by the code, if any.
    pub fn peer(&self) -> Option<&PeerSessionId> {
        match self {
            ScanPayload::Embedded { peer, .. } | ScanPayload::IdOnly { peer, .. } => peer.as_ref(),
            ScanPayload::PeerOnly { peer } => Some(peer),
            ScanPayload::Malformed { .. } => None,
        }
    }
}

/// Builds the provisional snapshot when `n` is a non-empty string and `s` a
/// non-negative integer. `m` falls back to the default capacity. Embedded
/// data that violates the balance invariant is discarded.
fn embedded_member(id: &MemberId, fields: &Map<String, Value>) -> Option<Member> {
    let name = fields.get("n").and_then(Value::as_str).filter(|n| !n.is_empty())?;
    let stamps = fields
        .get("s")
        .and_then(Value::as_u64)
        .and_then(|s| u32::try_from(s).ok())?;
    let max_stamps = fields
        .get("m")
        .and_then(Value::as_u64)
        .and_then(|m| u32::try_from(m).ok())
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_MAX_STAMPS);

    match Member::provisional(id.clone(), name, stamps, max_stamps) {
        Ok(member) => Some(member),
        Err(e) => {
            debug!(error = %e, "embedded snapshot rejected, falling back to ledger");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ScanPayload {
        ScanPayload::parse(&value.to_string())
    }

    #[test]
    fn full_code_is_embedded() {
        let payload = parse(json!({"id": "user-1", "pid": "abc-123", "n": "Ayu", "s": 4, "m": 12}));
        match payload {
            ScanPayload::Embedded { member, peer } => {
                assert_eq!(member.name, "Ayu");
                assert_eq!(member.stamps, 4);
                assert_eq!(member.max_stamps, 12);
                assert_eq!(peer.unwrap().as_str(), "abc-123");
            }
            other => panic!("expected embedded, got {other:?}"),
        }
    }

    #[test]
    fn missing_max_defaults_to_ten() {
        match parse(json!({"id": "user-1", "n": "Ayu", "s": 0})) {
            ScanPayload::Embedded { member, peer } => {
                assert_eq!(member.max_stamps, 10);
                assert!(peer.is_none());
            }
            other => panic!("expected embedded, got {other:?}"),
        }
    }

    #[test]
    fn ill_typed_stamps_fall_back_to_id() {
        for code in [
            json!({"id": "user-1", "n": "Ayu", "s": "4"}),
            json!({"id": "user-1", "n": "", "s": 4}),
            json!({"id": "user-1", "s": 4}),
            json!({"id": "user-1", "n": "Ayu", "s": -1}),
            json!({"id": "user-1", "n": "Ayu", "s": 11, "m": 10}),
        ] {
            assert!(
                matches!(parse(code.clone()), ScanPayload::IdOnly { .. }),
                "{code}"
            );
        }
    }

    #[test]
    fn empty_pid_is_no_peer() {
        match parse(json!({"id": "user-1", "pid": ""})) {
            ScanPayload::IdOnly { peer, .. } => assert!(peer.is_none()),
            other => panic!("expected id only, got {other:?}"),
        }
    }

    #[test]
    fn peer_only_code() {
        assert_eq!(
            parse(json!({"pid": "127.0.0.1:7000"})),
            ScanPayload::PeerOnly {
                peer: PeerSessionId::parse("127.0.0.1:7000").unwrap()
            }
        );
    }

    #[test]
    fn bare_ids_need_a_known_prefix() {
        assert!(matches!(
            ScanPayload::parse(" mem-0042 "),
            ScanPayload::IdOnly { .. }
        ));
        assert!(matches!(
            ScanPayload::parse("hello world"),
            ScanPayload::Malformed { .. }
        ));
        assert!(matches!(
            ScanPayload::parse("user-"),
            ScanPayload::Malformed { .. }
        ));
    }

    #[test]
    fn json_without_ids_is_malformed() {
        assert!(matches!(parse(json!({"n": "Ayu"})), ScanPayload::Malformed { .. }));
        assert!(matches!(parse(json!([1, 2])), ScanPayload::Malformed { .. }));
        assert!(matches!(parse(json!({"id": "bad id!"})), ScanPayload::Malformed { .. }));
    }

    #[test]
    fn encoded_code_parses_back_as_embedded() {
        let member =
            Member::provisional(MemberId::parse("user-9").unwrap(), "Rina", 3, 10).unwrap();
        let peer = PeerSessionId::parse("f00d-1").unwrap();
        let code = CodePayload::for_member(&member, Some(&peer)).encode();

        assert_eq!(
            ScanPayload::parse(&code),
            ScanPayload::Embedded {
                member,
                peer: Some(peer)
            }
        );
    }
}
