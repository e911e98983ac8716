//! Admin flow: scan a code, confirm a count, commit it, notify the device.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use stamplink_canonical::{MemberId, PeerSessionId};
use stamplink_core::{now_millis, StampEventType};
use stamplink_ledger::{IncrementOutcome, LedgerGateway};
use stamplink_peer::PeerCaller;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::resolver::{IdentityResolver, Resolution};

/// One committed admin transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Transaction id, `tx-<ms>`.
    pub id: String,
    /// Commit time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Member the stamps went to.
    pub member_id: MemberId,
    /// Member name as shown to the operator.
    pub member_name: String,
    /// Transaction kind.
    #[serde(rename = "type")]
    pub kind: StampEventType,
    /// Units the ledger applied.
    pub amount: u32,
}

/// Result of a commit.
#[derive(Debug)]
pub struct StampReceipt {
    /// What the ledger applied.
    pub outcome: IncrementOutcome,
    /// Background peer notification, if a peer was known. Resolves to
    /// whether the device acknowledged it; failures resolve to `false`.
    pub notification: Option<JoinHandle<bool>>,
}

/// Admin-side orchestration.
///
/// The ledger commit is the only write. The `ADD_STAMP` that follows tells
/// the member's device about it and never affects the commit's result.
pub struct StampDesk {
    gateway: Arc<LedgerGateway>,
    resolver: IdentityResolver,
    caller: PeerCaller,
    audit: Mutex<Vec<AuditEntry>>,
}

impl StampDesk {
    /// Creates a desk.
    pub fn new(gateway: Arc<LedgerGateway>, caller: PeerCaller) -> Self {
        Self {
            resolver: IdentityResolver::new(Arc::clone(&gateway), caller.clone()),
            gateway,
            caller,
            audit: Mutex::new(Vec::new()),
        }
    }

    /// Resolves a scanned code.
    pub async fn scan(&self, raw: &str) -> Result<Resolution, SyncError> {
        self.resolver.resolve(raw).await
    }

    /// Commits `count` stamps for a resolved scan.
    pub async fn commit_resolution(
        &self,
        resolution: &Resolution,
        count: u32,
    ) -> Result<StampReceipt, SyncError> {
        self.commit(&resolution.member.id, resolution.peer.as_ref(), count)
            .await
    }

    /// Commits `count` stamps, then notifies `peer` with the applied count.
    ///
    /// Partial application is a successful receipt with a short count.
    pub async fn commit(
        &self,
        member_id: &MemberId,
        peer: Option<&PeerSessionId>,
        count: u32,
    ) -> Result<StampReceipt, SyncError> {
        let outcome = self.gateway.increment_stamps(member_id, count).await?;
        if let Some(reason) = &outcome.stopped_by {
            warn!(
                member = %member_id,
                requested = outcome.requested,
                applied = outcome.applied,
                reason = %reason,
                "stamps partially applied"
            );
        }

        let timestamp = now_millis();
        self.audit.lock().push(AuditEntry {
            id: format!("tx-{timestamp}"),
            timestamp,
            member_id: member_id.clone(),
            member_name: outcome.member.name.clone(),
            kind: StampEventType::Add,
            amount: outcome.applied,
        });
        info!(member = %member_id, applied = outcome.applied, "transaction recorded");

        let notification = peer.map(|peer| self.notify(peer.clone(), outcome.applied));
        Ok(StampReceipt {
            outcome,
            notification,
        })
    }

    fn notify(&self, peer: PeerSessionId, applied: u32) -> JoinHandle<bool> {
        let caller = self.caller.clone();
        tokio::spawn(async move {
            match caller.send_stamp_signal(&peer, applied).await {
                Ok(acked) => {
                    debug!(session = %peer, acked, "stamp signal delivered");
                    acked
                }
                Err(e) => {
                    warn!(session = %peer, error = %e, "stamp signal failed");
                    false
                }
            }
        })
    }

    /// Transactions committed through this desk, oldest first.
    pub fn audit(&self) -> Vec<AuditEntry> {
        self.audit.lock().clone()
    }
}
