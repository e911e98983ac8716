//! Turns a scanned code into a member.

use std::sync::Arc;

use stamplink_canonical::PeerSessionId;
use stamplink_core::Member;
use stamplink_ledger::LedgerGateway;
use stamplink_peer::PeerCaller;
use tracing::{debug, info};

use crate::error::SyncError;
use crate::payload::ScanPayload;

/// Which strategy produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Data embedded in the code; no network call.
    Embedded,
    /// Fetched from the ledger by id.
    Ledger,
    /// Fetched from the member's own device.
    Peer,
}

/// A resolved scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Member snapshot. Only as fresh as `source` allows.
    pub member: Member,
    /// Peer session id to notify after a commit.
    pub peer: Option<PeerSessionId>,
    /// Strategy that produced `member`.
    pub source: ResolutionSource,
}

/// Resolves scans in priority order: embedded data, then ledger by id, then
/// the member's device.
///
/// An embedded snapshot can lag the ledger by whatever was committed since
/// the code was rendered. That window is accepted for scan latency; the
/// ledger stays authoritative at commit time.
pub struct IdentityResolver {
    gateway: Arc<LedgerGateway>,
    caller: PeerCaller,
}

impl IdentityResolver {
    /// Creates a resolver.
    pub fn new(gateway: Arc<LedgerGateway>, caller: PeerCaller) -> Self {
        Self { gateway, caller }
    }

    /// Resolves a raw scanned string.
    ///
    /// When the code names a peer session, a scan alert is sent to it in the
    /// background. That alert never delays or fails resolution.
    pub async fn resolve(&self, raw: &str) -> Result<Resolution, SyncError> {
        let payload = ScanPayload::parse(raw);
        if let Some(peer) = payload.peer() {
            self.alert(peer.clone());
        }

        match payload {
            ScanPayload::Embedded { member, peer } => {
                debug!(member = %member.id, "resolved from embedded data");
                Ok(Resolution {
                    member,
                    peer,
                    source: ResolutionSource::Embedded,
                })
            }
            ScanPayload::IdOnly { id, peer } => {
                let member = self.gateway.get_member(&id).await?;
                debug!(member = %member.id, "resolved from ledger");
                Ok(Resolution {
                    member,
                    peer,
                    source: ResolutionSource::Ledger,
                })
            }
            ScanPayload::PeerOnly { peer } => {
                info!(session = %peer, "code has no member id, asking device");
                match self.caller.fetch_profile(&peer).await? {
                    Some(member) => Ok(Resolution {
                        member,
                        peer: Some(peer),
                        source: ResolutionSource::Peer,
                    }),
                    None => Err(SyncError::PeerUnreachable(format!(
                        "device {peer} has no profile loaded"
                    ))),
                }
            }
            ScanPayload::Malformed { reason } => Err(SyncError::Malformed(reason)),
        }
    }

    fn alert(&self, peer: PeerSessionId) {
        let caller = self.caller.clone();
        tokio::spawn(async move {
            if let Err(e) = caller.send_scan_alert(&peer).await {
                debug!(session = %peer, error = %e, "scan alert not delivered");
            }
        });
    }
}
