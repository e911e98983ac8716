//! Ledger and peer wiring shared by every command.

use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use stamplink_core::Member;
use stamplink_ledger::{HttpTransport, LedgerGateway, LedgerTransport, MemoryLedger};
use stamplink_peer::{PeerCaller, PeerTransport, TcpTransport};
use stamplink_sync::{SyncBus, SyncConfig};
use tracing::debug;

pub struct Context {
    pub config: SyncConfig,
    pub gateway: Arc<LedgerGateway>,
    pub bus: SyncBus,
    pub peers: Arc<dyn PeerTransport>,
}

impl Context {
    /// Loads settings and picks the ledger: the seeded in-memory one when a
    /// seed file is given, otherwise the configured HTTP endpoint.
    pub fn open(config_path: Option<&Path>, seed: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let config = match config_path {
            Some(path) => SyncConfig::load(path)?,
            None => SyncConfig::default(),
        };

        let transport: Arc<dyn LedgerTransport> = match (seed, config.ledger_url.as_deref()) {
            (Some(seed), _) => Arc::new(seeded_ledger(seed)?),
            (None, Some(url)) => Arc::new(HttpTransport::new(url, config.ledger_timeout())?),
            (None, None) => {
                return Err(
                    "no ledger configured: set ledger_url in the settings file or pass --memory"
                        .into(),
                )
            }
        };

        let bus = SyncBus::default();
        let gateway = Arc::new(
            LedgerGateway::new(transport, config.gateway_options())
                .with_publisher(Arc::new(bus.clone())),
        );
        let peers: Arc<dyn PeerTransport> = Arc::new(TcpTransport::new(config.peer_bind.clone()));

        Ok(Self {
            config,
            gateway,
            bus,
            peers,
        })
    }

    pub fn caller(&self) -> PeerCaller {
        PeerCaller::new(Arc::clone(&self.peers), self.config.peer_timeout())
    }
}

fn seeded_ledger(path: &Path) -> Result<MemoryLedger, Box<dyn Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("unable to read seed file {}: {}", path.display(), e))?;
    let members: Vec<Member> = serde_json::from_str(&content)
        .map_err(|e| format!("invalid seed file {}: {}", path.display(), e))?;

    let ledger = MemoryLedger::new();
    for member in members {
        member.validate()?;
        ledger.insert(member);
    }
    debug!(seed = %path.display(), "in-memory ledger seeded");
    Ok(ledger)
}
