//! Settings file for both device roles.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stamplink_ledger::GatewayOptions;

use crate::engine::EngineOptions;
use crate::error::SyncError;

/// StampLink settings. Every field has a default, so an empty file is valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Ledger endpoint. Without one, only the in-memory ledger is available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_url: Option<String>,
    /// Per-request ledger timeout.
    pub ledger_timeout_ms: u64,
    /// Extra attempts for a busy stamp unit.
    pub busy_retries: u32,
    /// Wait between busy retries.
    pub busy_backoff_ms: u64,
    /// Freshness window of the checkpoint configuration.
    pub config_ttl_secs: u64,
    /// Bound on one peer exchange.
    pub peer_timeout_ms: u64,
    /// Address the peer host listens on.
    pub peer_bind: String,
    /// Delay between a stamp notification and its forced refresh.
    pub refresh_delay_ms: u64,
    /// Background poll period on the member device.
    pub poll_interval_ms: u64,
    /// How long a scan alert stays raised.
    pub scan_alert_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ledger_url: None,
            ledger_timeout_ms: 15_000,
            busy_retries: 2,
            busy_backoff_ms: 250,
            config_ttl_secs: 30 * 60,
            peer_timeout_ms: 10_000,
            peer_bind: "127.0.0.1:0".to_string(),
            refresh_delay_ms: 1_000,
            poll_interval_ms: 10_000,
            scan_alert_ms: 3_000,
        }
    }
}

impl SyncConfig {
    /// Loads and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let content = fs::read_to_string(path).map_err(|err| {
            SyncError::InvalidConfig(format!("unable to read {}: {err}", path.display()))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|err| SyncError::InvalidConfig(format!("unable to parse config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), SyncError> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|err| {
            SyncError::InvalidConfig(format!("unable to create {}: {err}", parent.display()))
        })?;
        let encoded = toml::to_string_pretty(self)
            .map_err(|err| SyncError::InvalidConfig(format!("unable to encode config: {err}")))?;
        fs::write(path, encoded).map_err(|err| {
            SyncError::InvalidConfig(format!("unable to write {}: {err}", path.display()))
        })?;
        Ok(())
    }

    /// Rejects zero timers.
    pub fn validate(&self) -> Result<(), SyncError> {
        let timers = [
            ("ledger_timeout_ms", self.ledger_timeout_ms),
            ("peer_timeout_ms", self.peer_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
            ("scan_alert_ms", self.scan_alert_ms),
        ];
        for (name, value) in timers {
            if value == 0 {
                return Err(SyncError::InvalidConfig(format!("{name} must be positive")));
            }
        }
        if self.peer_bind.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "peer_bind must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Ledger request timeout.
    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_millis(self.ledger_timeout_ms)
    }

    /// Peer exchange bound.
    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }

    /// Gateway tuning derived from this configuration.
    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            busy_retries: self.busy_retries,
            busy_backoff: Duration::from_millis(self.busy_backoff_ms),
            config_ttl: Duration::from_secs(self.config_ttl_secs),
        }
    }

    /// Engine timers derived from this configuration.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            refresh_delay: Duration::from_millis(self.refresh_delay_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            scan_alert_duration: Duration::from_millis(self.scan_alert_ms),
        }
    }
}
