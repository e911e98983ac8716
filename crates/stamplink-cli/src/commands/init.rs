//! Init command implementation.

use std::path::Path;

use stamplink_sync::SyncConfig;

pub fn run(path: &Path, ledger_url: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        return Err(format!("{} already exists", path.display()).into());
    }
    let config = SyncConfig {
        ledger_url,
        ..SyncConfig::default()
    };
    config.save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
