//! Checkpoints command implementation.

use std::fs;
use std::path::Path;

use stamplink_core::CheckpointConfig;

use crate::context::Context;

pub async fn show(ctx: &Context, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = ctx.gateway.fetch_config().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("Card capacity: {}", config.max_stamps);
    for checkpoint in &config.checkpoints {
        println!("{:>4}  {}", checkpoint.stamp_count, checkpoint.reward);
    }
    Ok(())
}

pub async fn save(ctx: &Context, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file)
        .map_err(|e| format!("unable to read {}: {}", file.display(), e))?;
    let config: CheckpointConfig = serde_json::from_str(&content)?;
    ctx.gateway.save_config(&config).await?;
    println!("Saved {} checkpoint(s)", config.checkpoints.len());
    Ok(())
}
