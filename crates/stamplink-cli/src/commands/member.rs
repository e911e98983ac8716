//! Member command implementation.

use serde_json::json;
use stamplink_canonical::MemberId;
use stamplink_ledger::progress;
use tracing::warn;

use crate::context::Context;
use crate::output;

pub async fn run(ctx: &Context, id: String, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let id = MemberId::parse(id)?;
    let member = ctx.gateway.get_member(&id).await?;
    let config = match ctx.gateway.fetch_config().await {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "checkpoint configuration unavailable, using defaults");
            ctx.gateway.get_config()?.value
        }
    };
    let progress = progress(&member, &config);

    if json {
        let view = json!({ "member": member, "progress": progress });
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        output::print_member(&member, &progress);
    }
    Ok(())
}
