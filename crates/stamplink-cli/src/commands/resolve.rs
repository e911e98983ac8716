//! Resolve command implementation.

use serde_json::json;
use stamplink_sync::{ResolutionSource, StampDesk};

use crate::context::Context;

pub async fn run(
    ctx: &Context,
    code: String,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let desk = StampDesk::new(ctx.gateway.clone(), ctx.caller());
    let resolution = desk.scan(&code).await?;

    let source = match resolution.source {
        ResolutionSource::Embedded => "embedded",
        ResolutionSource::Ledger => "ledger",
        ResolutionSource::Peer => "peer",
    };

    if json {
        let report = json!({
            "source": source,
            "peer": resolution.peer.as_ref().map(|p| p.as_str()),
            "member": resolution.member,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let member = &resolution.member;
        println!("Member:  {} ({})", member.name, member.id);
        println!("Stamps:  {}/{}", member.stamps, member.max_stamps);
        println!("Source:  {}", source);
        if let Some(peer) = &resolution.peer {
            println!("Peer:    {}", peer);
        }
    }
    Ok(())
}
