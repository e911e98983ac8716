//! Add command implementation.

use serde_json::json;
use stamplink_canonical::{MemberId, PeerSessionId};
use stamplink_sync::StampDesk;

use crate::context::Context;

pub async fn run(
    ctx: &Context,
    id: String,
    count: u32,
    peer: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = MemberId::parse(id)?;
    let peer = peer.map(PeerSessionId::parse).transpose()?;

    let desk = StampDesk::new(ctx.gateway.clone(), ctx.caller());
    let receipt = desk.commit(&id, peer.as_ref(), count).await?;
    let outcome = &receipt.outcome;

    let notified = match receipt.notification {
        Some(task) => Some(task.await.unwrap_or(false)),
        None => None,
    };

    if json {
        let report = json!({
            "member": outcome.member,
            "requested": outcome.requested,
            "applied": outcome.applied,
            "stoppedBy": outcome.stopped_by.as_ref().map(|e| e.to_string()),
            "notified": notified,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Applied {} of {} stamp(s) to {} ({}/{})",
        outcome.applied,
        outcome.requested,
        outcome.member.name,
        outcome.member.stamps,
        outcome.member.max_stamps
    );
    if let Some(reason) = &outcome.stopped_by {
        println!("Stopped early: {}", reason);
    }
    match notified {
        Some(true) => println!("Device notified"),
        Some(false) => println!("Device not notified; it will catch up on its next refresh"),
        None => {}
    }
    Ok(())
}
