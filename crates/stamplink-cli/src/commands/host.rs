//! Host command implementation.

use std::sync::Arc;

use stamplink_canonical::{MemberId, PeerSessionId};
use stamplink_core::Member;
use stamplink_peer::PeerHost;
use stamplink_sync::{CodePayload, ReconciliationEngine, SyncPhase};
use tracing::info;

use crate::context::Context;

/// Runs a member device until interrupted, printing every card change.
pub async fn run(ctx: &Context, id: String) -> Result<(), Box<dyn std::error::Error>> {
    let id = MemberId::parse(id)?;
    let initial = ctx.gateway.get_member(&id).await?;

    let engine = ReconciliationEngine::start(
        initial,
        Arc::clone(&ctx.gateway),
        &ctx.bus,
        ctx.config.engine_options(),
    );
    let handle = engine.handle();
    let host = PeerHost::start(ctx.peers.as_ref(), Arc::new(handle.clone())).await?;

    println!("Session: {}", host.session_id());
    println!("{}", card(&handle.current(), handle.current_phase(), host.session_id()));

    let mut view = handle.view();
    let mut alert = handle.scan_alert();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let member = view.borrow_and_update().clone();
                println!("{}", card(&member, handle.current_phase(), host.session_id()));
            }
            changed = alert.changed() => {
                if changed.is_err() {
                    break;
                }
                if *alert.borrow_and_update() {
                    println!("Scanned");
                }
            }
        }
    }

    info!(session = %host.session_id(), "host stopping");
    host.shutdown();
    engine.shutdown();
    Ok(())
}

/// Stamp line plus the code the device shows for this view.
fn card(member: &Member, phase: SyncPhase, session: &PeerSessionId) -> String {
    format!(
        "Stamps:  {}/{} ({:?})\nCode:    {}",
        member.stamps,
        member.max_stamps,
        phase,
        CodePayload::for_member(member, Some(session)).encode()
    )
}
