//! Code command implementation.

use stamplink_canonical::{MemberId, PeerSessionId};
use stamplink_sync::CodePayload;

use crate::context::Context;

pub async fn run(
    ctx: &Context,
    id: String,
    peer: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = MemberId::parse(id)?;
    let peer = peer.map(PeerSessionId::parse).transpose()?;
    let member = ctx.gateway.get_member(&id).await?;
    println!("{}", CodePayload::for_member(&member, peer.as_ref()).encode());
    Ok(())
}
