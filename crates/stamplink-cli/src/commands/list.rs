//! List command implementation.

use crate::context::Context;
use crate::output;

pub async fn run(ctx: &Context, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut members = ctx.gateway.get_all().await?;
    members.sort_by(|a, b| a.id.cmp(&b.id));

    if !json {
        output::print_member_header();
    }
    for member in &members {
        if json {
            println!("{}", serde_json::to_string(member)?);
        } else {
            println!("{}", output::format_member_row(member));
        }
    }
    Ok(())
}
