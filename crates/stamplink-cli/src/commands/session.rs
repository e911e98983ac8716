//! Register and login command implementations.

use stamplink_ledger::Registration;

use crate::context::Context;

pub async fn register(
    ctx: &Context,
    name: String,
    phone: String,
    birth_date: String,
    email: String,
    address: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let registration = Registration {
        name,
        email,
        phone,
        address,
        birth_date,
    };
    let member = ctx.gateway.register(&registration).await?;
    println!("Registered {} as {}", member.name, member.id);
    Ok(())
}

pub async fn login(
    ctx: &Context,
    phone: String,
    birth_date: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let member = ctx.gateway.login(&phone, &birth_date).await?;
    println!("{} ({}): {}/{}", member.name, member.id, member.stamps, member.max_stamps);
    Ok(())
}
