use anyhow::Result;
use owo_colors::OwoColorize;

use crate::context::Context;

pub async fn run(ctx: &Context, value: Option<&str>) -> Result<()> {
    let store = ctx.store();

    match value {
        None => println!("{}", store.currency().await?),
        Some(value) => {
            let saved = store.save_currency(value).await?;
            println!("{}", format!("  Currency: {saved}").green());
        }
    }
    Ok(())
}
