//! Initialize command.

use console::style;

use crate::config::Settings;
use crate::repository::{redact_url_password, DbContext};

/// Create the database schema. Safe to run repeatedly.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    let url = settings.database_url();
    let ctx = DbContext::from_url(&url)?;
    ctx.init_schema().await?;

    let tables = ctx.list_tables().await?;
    println!(
        "{} Initialized database {} ({} tables)",
        style("✓").green(),
        redact_url_password(&url),
        tables.len()
    );

    if let Err(e) = settings.validate() {
        println!("{} {}", style("!").yellow(), e);
        println!("  Configure [storage] in letterarchive.toml before archiving letters");
    }

    Ok(())
}
