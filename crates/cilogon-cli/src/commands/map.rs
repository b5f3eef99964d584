use anyhow::{Context, Result};
use colored::Colorize;

use cilogon_auth::config::CilogonConfig;
use cilogon_auth::{UsernameMap, UsernameMapper};

pub async fn resolve(config: &CilogonConfig, username: &str) -> Result<()> {
    let mapping = config
        .mapping
        .as_ref()
        .context("no [mapping] section configured")?;
    let mapper = UsernameMapper::from_config(mapping)?;

    let local = mapper.resolve(username).await?;
    let stats = mapper.cache().stats();
    tracing::debug!(
        entries = stats.entries,
        skipped = stats.skipped_lines,
        "Mapping table loaded"
    );

    println!("{local}");
    if stats.skipped_lines > 0 {
        eprintln!(
            "{}: {} malformed line(s) skipped in {}",
            "Warning".yellow(),
            stats.skipped_lines,
            mapper.cache().location()
        );
    }
    Ok(())
}
