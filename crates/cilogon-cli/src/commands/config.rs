use anyhow::{Context, Result};
use colored::Colorize;

use cilogon_auth::config::CilogonConfig;
use cilogon_auth::config::loader::{DEFAULT_CONFIG_PATH, load_config};

use crate::output::{print_json, print_success};

/// Loads and validates the configuration.
pub fn load(path: Option<&str>) -> Result<CilogonConfig> {
    load_config(path).with_context(|| {
        format!(
            "failed to load configuration from {}",
            path.unwrap_or(DEFAULT_CONFIG_PATH)
        )
    })
}

pub fn check(config: &CilogonConfig) -> Result<()> {
    let token = config.token_endpoint()?;
    let userinfo = config.userinfo_endpoint()?;

    print_json(&config.redacted())?;
    eprintln!("{}: {}", "Token endpoint".cyan(), token);
    eprintln!("{}: {}", "Userinfo endpoint".cyan(), userinfo);
    match &config.mapping {
        Some(mapping) => eprintln!("{}: {}", "Map file".cyan(), mapping.map_file.display()),
        None => eprintln!("{}: {}", "Map file".cyan(), "(disabled)"),
    }
    print_success("Configuration is valid");
    Ok(())
}
