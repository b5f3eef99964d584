use anyhow::{Context, Result};

use cilogon_auth::config::CilogonConfig;
use cilogon_auth::{Authenticator, AuthorizeRedirect};

use crate::output::print_json;

pub fn authorize_url(config: &CilogonConfig, state: &str) -> Result<()> {
    let redirect = AuthorizeRedirect::from_config(config)?;
    println!("{}", redirect.authorize_url(state));
    Ok(())
}

/// Runs the full login for `code` and prints the result with the local name.
pub async fn authenticate(config: &CilogonConfig, code: &str) -> Result<()> {
    let authenticator = Authenticator::from_config(config)?;

    let mut result = authenticator
        .authenticate(code)
        .await
        .context("login failed")?;
    if authenticator.has_mapper() {
        result.name = authenticator
            .normalize_username(&result.name)
            .await
            .context("username normalization failed")?;
    }

    print_json(&result)
}
