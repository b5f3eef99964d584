use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cilogon")]
#[command(about = "CILogon authentication tool: check configuration, start and finish logins, map usernames")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to cilogon.toml)
    #[arg(short, long, global = true, env = "CILOGON_CONFIG")]
    pub config: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and validate the configuration, then print it with secrets masked
    CheckConfig,
    /// Print the broker authorization URL for a new login
    AuthorizeUrl(AuthorizeUrlArgs),
    /// Exchange an authorization code and print the login result
    Authenticate(AuthenticateArgs),
    /// Resolve a username through the mapping file
    Map(MapArgs),
}

#[derive(clap::Args)]
pub struct AuthorizeUrlArgs {
    /// Opaque state value echoed back on the callback
    #[arg(long)]
    pub state: String,
}

#[derive(clap::Args)]
pub struct AuthenticateArgs {
    /// Authorization code received on the callback
    #[arg(long)]
    pub code: String,
}

#[derive(clap::Args)]
pub struct MapArgs {
    /// Username as resolved from the broker
    pub username: String,
}
