mod cli;
mod commands;
mod observability;
mod output;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    observability::init_tracing_with_level(&cli.log_level);

    let config = commands::config::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::CheckConfig => commands::config::check(&config)?,
        Commands::AuthorizeUrl(args) => commands::login::authorize_url(&config, &args.state)?,
        Commands::Authenticate(args) => commands::login::authenticate(&config, &args.code).await?,
        Commands::Map(args) => commands::map::resolve(&config, &args.username).await?,
    }

    Ok(())
}
