//! # Hotel API Main Entry Point
//!
//! `hotel serve` (the default) runs the HTTP API, `hotel migrate` applies
//! schema migrations and exits, `hotel hash-password` prints a bcrypt hash
//! for seeding accounts by hand.

use anyhow::Context;
use clap::{Parser, Subcommand};
use hotel::{
    config::{AppConfig, ConfigLoader},
    crypto::hash_password,
    db,
    server::run_server,
    telemetry::init_tracing,
};

#[derive(Debug, Parser)]
#[command(name = "hotel", version, about = "Hotel front-desk API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Print a bcrypt hash of the given password
    HashPassword {
        password: String,
        #[arg(long, default_value_t = 12)]
        cost: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::HashPassword { password, cost } => {
            println!("{}", hash_password(&password, cost).await?);
            Ok(())
        }
        Command::Migrate => {
            let config = load_config()?;
            let db = db::init_pool(&config).await?;
            db::run_migrations(&db).await
        }
        Command::Serve => run_server(load_config()?).await,
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    let config = ConfigLoader::new()
        .load()
        .context("loading HOTEL_* configuration")?;
    init_tracing(&config).context("initializing tracing")?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Effective configuration");
    }
    Ok(config)
}
