// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Administrative CLI for the reward runtime.
//!
//! Usage:
//! ```bash
//! # Apply pending migrations
//! reward-admin migrate up
//!
//! # Revert the most recently applied migration
//! reward-admin migrate down
//!
//! # Register our webhook callback with a provider
//! reward-admin webhook subscribe --provider strava
//!
//! # Remove an account's integration
//! reward-admin integration disconnect --provider strava --address 0xabc
//! ```

use clap::{Parser, Subcommand};
use reward_runtime::{
    config::Config, db::FirestoreDb, migrations::MigrationRunner, models::ProviderKind, AppState,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "reward-admin",
    about = "Reward runtime administration",
    long_about = "Runs document migrations and manages provider webhook subscriptions."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Document migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateCommand,
    },

    /// Provider webhook subscriptions
    Webhook {
        #[command(subcommand)]
        action: WebhookCommand,
    },

    /// OAuth integrations
    Integration {
        #[command(subcommand)]
        action: IntegrationCommand,
    },
}

#[derive(Subcommand)]
enum MigrateCommand {
    /// Apply every pending migration in order
    Up,
    /// Revert the most recently applied migration
    Down,
    /// Show applied and pending migrations
    Status,
}

#[derive(Subcommand)]
enum WebhookCommand {
    /// Create a webhook subscription pointing at our callback
    Subscribe {
        #[arg(long, default_value = "strava")]
        provider: String,
    },
    /// List existing webhook subscriptions
    List {
        #[arg(long, default_value = "strava")]
        provider: String,
    },
}

#[derive(Subcommand)]
enum IntegrationCommand {
    /// Delete an integration and revoke its provider access
    Disconnect {
        #[arg(long, default_value = "strava")]
        provider: String,
        /// Wallet address the integration belongs to
        #[arg(long)]
        address: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "reward_runtime=debug,info"
    } else {
        "reward_runtime=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = Config::load()?;
    let db = FirestoreDb::connect(&config.database).await?;

    match cli.command {
        Command::Migrate { action } => {
            let runner = MigrationRunner::new(db);
            match action {
                MigrateCommand::Up => {
                    let applied = runner.up().await?;
                    println!("Applied {} migration(s)", applied.len());
                    for id in applied {
                        println!("  {}", id);
                    }
                }
                MigrateCommand::Down => match runner.down().await? {
                    Some(id) => println!("Reverted {}", id),
                    None => println!("Nothing to revert"),
                },
                MigrateCommand::Status => {
                    for status in runner.status().await? {
                        match status.applied_at {
                            Some(at) => println!("{:<36} applied {}", status.id, at),
                            None => println!("{:<36} pending", status.id),
                        }
                    }
                }
            }
        }
        Command::Webhook { action } => {
            let state = AppState::new(config, db)?;
            let drivers = state.integrations.drivers();
            match action {
                WebhookCommand::Subscribe { provider } => {
                    let subscription = drivers.resolve(&provider)?.subscribe_webhook().await?;
                    println!(
                        "Subscribed {} (id {}) -> {}",
                        provider, subscription.id, subscription.callback_url
                    );
                }
                WebhookCommand::List { provider } => {
                    let subscriptions = drivers
                        .resolve(&provider)?
                        .list_webhook_subscriptions()
                        .await?;
                    if subscriptions.is_empty() {
                        println!("No subscriptions for {}", provider);
                    }
                    for s in subscriptions {
                        println!("{}\t{}", s.id, s.callback_url);
                    }
                }
            }
        }
        Command::Integration {
            action: IntegrationCommand::Disconnect { provider, address },
        } => {
            let state = AppState::new(config, db)?;
            let kind: ProviderKind = provider.parse()?;
            if state.integrations.disconnect(kind, &address).await? {
                println!("Disconnected {} for {}", provider, address);
            } else {
                println!("No {} integration for {}", provider, address);
            }
        }
    }

    Ok(())
}
