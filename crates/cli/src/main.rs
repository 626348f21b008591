//! Charsheet CLI - migrations, record access and interactive sessions.
//!
//! # Usage
//!
//! ```bash
//! # Apply character store migrations
//! charsheet migrate
//!
//! # Read, create, update and list records through the functions server
//! charsheet get abc123
//! charsheet create '{"name":"Zed"}' --owner p1
//! charsheet update abc123 '{"hp":7}'
//! charsheet list p1
//!
//! # Drive a session for a page, reading UI messages from stdin
//! charsheet open http://localhost:8888/abc123 --player p1
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `get` / `create` / `update` / `list` - Remote store access
//! - `open` - Interactive session

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "charsheet")]
#[command(author, version, about = "Charsheet CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run character store database migrations
    Migrate,
    /// Fetch a character record
    Get {
        /// Character ID
        id: String,
    },
    /// Create a character record from JSON data
    Create {
        /// Character data as JSON
        data: String,

        /// Owning player ID
        #[arg(short, long)]
        owner: Option<String>,
    },
    /// Merge JSON data into a character record
    Update {
        /// Character ID
        id: String,

        /// Partial character data as JSON
        data: String,
    },
    /// List a player's characters, newest first
    List {
        /// Player ID
        player: String,
    },
    /// Open an interactive session for a page URL
    Open {
        /// Page URL, e.g. `http://localhost:8888/abc123`
        url: String,

        /// Start signed in as this player
        #[arg(short, long, env = "CHARSHEET_PLAYER_ID")]
        player: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "charsheet=info,charsheet_client=info".into());

    // Logs go to stderr; stdout carries JSON output
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Get { id } => commands::records::get(&id).await?,
        Commands::Create { data, owner } => {
            commands::records::create(&data, owner.as_deref()).await?;
        }
        Commands::Update { id, data } => commands::records::update(&id, &data).await?,
        Commands::List { player } => commands::records::list(&player).await?,
        Commands::Open { url, player } => commands::open::run(&url, player.as_deref()).await?,
    }
    Ok(())
}
