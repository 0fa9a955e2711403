//! `dewmap`: inspect, export, submit and moderate finds from the terminal.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dewmap_client::DewClient;
use dewmap_common::Config;

mod cmd;

#[derive(Parser)]
#[command(name = "dewmap")]
#[command(about = "Community finds map client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summary numbers and top flavors
    Stats {
        /// Only count finds matching this search
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Search finds by flavor, location or address
    Search { query: String },

    /// Write placed finds as GeoJSON
    Export {
        #[arg(short, long)]
        query: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List the flavors the submission form offers
    Flavors,

    /// Report a new find
    Submit {
        #[arg(long)]
        flavor: String,

        #[arg(long)]
        size: String,

        /// Store or location name
        #[arg(long)]
        location: String,

        #[arg(long)]
        address: String,

        #[arg(long)]
        image_url: Option<String>,

        /// Photo to upload (jpg, png, webp or gif, under 8MB)
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Moderation (uses DEWMAP_ADMIN_USERNAME / DEWMAP_ADMIN_PASSWORD)
    #[command(subcommand)]
    Admin(cmd::admin::AdminCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dewmap=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.log_redacted();

    let client = Arc::new(DewClient::from_config(&config)?);

    match cli.command {
        Commands::Stats { query } => cmd::public::stats(client, query.as_deref()).await,
        Commands::Search { query } => cmd::public::search(client, &query).await,
        Commands::Export { query, out } => {
            cmd::public::export(client, query.as_deref(), out.as_deref()).await
        }
        Commands::Flavors => cmd::public::flavors(client).await,
        Commands::Submit {
            flavor,
            size,
            location,
            address,
            image_url,
            image,
        } => {
            let form = cmd::public::SubmitArgs {
                flavor,
                size,
                location,
                address,
                image_url,
                image,
            };
            cmd::public::submit(client, form).await
        }
        Commands::Admin(command) => cmd::admin::run(client, &config, command).await,
    }
}
