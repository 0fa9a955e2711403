//! Moderation commands.

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Subcommand;
use dewmap_client::DewClient;
use dewmap_common::{Config, FindId};
use dewmap_core::format::short_timestamp;
use dewmap_core::{AdminConsole, DeleteOutcome};

#[derive(Subcommand)]
pub enum AdminCommand {
    /// Most recent finds, newest first
    List {
        /// Page size (25, 50 or 100 in the web console; 1-200 accepted)
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Remove a find
    Remove { id: String },
}

pub async fn run(client: Arc<DewClient>, config: &Config, command: AdminCommand) -> Result<()> {
    let console = AdminConsole::new(client, config.admin_page_size);
    sign_in(&console, config).await?;

    match command {
        AdminCommand::List { limit } => list(&console, limit).await,
        AdminCommand::Remove { id } => remove(&console, &FindId::from(id)).await,
    }
}

/// Reuse a live session cookie if there is one, else log in with the
/// configured credentials.
async fn sign_in(console: &AdminConsole, config: &Config) -> Result<()> {
    if console.bootstrap().await.is_authed() {
        return Ok(());
    }
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password)
    else {
        bail!("admin commands need DEWMAP_ADMIN_USERNAME and DEWMAP_ADMIN_PASSWORD");
    };
    console.login(username, password).await?;
    Ok(())
}

async fn list(console: &AdminConsole, limit: Option<u32>) -> Result<()> {
    if let Some(limit) = limit {
        console.set_page_size(limit).await?;
    } else if let Some(err) = console.store().error() {
        bail!("could not load finds: {err}");
    }

    let stats = console.store().stats();
    print!("{} finds", stats.total);
    if let Some(top) = &stats.top_flavor {
        print!(" (top flavor: {} x{})", top.flavor, top.count);
    }
    println!();

    for find in console.store().finds().iter() {
        println!(
            "{:>8}  {}  {}  {} @ {}",
            find.id.as_str(),
            short_timestamp(find),
            find.submitted_by.as_deref().unwrap_or("-"),
            find.flavor,
            find.location_name
        );
    }
    Ok(())
}

async fn remove(console: &AdminConsole, id: &FindId) -> Result<()> {
    match console.delete(id).await? {
        DeleteOutcome::Removed => println!("Removed find {id}"),
        DeleteOutcome::AlreadyPending => println!("Find {id} is already being removed"),
    }
    Ok(())
}
