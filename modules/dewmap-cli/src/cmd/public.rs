//! Public map commands: everything a visitor can do without signing in.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dewmap_client::validate::content_type_for;
use dewmap_client::DewClient;
use dewmap_common::{ImageAttachment, NewFind};
use dewmap_core::export::to_geojson;
use dewmap_core::format::{long_timestamp, short_timestamp};
use dewmap_core::{LoadOutcome, MapBoard};
use tracing::info;

pub struct SubmitArgs {
    pub flavor: String,
    pub size: String,
    pub location: String,
    pub address: String,
    pub image_url: Option<String>,
    pub image: Option<PathBuf>,
}

/// Load finds into a fresh board and apply `query`.
async fn loaded_board(client: Arc<DewClient>, query: Option<&str>) -> Result<MapBoard> {
    let (mut board, _feed) = MapBoard::new(client);
    if board.load().await == LoadOutcome::Failed {
        let message = board.view().error.unwrap_or_default();
        bail!("could not load finds: {message}");
    }
    if let Some(query) = query {
        board.set_query(query);
    }
    Ok(board)
}

pub async fn stats(client: Arc<DewClient>, query: Option<&str>) -> Result<()> {
    let board = loaded_board(client, query).await?;
    let view = board.view();
    let summary = &view.summary;

    println!("Finds:   {}", summary.total);
    println!("Flavors: {}", summary.flavor_count);
    if let Some(latest) = &view.latest_activity {
        println!("Latest:  {latest}");
    }

    if !summary.top_flavors.is_empty() {
        println!("\nTop flavors");
        for (rank, entry) in summary.top_flavors.iter().enumerate() {
            println!("  {}. {} ({})", rank + 1, entry.flavor, entry.count);
        }
    }

    if !summary.latest.is_empty() {
        println!("\nRecent finds");
        for find in &summary.latest {
            println!(
                "  {}  {} @ {}",
                short_timestamp(find),
                find.flavor,
                find.location_name
            );
        }
    }
    Ok(())
}

pub async fn search(client: Arc<DewClient>, query: &str) -> Result<()> {
    let board = loaded_board(client, Some(query)).await?;
    let view = board.view();

    if view.no_match {
        println!("No finds match \"{}\"", query.trim());
        return Ok(());
    }
    for find in &view.preview {
        println!("[{}] {} ({})", find.id, find.flavor, find.size);
        println!("    {}, {}", find.location_name, find.address);
        println!("    {}", long_timestamp(find));
    }
    if view.summary.total > view.preview.len() {
        println!("...and {} more", view.summary.total - view.preview.len());
    }
    Ok(())
}

pub async fn export(client: Arc<DewClient>, query: Option<&str>, out: Option<&Path>) -> Result<()> {
    let board = loaded_board(client, query).await?;
    let doc = serde_json::to_string_pretty(&to_geojson(board.placed()))?;

    match out {
        Some(path) => {
            tokio::fs::write(path, doc)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), count = board.placed().len(), "GeoJSON written");
        }
        None => println!("{doc}"),
    }
    Ok(())
}

pub async fn flavors(client: Arc<DewClient>) -> Result<()> {
    let (mut board, _feed) = MapBoard::new(client);
    if board.load_flavors().await == LoadOutcome::Failed {
        let message = board.view().flavor_error.unwrap_or_default();
        bail!("{message}");
    }
    for flavor in board.view().flavors.iter() {
        println!("{flavor}");
    }
    Ok(())
}

pub async fn submit(client: Arc<DewClient>, args: SubmitArgs) -> Result<()> {
    let image = match &args.image {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            Some(ImageAttachment {
                content_type: content_type_for(&file_name).to_string(),
                file_name,
                bytes,
            })
        }
        None => None,
    };

    let form = NewFind {
        flavor: args.flavor,
        size: args.size,
        location_name: args.location,
        address: args.address,
        image_url: args.image_url,
        image,
    };

    let (mut board, _feed) = MapBoard::new(client);
    let created = board.submit(form).await?;
    println!(
        "Submitted find {}: {} at {}",
        created.id, created.flavor, created.location_name
    );
    Ok(())
}
