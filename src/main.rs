//! Image Transformer service binary.
//!
//! Builds the color tables, then serves `POST /process/...` until killed.

use anyhow::{Context, Result};
use clap::Parser;
use image_transformer::prelude::*;
use log::info;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "image-transformer", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the listen address
    #[arg(long)]
    listen: Option<SocketAddr>,
    /// Turn the admission gate off
    #[arg(long, default_value_t = false)]
    no_admission: bool,
    /// Print the available filters and exit
    #[arg(long, default_value_t = false)]
    list_filters: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_filters {
        list_filters();
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if args.no_admission {
        config.admission.enabled = false;
    }

    info!("{} v{} starting", image_transformer::NAME, image_transformer::VERSION);
    info!("Admission: {:?}", config.admission);

    // Build before accepting connections so no request pays for it.
    tokio::task::spawn_blocking(ColorTable::init)
        .await
        .context("building color tables")?;

    image_transformer::server::serve(config)
        .await
        .context("serving")?;
    Ok(())
}

fn list_filters() {
    let registry = FilterRegistry::with_builtins();
    println!("Available filters ({} total):", registry.len());
    for entry in registry.entries() {
        let metadata = &entry.metadata;
        match &metadata.parameter {
            Some(range) => println!(
                "  • {}(N) - {} (N in {}..={})",
                metadata.id,
                metadata.description,
                range.start(),
                range.end()
            ),
            None => println!("  • {} - {}", metadata.id, metadata.description),
        }
    }
}
