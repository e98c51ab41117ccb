//! `parcel`: uploads one file through a multipart upload server.

mod app;
mod config;
mod content_type;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parcel", version, about = "Chunked multipart file uploader")]
struct Cli {
    /// File to upload.
    file: PathBuf,

    /// MIME type sent with every part; guessed from the extension if omitted.
    #[arg(long)]
    content_type: Option<String>,

    /// Configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries only the final location.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting parcel");

    let config = config::Config::load(cli.config.as_deref())?;
    tracing::info!(server = %config.server_url, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(app::run(config, &cli.file, cli.content_type))?;

    tracing::info!(
        key = %outcome.key,
        parts = outcome.total_parts,
        bytes = outcome.total_bytes,
        "upload finished"
    );
    println!("{}", outcome.location);
    Ok(())
}
