//! Main entry point for the gav CLI application.
//!
//! Orchestrates the full flow: resolve a GitHub token, parse the run URL,
//! look up the run's artifacts, download the first one into memory, and
//! serve the archive's contents on a local HTTP port.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gav::auth::{self, DeviceFlow, TokenStore};
use gav::zip::{ArchiveFs, ZipArchive};
use gav::{ArtifactClient, Cli, RunReference, download, serve};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // First run walks the device flow interactively; afterwards the stored
    // token is reused until the file is deleted.
    let store = TokenStore::from_user_config()?;
    let token = auth::resolve_token(&store, || async {
        DeviceFlow::new(auth::CLIENT_ID, auth::SCOPES)?.authorize().await
    })
    .await?;

    let run = RunReference::parse(&cli.url)?;

    let client = ArtifactClient::new(&token)?;
    let list = client.list_run_artifacts(&run).await?;

    // A run with no artifacts is a clean outcome, not an error.
    if list.total_count == 0 {
        println!("No artifacts found");
        return Ok(());
    }

    // Fixed policy: only the first artifact is ever used.
    let artifact = list
        .first_artifact()
        .context("artifact list was empty despite a non-zero total count")?;
    let bytes =
        download::download_archive(&artifact.archive_download_url, &token, artifact.size_in_bytes)
            .await?;

    let archive = ZipArchive::new(bytes)?;
    let fs = ArchiveFs::new(archive);

    // Terminal state: serves until the process is killed.
    serve::serve(fs, serve::PORT).await
}
