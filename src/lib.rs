//! # gav
//!
//! Download a GitHub Actions run's first artifact and browse it over local HTTP.
//!
//! Given a run URL, gav authenticates against GitHub (device flow on first run,
//! a stored token afterwards), looks up the artifacts attached to the run,
//! downloads the first one into memory, and serves the zip archive's contents
//! on `http://localhost:6969` so they can be inspected in a browser.
//!
//! ## Example
//!
//! ```no_run
//! use gav::{ArchiveFs, ZipArchive};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Open a downloaded artifact archive held in memory
//!     let archive = ZipArchive::new(std::fs::read("artifact.zip")?)?;
//!
//!     // Expose it as a read-only filesystem and serve it locally
//!     let fs = ArchiveFs::new(archive);
//!     gav::serve::serve(fs, gav::serve::PORT).await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod download;
pub mod run_url;
pub mod serve;
pub mod zip;

pub use api::{Artifact, ArtifactClient, ArtifactList};
pub use auth::TokenStore;
pub use cli::Cli;
pub use run_url::RunReference;
pub use zip::{ArchiveFs, ZipArchive, ZipEntry};
