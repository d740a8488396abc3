//! Authentication against GitHub.
//!
//! A token is stored verbatim at `<local config dir>/gav/tok.tok`. If the
//! file exists its contents are used as-is (a corrupted file simply becomes an
//! invalid token and fails at the API). If it does not exist, the device
//! authorization flow in [`device_flow`] obtains a token interactively, which
//! is then printed, persisted, and returned. Re-authentication means deleting
//! the file and running again.

pub mod device_flow;

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use device_flow::DeviceFlow;

/// OAuth app client id, fixed at build time.
pub const CLIENT_ID: &str = "057154906abe87098d13";

/// Scopes requested from the device flow.
pub const SCOPES: &[&str] = &["repo", "read:org"];

const TOKEN_FILE: &str = "tok.tok";

/// Persistent storage for the access token.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Open the store under the platform's per-user local config directory,
    /// creating `<config dir>/gav` if needed.
    pub fn from_user_config() -> Result<Self> {
        let dir = dirs::config_local_dir()
            .context("could not determine the local config directory")?
            .join("gav");
        Self::open(&dir)
    }

    /// Open the store inside an explicit config directory.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
        Ok(Self {
            path: dir.join(TOKEN_FILE),
        })
    }

    /// Path of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token, if any. The file contents are returned
    /// verbatim with no validation.
    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let token = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read token file {}", self.path.display()))?;
        Ok(Some(token))
    }

    /// Write a token verbatim, replacing any previous contents.
    pub fn save(&self, token: &str) -> Result<()> {
        fs::write(&self.path, token)
            .with_context(|| format!("failed to write token file {}", self.path.display()))
    }
}

/// Return the stored token, or obtain one via `obtain` and persist it.
///
/// `obtain` runs at most once, and only when no token file exists. On
/// first-run success the token is echoed to the terminal so the user can
/// save it elsewhere if they want to.
pub async fn resolve_token<F, Fut>(store: &TokenStore, obtain: F) -> Result<String>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    if let Some(token) = store.load()? {
        return Ok(token);
    }

    let token = obtain().await?;

    println!("Access token: {token}");
    store.save(&token)?;
    println!("Saved token");

    Ok(token)
}
