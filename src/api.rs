//! GitHub REST API client for listing workflow run artifacts.

use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::Deserialize;

use crate::run_url::RunReference;

const API_BASE: &str = "https://api.github.com";

/// One artifact attached to a workflow run.
#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub archive_download_url: String,
    pub size_in_bytes: u64,
}

/// Page of artifacts, as returned by the artifacts endpoint.
#[derive(Debug, Deserialize)]
pub struct ArtifactList {
    pub total_count: u64,
    pub artifacts: Vec<Artifact>,
}

impl ArtifactList {
    /// The artifact gav downloads: always the first entry, by policy.
    /// No ranking or name-based selection happens.
    pub fn first_artifact(&self) -> Option<&Artifact> {
        self.artifacts.first()
    }
}

/// Authenticated client for the GitHub API.
pub struct ArtifactClient {
    http: Client,
    base_url: String,
    token: String,
}

impl ArtifactClient {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, API_BASE)
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        // GitHub rejects requests without a User-Agent.
        let http = Client::builder()
            .user_agent(concat!("gav/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// List the artifacts attached to a run.
    ///
    /// Only the first page (25 entries) is requested. Runs with more
    /// artifacts lose visibility into the rest; since only the first artifact
    /// is ever downloaded this does not change the outcome.
    pub async fn list_run_artifacts(&self, run: &RunReference) -> Result<ArtifactList> {
        let url = format!(
            "{}/repos/{}/{}/actions/runs/{}/artifacts?page=1&per_page=25",
            self.base_url, run.org, run.repo, run.run_id
        );

        let resp = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.token)
            .send()
            .await
            .context("artifact list request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("artifact list request failed with status {status}: {body}");
        }

        resp.json()
            .await
            .context("failed to parse artifact list response")
    }
}
