//! Run URL parsing.
//!
//! Turns a browser-pasted GitHub Actions run URL into the coordinates needed
//! to talk to the API: organization, repository, and numeric run id. Anything
//! after the run id (a job link, a trailing slash) is ignored.

use anyhow::{Context, Result, bail};
use regex::Regex;

/// Coordinates of a single workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReference {
    pub org: String,
    pub repo: String,
    pub run_id: u64,
}

impl RunReference {
    /// Parse a run URL of the form
    /// `https://<host>/<org>/<repo>/actions/runs/<id>[/...]`.
    ///
    /// # Errors
    ///
    /// Returns an "invalid run url" error if the URL does not match that
    /// shape or the run id is not a base-10 integer. Whether the org and
    /// repo actually exist is not checked here; the artifacts API call will
    /// surface that.
    pub fn parse(url: &str) -> Result<Self> {
        let rx = Regex::new(r"^https?://[^/]+/([^/]+)/([^/]+)/actions/runs/(\d+)(?:/.*)?$")
            .expect("run url pattern compiles");

        let Some(caps) = rx.captures(url) else {
            bail!("invalid run url: {url}");
        };

        let run_id = caps[3]
            .parse::<u64>()
            .with_context(|| format!("invalid run id in url: {url}"))?;

        Ok(Self {
            org: caps[1].to_string(),
            repo: caps[2].to_string(),
            run_id,
        })
    }
}
