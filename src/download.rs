//! Artifact archive download.
//!
//! The archive is fetched in one authenticated GET and accumulated fully in
//! memory; nothing is written to disk. A byte-counting progress line is
//! drawn on stderr while chunks arrive.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Client;

/// Whole-request timeout for the archive fetch.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Download an artifact archive into memory.
///
/// `expected_size` comes from the artifact listing and sizes the progress
/// line and the allocation; the actual byte count may differ (GitHub reports
/// the uncompressed size for some artifacts).
///
/// # Errors
///
/// Fails on request errors, a non-success response status, or when the
/// 60-second timeout elapses before the body is complete. Partial bytes are
/// discarded on failure.
pub async fn download_archive(url: &str, token: &str, expected_size: u64) -> Result<Vec<u8>> {
    let client = Client::builder()
        .user_agent(concat!("gav/", env!("CARGO_PKG_VERSION")))
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .context("failed to build http client")?;

    let mut resp = client
        .get(url)
        .bearer_auth(token)
        .send()
        .await
        .context("archive download request failed")?;

    if !resp.status().is_success() {
        bail!("archive download failed with status {}", resp.status());
    }

    let mut progress = TransferProgress::new("Downloading archive", expected_size);
    let mut body = Vec::with_capacity(expected_size as usize);

    while let Some(chunk) = resp
        .chunk()
        .await
        .context("archive download interrupted")?
    {
        body.extend_from_slice(&chunk);
        progress.advance(chunk.len() as u64);
    }

    progress.finish();

    Ok(body)
}

/// Terminal progress line for a byte transfer of known size.
struct TransferProgress {
    label: &'static str,
    total: u64,
    transferred: u64,
    last_percent: u64,
}

impl TransferProgress {
    fn new(label: &'static str, total: u64) -> Self {
        Self {
            label,
            total,
            transferred: 0,
            last_percent: u64::MAX,
        }
    }

    fn advance(&mut self, bytes: u64) {
        self.transferred += bytes;

        // Redraw only when the percentage moves, to keep stderr quiet.
        let percent = self.percent();
        if percent != self.last_percent {
            self.last_percent = percent;
            eprint!(
                "\r{}: {} / {} ({percent}%)",
                self.label,
                format_size(self.transferred),
                format_size(self.total),
            );
            let _ = std::io::stderr().flush();
        }
    }

    fn percent(&self) -> u64 {
        if self.total == 0 {
            return 100;
        }
        (self.transferred.min(self.total) * 100) / self.total
    }

    /// Clear the progress line.
    fn finish(self) {
        eprint!("\r\x1b[2K");
        let _ = std::io::stderr().flush();
    }
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
