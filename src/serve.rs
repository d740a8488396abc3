//! Local HTTP server over the downloaded archive.
//!
//! Every path is resolved against the [`ArchiveFs`]: files are returned with
//! a guessed content type, directories render their `index.html` when one
//! exists or a generated listing otherwise. The server binds all interfaces
//! on a fixed port and runs until the process is killed.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Response, StatusCode, Uri, header},
    routing::get,
};
use tokio::net::TcpListener;

use crate::zip::{ArchiveFs, Node};

/// Fixed port the archive is served on.
pub const PORT: u16 = 6969;

/// Serve the archive filesystem, blocking forever.
///
/// A fire-and-forget task opens the default browser at the local URL; its
/// outcome never affects the server.
///
/// # Arguments
///
/// * `fs` - The archive filesystem to expose
/// * `port` - TCP port to bind on all interfaces
///
/// # Errors
///
/// Returns an error if the port cannot be bound (e.g. already in use) or
/// the server fails while running; it never returns `Ok` otherwise.
pub async fn serve(fs: ArchiveFs, port: u16) -> Result<()> {
    let app = router(Arc::new(fs));

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;

    let url = format!("http://localhost:{port}");
    tracing::info!("Starting server at: {url}");

    tokio::task::spawn_blocking(move || {
        let _ = open::that(url);
    });

    axum::serve(listener, app).await.context("server failed")
}

/// Build the router: one fallback handler serves every path.
///
/// # Arguments
///
/// * `fs` - Shared archive filesystem resolved on each request
pub fn router(fs: Arc<ArchiveFs>) -> Router {
    Router::new().fallback(get(serve_path)).with_state(fs)
}

async fn serve_path(State(fs): State<Arc<ArchiveFs>>, uri: Uri) -> Response<Body> {
    // Request paths arrive percent-encoded; archive entry names are stored
    // decoded, so decode before any lookup.
    let decoded = percent_decode(uri.path());
    let path = decoded.trim_matches('/');

    match fs.lookup(path) {
        Some(Node::File) => serve_file(&fs, path),
        Some(Node::Dir) => {
            // Mirror file-server behavior: a directory's index.html wins
            // over the generated listing.
            let index = if path.is_empty() {
                "index.html".to_string()
            } else {
                format!("{path}/index.html")
            };
            if fs.lookup(&index) == Some(Node::File) {
                serve_file(&fs, &index)
            } else {
                serve_listing(&fs, path)
            }
        }
        None => not_found(),
    }
}

fn serve_file(fs: &ArchiveFs, path: &str) -> Response<Body> {
    let bytes = match fs.read_file(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!("failed to read {path}: {err:#}");
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from("failed to read archive entry"))
                .unwrap();
        }
    };

    let mime = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime)
        .body(Body::from(bytes))
        .unwrap()
}

fn serve_listing(fs: &ArchiveFs, path: &str) -> Response<Body> {
    let Some(entries) = fs.list_dir(path) else {
        return not_found();
    };

    let title = html_escape(&if path.is_empty() {
        "/".to_string()
    } else {
        format!("/{path}/")
    });

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">");
    html.push_str(&format!("<title>{title}</title></head><body>"));
    html.push_str(&format!("<h1>Index of {title}</h1>\n<ul>\n"));

    if !path.is_empty() {
        let (parent, _) = path.rsplit_once('/').unwrap_or(("", path));
        let href = html_escape(&percent_encode(&format!("/{parent}")));
        html.push_str(&format!("<li><a href=\"{href}\">..</a></li>\n"));
    }
    for entry in entries {
        let href = if path.is_empty() {
            format!("/{}", entry.name)
        } else {
            format!("/{path}/{}", entry.name)
        };
        let href = html_escape(&percent_encode(&href));
        let suffix = if entry.is_dir { "/" } else { "" };
        html.push_str(&format!(
            "<li><a href=\"{href}\">{}{suffix}</a></li>\n",
            html_escape(&entry.name)
        ));
    }
    html.push_str("</ul></body></html>\n");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Body::from(html))
        .unwrap()
}

fn not_found() -> Response<Body> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Body::from("Not found"))
        .unwrap()
}

/// Decode `%XX` sequences in a request path.
///
/// Malformed sequences are passed through untouched, and `+` stays a
/// literal plus (it only means space in query strings).
///
/// # Arguments
///
/// * `path` - The raw, possibly percent-encoded request path
///
/// # Returns
///
/// The decoded path; invalid UTF-8 is replaced lossily.
fn percent_decode(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let (Some(hi), Some(lo)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2]))
        {
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|v| v as u8)
}

/// Percent-encode a slash-separated path for use in an href.
///
/// Unreserved and path-legal sub-delimiter characters pass through;
/// everything else (spaces, `%`, non-ASCII bytes) is encoded.
fn percent_encode(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for &b in path.as_bytes() {
        match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'.'
            | b'_'
            | b'~'
            | b'!'
            | b'$'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b';'
            | b'='
            | b':'
            | b'@'
            | b'/' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Escape text for interpolation into HTML markup.
fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
