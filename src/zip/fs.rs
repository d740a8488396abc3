//! Read-only filesystem view of a zip archive.
//!
//! Entry names become slash-separated paths rooted at `""`. Intermediate
//! directories that have no explicit entry in the archive are materialized,
//! so every file is reachable by walking listings from the root.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{Context, Result};

use super::archive::ZipArchive;

/// What a path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    File,
    Dir,
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Base name, without the parent path.
    pub name: String,
    pub is_dir: bool,
    /// Uncompressed size; zero for directories.
    pub size: u64,
}

/// Path-indexed view over an in-memory archive.
pub struct ArchiveFs {
    archive: ZipArchive,
    /// Normalized file path -> index into the archive's entry list.
    files: HashMap<String, usize>,
    /// Directory path ("" is the root) -> child base names.
    dirs: BTreeMap<String, BTreeSet<String>>,
}

impl ArchiveFs {
    /// Index an archive's entries into a path-addressable view.
    ///
    /// # Arguments
    ///
    /// * `archive` - The parsed archive; the view takes ownership
    pub fn new(archive: ZipArchive) -> Self {
        let mut files = HashMap::new();
        let mut dirs: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        dirs.insert(String::new(), BTreeSet::new());

        for (idx, entry) in archive.entries().iter().enumerate() {
            let path = normalize(&entry.name);
            if path.is_empty() {
                continue;
            }

            // Register the path and every ancestor directory.
            let mut current = path.as_str();
            loop {
                let (parent, base) = split_parent(current);
                dirs.entry(parent.to_string())
                    .or_default()
                    .insert(base.to_string());
                if parent.is_empty() {
                    break;
                }
                dirs.entry(parent.to_string()).or_default();
                current = parent;
            }

            if entry.is_directory {
                dirs.entry(path).or_default();
            } else {
                files.insert(path, idx);
            }
        }

        Self {
            archive,
            files,
            dirs,
        }
    }

    /// Resolve a path to a file or directory, if it exists.
    ///
    /// # Arguments
    ///
    /// * `path` - Slash-separated path; leading/trailing slashes are ignored
    ///
    /// # Returns
    ///
    /// The node kind, or `None` when nothing in the archive matches.
    pub fn lookup(&self, path: &str) -> Option<Node> {
        let path = normalize(path);
        if self.files.contains_key(&path) {
            Some(Node::File)
        } else if self.dirs.contains_key(&path) {
            Some(Node::Dir)
        } else {
            None
        }
    }

    /// Read a file's decompressed contents.
    ///
    /// # Errors
    ///
    /// Fails when the path is not a file in the archive or the underlying
    /// entry cannot be read.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize(path);
        let idx = *self
            .files
            .get(&path)
            .with_context(|| format!("no such file in archive: {path}"))?;
        self.archive.read(&self.archive.entries()[idx])
    }

    /// List a directory's immediate children, directories first, each group
    /// sorted by name. Returns `None` for paths that are not directories.
    pub fn list_dir(&self, path: &str) -> Option<Vec<DirEntry>> {
        let path = normalize(path);
        let children = self.dirs.get(&path)?;

        let mut out: Vec<DirEntry> = children
            .iter()
            .map(|base| {
                let full = join(&path, base);
                if let Some(&idx) = self.files.get(&full) {
                    DirEntry {
                        name: base.clone(),
                        is_dir: false,
                        size: self.archive.entries()[idx].uncompressed_size,
                    }
                } else {
                    DirEntry {
                        name: base.clone(),
                        is_dir: true,
                        size: 0,
                    }
                }
            })
            .collect();
        out.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then(a.name.cmp(&b.name)));
        Some(out)
    }
}

/// Strip leading/trailing slashes and a leading `./`.
fn normalize(path: &str) -> String {
    path.trim_matches('/').trim_start_matches("./").to_string()
}

fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, base)) => (parent, base),
        None => ("", path),
    }
}

fn join(dir: &str, base: &str) -> String {
    if dir.is_empty() {
        base.to_string()
    } else {
        format!("{dir}/{base}")
    }
}
