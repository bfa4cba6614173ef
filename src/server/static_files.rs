//! In-memory table of small root-level static files.
//!
//! Built once at startup and shared read-only through
//! [`AppState`](super::AppState).

use std::collections::HashMap;
use std::path::Path;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::transform::content_type_for;

/// Files served from the site root by default.
pub const DEFAULT_STATIC_FILES: &[&str] = &[
    "favicon.ico",
    "robots.txt",
    "android-chrome-192x192.png",
    "android-chrome-512x512.png",
    "apple-touch-icon.png",
    "favicon-16x16.png",
    "favicon-32x32.png",
];

/// A static file held in memory.
#[derive(Debug, Clone)]
pub struct StaticFile {
    /// File name, also the URL path without the leading slash
    pub name: String,

    /// File contents
    pub content: Bytes,

    /// MIME type derived from the extension
    pub content_type: &'static str,
}

/// Read-only mapping from file name to contents.
#[derive(Debug, Clone, Default)]
pub struct StaticFiles {
    files: HashMap<String, StaticFile>,
}

impl StaticFiles {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load each of `names` from `dir`.
    ///
    /// Missing or unreadable files are skipped with a warning. Names that are
    /// not a single plain path segment are ignored.
    pub async fn load(dir: &Path, names: &[&str]) -> Self {
        let mut files = Self::new();

        for &name in names {
            if !is_plain_name(name) {
                warn!(name = name, "Ignoring static file with unsupported name");
                continue;
            }

            let path = dir.join(name);
            match tokio::fs::read(&path).await {
                Ok(content) => {
                    debug!(name = name, bytes = content.len(), "Loaded static file");
                    files = files.with_file(name, content);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Error reading static file");
                }
            }
        }

        files
    }

    /// Add a file to the table.
    pub fn with_file(mut self, name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let name = name.into();
        let file = StaticFile {
            content_type: content_type_for(&name),
            content: content.into(),
            name: name.clone(),
        };
        self.files.insert(name, file);
        self
    }

    /// Look up a file by name.
    pub fn get(&self, name: &str) -> Option<&StaticFile> {
        self.files.get(name)
    }

    /// Names of all loaded files.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Number of loaded files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no files are loaded.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '{', '}', '*', ':'])
}
