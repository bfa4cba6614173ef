//! Cache key derivation and validity policy.
//!
//! # Key Layout
//!
//! - Recompressed: `<basename>_<hash12><ext>.compressed`, where `hash12` is
//!   the first 12 hex characters of SHA-256 over the source bytes followed by
//!   the source modification time rendered as `<secs>.<nanos>`. Editing the
//!   source changes the key.
//! - Resized: `<basename><ext>.320`. Every requested size maps to the single
//!   `320` bucket, so the first resize of an asset is shared by all later
//!   resize requests for it, whatever dimensions they ask for.
//!
//! # Validity
//!
//! A resized entry is valid when its mtime is at or after the source mtime.
//! A recompressed entry must be strictly newer than the source.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

/// File name suffix of recompressed entries. The janitor expires these.
pub const COMPRESSED_SUFFIX: &str = ".compressed";

/// File name suffix of in-progress writes (`.<entry>.<pid>.<seq>.tmp`).
/// Files left behind by an interrupted write are expired like entries.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Bucket token appended to resized entries.
pub const RESIZE_BUCKET: &str = "320";

/// Number of hex characters of the content digest kept in the key.
pub const HASH_PREFIX_LEN: usize = 12;

/// Which transform produced a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Recompressed,
    Resized,
}

/// Deterministic cache file name for a source asset and transform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: CacheKind,
    file_name: String,
}

impl CacheKey {
    /// Key for the recompressed variant of `source_path`.
    pub fn recompress(source_path: &str, data: &[u8], modified: SystemTime) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.update(format_timestamp(modified).as_bytes());
        let digest = hex::encode(hasher.finalize());

        let (stem, ext) = split_name(source_path);
        Self {
            kind: CacheKind::Recompressed,
            file_name: format!(
                "{}_{}{}{}",
                stem,
                &digest[..HASH_PREFIX_LEN],
                ext,
                COMPRESSED_SUFFIX
            ),
        }
    }

    /// Key for the resized variant of `source_path`.
    ///
    /// The requested bounds do not take part in the key: all sizes share the
    /// [`RESIZE_BUCKET`] entry.
    pub fn resize(source_path: &str, _max_width: u32, _max_height: u32) -> Self {
        let (stem, ext) = split_name(source_path);
        Self {
            kind: CacheKind::Resized,
            file_name: format!("{}{}.{}", stem, ext, RESIZE_BUCKET),
        }
    }

    /// The cache file name (no directories).
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Which transform this key belongs to.
    pub fn kind(&self) -> CacheKind {
        self.kind
    }

    /// Whether an entry written at `cache_modified` may be served for a
    /// source last modified at `source_modified`.
    pub fn is_valid(&self, cache_modified: SystemTime, source_modified: SystemTime) -> bool {
        match self.kind {
            CacheKind::Resized => cache_modified >= source_modified,
            CacheKind::Recompressed => cache_modified > source_modified,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.file_name)
    }
}

/// Render a timestamp with nanosecond precision, e.g. `1715000000.000000123`.
fn format_timestamp(t: SystemTime) -> String {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => format!("{}.{:09}", d.as_secs(), d.subsec_nanos()),
        Err(e) => {
            let d = e.duration();
            format!("-{}.{:09}", d.as_secs(), d.subsec_nanos())
        }
    }
}

/// Split a path's file name into (stem, extension with leading dot).
fn split_name(path: &str) -> (&str, &str) {
    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);

    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}
