//! Filesystem cache of transformed images.
//!
//! # Components
//!
//! - [`CacheKey`]: derives the cache file name and decides validity
//! - [`CacheStore`]: get-or-compute entry point used by the HTTP layer
//! - [`CacheJanitor`] / [`sweep`]: background removal of expired entries
//!
//! # Layout
//!
//! ```text
//! <cache_dir>/<basename>_<hash12><ext>.compressed   recompressed variant
//! <cache_dir>/<basename><ext>.320                   resized variant
//! ```
//!
//! Both are plain files holding the encoded image bytes.

mod janitor;
mod key;
mod store;

pub use janitor::{sweep, CacheJanitor, SweepReport, DEFAULT_MAX_AGE, DEFAULT_SWEEP_INTERVAL};
pub use key::{
    CacheKey, CacheKind, COMPRESSED_SUFFIX, HASH_PREFIX_LEN, RESIZE_BUCKET, TEMP_SUFFIX,
};
pub use store::{CacheStats, CacheStore, CachedVariant};
