//! Variant cache for incremental builds.
//!
//! Encoding is the bottleneck of a build: every image shortcode produces one
//! file per (format, width), and AVIF or large WebP variants can take seconds
//! each. This module lets the image pipeline skip encoding when the source
//! image and encoding parameters haven't changed since the last build.
//!
//! # Design
//!
//! Variant file names already carry a prefix of the source hash and the
//! width (`{hash}-{width}.{ext}`), so a renamed or moved source keeps hitting
//! the same files. What the file name does *not* capture is the rest of the
//! encoding parameters: changing `quality` in `config.toml` must re-encode
//! even though the name stays the same. The manifest records, for every
//! written file, the full `source_hash` and a `params_hash`.
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives `git checkout` (which resets
//!   modification times).
//!
//! - **`params_hash`**: SHA-256 of (format, width, height, quality, animated).
//!
//! A cache hit requires:
//! 1. An entry for the output file with matching `source_hash` and `params_hash`
//! 2. The file still exists on disk
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<image output dir>/.cache-manifest.json`,
//! next to the variants it describes, so it travels with the output directory
//! when `_site/` is cached in CI.
//!
//! ## Concurrency
//!
//! Pages render in parallel; the manifest is shared behind a `Mutex` that is
//! held only for lookups and inserts, never while encoding.
//!
//! ## Bypassing the cache
//!
//! Pass `--no-cache` to `build` to start from an empty manifest. Every
//! variant is re-encoded and the old files are overwritten.

use crate::imaging::OutputFormat;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache manifest file within the image output directory.
const MANIFEST_FILENAME: &str = ".cache-manifest.json";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// A single cached output file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk cache manifest mapping output file names to their cache entries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
}

impl CacheManifest {
    /// Create an empty manifest (used for `--no-cache` or first build).
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
        }
    }

    /// Load from the output directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(output_dir: &Path) -> Self {
        let content = match std::fs::read_to_string(manifest_path(output_dir)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(_) => return Self::empty(),
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest
    }

    /// Save to the output directory.
    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(output_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(output_dir), json)
    }

    /// Whether `file_name` was written from this source with these
    /// parameters and is still on disk.
    pub fn is_fresh(
        &self,
        file_name: &str,
        source_hash: &str,
        params_hash: &str,
        output_dir: &Path,
    ) -> bool {
        self.entries.get(file_name).is_some_and(|entry| {
            entry.source_hash == source_hash && entry.params_hash == params_hash
        }) && output_dir.join(file_name).exists()
    }

    /// Record a cache entry for an output file, replacing any previous one.
    pub fn insert(&mut self, file_name: String, source_hash: String, params_hash: String) {
        self.entries.insert(
            file_name,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// SHA-256 hash of the encoding parameters of one variant.
pub fn hash_variant_params(
    format: OutputFormat,
    width: u32,
    height: u32,
    quality: u32,
    animated: bool,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"variant\0");
    hasher.update(format.extension().as_bytes());
    hasher.update(b"\0");
    hasher.update(width.to_le_bytes());
    hasher.update(height.to_le_bytes());
    hasher.update(quality.to_le_bytes());
    hasher.update([animated as u8]);
    format!("{:x}", hasher.finalize())
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }

    pub fn add(&mut self, other: CacheStats) {
        self.hits += other.hits;
        self.misses += other.misses;
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} encoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} encoded", self.misses)
        }
    }
}

/// Resolve the cache manifest path for an output directory.
pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // CacheManifest basics
    // =========================================================================

    #[test]
    fn empty_manifest_has_no_entries() {
        let m = CacheManifest::empty();
        assert_eq!(m.version, MANIFEST_VERSION);
        assert!(m.entries.is_empty());
    }

    #[test]
    fn fresh_when_entry_matches_and_file_exists() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("abc-800.webp".into(), "src123".into(), "prm456".into());
        fs::write(tmp.path().join("abc-800.webp"), "data").unwrap();

        assert!(m.is_fresh("abc-800.webp", "src123", "prm456", tmp.path()));
    }

    #[test]
    fn stale_on_wrong_source_hash() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("out.webp".into(), "hash_a".into(), "params".into());
        fs::write(tmp.path().join("out.webp"), "data").unwrap();

        assert!(!m.is_fresh("out.webp", "hash_b", "params", tmp.path()));
    }

    #[test]
    fn stale_on_wrong_params_hash() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("out.webp".into(), "hash".into(), "params_a".into());
        fs::write(tmp.path().join("out.webp"), "data").unwrap();

        assert!(!m.is_fresh("out.webp", "hash", "params_b", tmp.path()));
    }

    #[test]
    fn stale_when_file_deleted() {
        let mut m = CacheManifest::empty();
        m.insert("gone.webp".into(), "h".into(), "p".into());
        let tmp = TempDir::new().unwrap();
        assert!(!m.is_fresh("gone.webp", "h", "p", tmp.path()));
    }

    #[test]
    fn stale_without_entry() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("out.webp"), "data").unwrap();
        let m = CacheManifest::empty();
        assert!(!m.is_fresh("out.webp", "h", "p", tmp.path()));
    }

    #[test]
    fn insert_replaces_previous_entry() {
        let mut m = CacheManifest::empty();
        m.insert("a.webp".into(), "s".into(), "q80".into());
        m.insert("a.webp".into(), "s".into(), "q90".into());
        assert_eq!(m.entries.len(), 1);
        assert_eq!(m.entries["a.webp"].params_hash, "q90");
    }

    // =========================================================================
    // Save / Load roundtrip
    // =========================================================================

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("x.webp".into(), "s1".into(), "p1".into());
        m.insert("y.png".into(), "s2".into(), "p2".into());

        m.save(tmp.path()).unwrap();
        let loaded = CacheManifest::load(tmp.path());

        assert_eq!(loaded.version, MANIFEST_VERSION);
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(
            loaded.entries["x.webp"],
            CacheEntry {
                source_hash: "s1".into(),
                params_hash: "p1".into()
            }
        );
    }

    #[test]
    fn save_creates_missing_output_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("_site/img");
        CacheManifest::empty().save(&dir).unwrap();
        assert!(manifest_path(&dir).exists());
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let m = CacheManifest::load(tmp.path());
        assert!(m.entries.is_empty());
    }

    #[test]
    fn load_corrupt_json_returns_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILENAME), "not json").unwrap();
        let m = CacheManifest::load(tmp.path());
        assert!(m.entries.is_empty());
    }

    #[test]
    fn load_wrong_version_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let json = format!(
            r#"{{"version": {}, "entries": {{"a": {{"source_hash":"h","params_hash":"p"}}}}}}"#,
            MANIFEST_VERSION + 1
        );
        fs::write(tmp.path().join(MANIFEST_FILENAME), json).unwrap();
        let m = CacheManifest::load(tmp.path());
        assert!(m.entries.is_empty());
    }

    // =========================================================================
    // Hash functions
    // =========================================================================

    #[test]
    fn hash_file_deterministic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.bin");
        fs::write(&path, b"hello world").unwrap();

        let h1 = hash_file(&path).unwrap();
        let h2 = hash_file(&path).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64); // SHA-256 hex is 64 chars
    }

    #[test]
    fn hash_file_changes_with_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.bin");

        fs::write(&path, b"version 1").unwrap();
        let h1 = hash_file(&path).unwrap();

        fs::write(&path, b"version 2").unwrap();
        let h2 = hash_file(&path).unwrap();

        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_variant_params_deterministic() {
        let h1 = hash_variant_params(OutputFormat::Webp, 1200, 627, 80, false);
        let h2 = hash_variant_params(OutputFormat::Webp, 1200, 627, 80, false);
        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_variant_params_varies_with_each_input() {
        let base = hash_variant_params(OutputFormat::Webp, 800, 600, 80, false);
        assert_ne!(base, hash_variant_params(OutputFormat::Jpeg, 800, 600, 80, false));
        assert_ne!(base, hash_variant_params(OutputFormat::Webp, 801, 600, 80, false));
        assert_ne!(base, hash_variant_params(OutputFormat::Webp, 800, 601, 80, false));
        assert_ne!(base, hash_variant_params(OutputFormat::Webp, 800, 600, 90, false));
        assert_ne!(base, hash_variant_params(OutputFormat::Webp, 800, 600, 80, true));
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display_with_hits() {
        let s = CacheStats { hits: 5, misses: 2 };
        assert_eq!(format!("{}", s), "5 cached, 2 encoded (7 total)");
    }

    #[test]
    fn cache_stats_display_no_hits() {
        let s = CacheStats { hits: 0, misses: 3 };
        assert_eq!(format!("{}", s), "3 encoded");
    }

    #[test]
    fn cache_stats_add() {
        let mut total = CacheStats::default();
        total.add(CacheStats { hits: 1, misses: 2 });
        total.add(CacheStats { hits: 3, misses: 0 });
        assert_eq!(total, CacheStats { hits: 4, misses: 2 });
    }
}
