//! Compiled diagram cache for incremental builds.
//!
//! Compiling a diagram definition to SVG is the most expensive step of the
//! render stage. This module lets the draw phase skip the engine when the same
//! definition has been compiled before by the same engine.
//!
//! # Design
//!
//! The cache is **content-addressed** and stores the engine's raw output,
//! before the per-diagram namespace key is applied. Renumbering slides,
//! moving a diagram to another slide or changing its identifier therefore
//! never invalidates an entry; only a changed definition, a different engine
//! or a different palette does.
//!
//! - **`definition_hash`**: SHA-256 of the definition text.
//! - **`engine_hash`**: SHA-256 of the engine identity (name plus palette)
//!   and the cache format version.
//!
//! A hit requires a manifest entry for both hashes **and** the stored SVG file
//! still on disk.
//!
//! ## Storage
//!
//! ```text
//! .simple-deck-temp/diagrams/
//! ├── .cache-manifest.json
//! ├── 3f2a…-91cc….svg
//! └── …
//! ```
//!
//! ## Bypassing the cache
//!
//! Pass `--no-cache` to `render` or `build`; the renderer then runs without a
//! cache and every diagram is compiled.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Name of the cache manifest file within the cache directory.
const MANIFEST_FILENAME: &str = ".cache-manifest.json";

/// Bump to invalidate every existing cache when the format changes.
const MANIFEST_VERSION: u32 = 2;

/// On-disk manifest mapping `"{definition_hash}:{engine_hash}"` to the SVG file name.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, String>,
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
        }
    }

    /// Load from the cache directory. Returns an empty manifest if the file
    /// doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(cache_dir: &Path) -> Self {
        let content = match std::fs::read_to_string(cache_dir.join(MANIFEST_FILENAME)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(m) if m.version == MANIFEST_VERSION => m,
            _ => Self::empty(),
        }
    }

    pub fn save(&self, cache_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(cache_dir.join(MANIFEST_FILENAME), json)
    }
}

fn content_key(definition_hash: &str, engine_hash: &str) -> String {
    format!("{definition_hash}:{engine_hash}")
}

/// SHA-256 of a diagram definition, as hex.
pub fn hash_definition(definition: &str) -> String {
    format!("{:x}", Sha256::digest(definition.as_bytes()))
}

/// SHA-256 of the engine identity, as hex.
pub fn hash_engine(engine_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"engine\0");
    hasher.update(engine_name.as_bytes());
    hasher.update(MANIFEST_VERSION.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Summary of cache performance for a render run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} compiled ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} compiled", self.misses)
        }
    }
}

struct CacheState {
    manifest: CacheManifest,
    stats: CacheStats,
}

/// Thread-safe diagram cache shared by the rayon workers of a draw pass.
pub struct DiagramCache {
    dir: PathBuf,
    state: Mutex<CacheState>,
}

impl DiagramCache {
    /// Open (or create) the cache in `dir`.
    pub fn open(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            state: Mutex::new(CacheState {
                manifest: CacheManifest::load(dir),
                stats: CacheStats::default(),
            }),
        })
    }

    /// Look up compiled output. Counts a hit when found, nothing otherwise;
    /// the miss is counted by the following [`DiagramCache::store`].
    pub fn lookup(&self, definition_hash: &str, engine_hash: &str) -> Option<String> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let file = state
            .manifest
            .entries
            .get(&content_key(definition_hash, engine_hash))?;
        let svg = std::fs::read_to_string(self.dir.join(file)).ok()?;
        state.stats.hits += 1;
        Some(svg)
    }

    /// Record freshly compiled output.
    pub fn store(&self, definition_hash: &str, engine_hash: &str, svg: &str) -> io::Result<()> {
        let file = format!("{}-{}.svg", &definition_hash[..16], &engine_hash[..16]);
        std::fs::write(self.dir.join(&file), svg)?;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .manifest
            .entries
            .insert(content_key(definition_hash, engine_hash), file);
        state.stats.misses += 1;
        Ok(())
    }

    /// Persist the manifest.
    pub fn save(&self) -> io::Result<()> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.manifest.save(&self.dir)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.stats.clone()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
