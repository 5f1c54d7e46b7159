//! On-disk stage cache.
//!
//! One JSON file per (document, stage) holds the stage signature, the
//! serialized inputs it ran on and the outputs it produced. A later run hits
//! the cache only when the signature and every input serialize identically.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Default cache directory: `flowpdf` under the system temp directory.
pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("flowpdf")
}

/// Identity of one stage execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    /// Document identity (input file stem)
    pub doc_id: String,
    /// Stage name
    pub stage: String,
    /// Stage version plus any settings that change its output
    pub signature: String,
    /// Serialized document-scope inputs
    pub doc_in: String,
    /// Serialized page-scope inputs, one per page
    pub page_in: Vec<String>,
}

impl CacheKey {
    /// Build a key from the typed inputs.
    pub fn new<D: Serialize, P: Serialize>(
        doc_id: &str,
        stage: &str,
        signature: String,
        doc_in: &D,
        page_in: &[P],
    ) -> Result<Self> {
        Ok(Self {
            doc_id: doc_id.to_string(),
            stage: stage.to_string(),
            signature,
            doc_in: serde_json::to_string(doc_in)?,
            page_in: page_in
                .iter()
                .map(serde_json::to_string)
                .collect::<std::result::Result<_, _>>()?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    stage: String,
    signature: String,
    doc_in: String,
    page_in: Vec<String>,
    doc_out: serde_json::Value,
    page_out: Vec<serde_json::Value>,
}

/// Hit and miss counters of a [`StageCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from disk
    pub hits: u64,
    /// Lookups that had to run the stage
    pub misses: u64,
}

/// Stage result cache rooted at a directory.
#[derive(Debug)]
pub struct StageCache {
    root: PathBuf,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StageCache {
    /// Create a cache rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the entry for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(&key.doc_id)
            .join(format!("{}.json", key.stage))
    }

    /// Look up the outputs stored for `key`.
    ///
    /// A missing, unreadable or stale entry is a miss, never an error.
    pub fn load<D: DeserializeOwned, P: DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> Option<(D, Vec<P>)> {
        let found = self.read_entry(key);
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    fn read_entry<D: DeserializeOwned, P: DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> Option<(D, Vec<P>)> {
        let path = self.entry_path(key);
        let text = fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&text) {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        if entry.stage != key.stage
            || entry.signature != key.signature
            || entry.doc_in != key.doc_in
            || entry.page_in != key.page_in
        {
            log::debug!("Cache entry for {} is stale", key.stage);
            return None;
        }

        let doc_out = serde_json::from_value(entry.doc_out).ok()?;
        let page_out = entry
            .page_out
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<P>, _>>()
            .ok()?;
        Some((doc_out, page_out))
    }

    /// Store the outputs produced for `key`.
    pub fn save<D: Serialize, P: Serialize>(
        &self,
        key: &CacheKey,
        doc_out: &D,
        page_out: &[P],
    ) -> Result<()> {
        let entry = CacheEntry {
            stage: key.stage.clone(),
            signature: key.signature.clone(),
            doc_in: key.doc_in.clone(),
            page_in: key.page_in.clone(),
            doc_out: serde_json::to_value(doc_out)?,
            page_out: page_out
                .iter()
                .map(serde_json::to_value)
                .collect::<std::result::Result<_, _>>()?,
        };

        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_vec(&entry)?)?;
        Ok(())
    }

    /// Hit and miss counts so far.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(doc_in: &str) -> CacheKey {
        CacheKey::new("doc", "shot", "1".into(), &doc_in, &[1u32, 2u32]).unwrap()
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let cache = StageCache::new(dir.path());

        assert!(cache.load::<String, u32>(&key("a")).is_none());
        cache.save(&key("a"), &"out".to_string(), &[7u32, 8u32]).unwrap();

        let (doc, pages) = cache.load::<String, u32>(&key("a")).unwrap();
        assert_eq!(doc, "out");
        assert_eq!(pages, vec![7, 8]);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
        assert!(dir.path().join("doc").join("shot.json").exists());
    }

    #[test]
    fn test_changed_input_misses() {
        let dir = TempDir::new().unwrap();
        let cache = StageCache::new(dir.path());
        cache.save(&key("a"), &0u8, &[0u8]).unwrap();

        assert!(cache.load::<u8, u8>(&key("b")).is_none());

        let mut bumped = key("a");
        bumped.signature = "2".into();
        assert!(cache.load::<u8, u8>(&bumped).is_none());
    }

    #[test]
    fn test_corrupt_entry_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = StageCache::new(dir.path());
        let k = key("a");
        let path = cache.entry_path(&k);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();

        assert!(cache.load::<u8, u8>(&k).is_none());
    }

    #[test]
    fn test_float_outputs_load_bit_exact() {
        use crate::model::Rect;

        let dir = TempDir::new().unwrap();
        let cache = StageCache::new(dir.path());

        // Page-scale coordinates with full-precision fractions.
        let mut seed: u64 = 0x9e37_79b9_7f4a_7c15;
        let mut next = || {
            seed = seed
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (seed >> 11) as f64 / (1u64 << 53) as f64 * 800.0
        };
        let rects: Vec<Rect> = (0..2000)
            .map(|_| Rect::new(next(), next(), next(), next()))
            .collect();
        let core = 118.11950397160761_f64;

        cache.save(&key("a"), &core, &rects).unwrap();
        let (doc, pages) = cache.load::<f64, Rect>(&key("a")).unwrap();

        assert_eq!(doc.to_bits(), core.to_bits());
        assert_eq!(pages.len(), rects.len());
        for (loaded, saved) in pages.iter().zip(&rects) {
            let bits = |r: &Rect| [r.x0, r.y0, r.x1, r.y1].map(f64::to_bits);
            assert_eq!(bits(loaded), bits(saved));
        }
    }
}
