//! `VectorStore` (spec.md §4.C2): a vector index plus a parallel,
//! identically-indexed metadata list, persisted together, with a
//! corruption check on load.

use chrono::Utc;
use mnemos_core::MnemosError;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::encoder::SentenceEncoder;
use crate::index::HnswIndex;

/// Flexible metadata record, mirroring the original system's dict-shaped
/// meta: every fragment at minimum carries `content`, with `len` and
/// `timestamp` filled in if the caller didn't supply them.
pub type Meta = Map<String, Value>;

/// Which of the two stores this instance is (spec.md §4.C2: "one
/// narrative (memories), one legislative (rules)"). Kept only for
/// diagnostics/logging — the two stores never share state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Narrative,
    Legislative,
}

impl StoreKind {
    fn as_str(self) -> &'static str {
        match self {
            StoreKind::Narrative => "narrative",
            StoreKind::Legislative => "legislative",
        }
    }
}

struct Inner {
    index: HnswIndex,
    metadata: Vec<Meta>,
    keys: Vec<String>,
}

/// A single scored search hit.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub score: f32,
    pub meta: Meta,
}

/// One ANN index + parallel metadata, persisted to two sidecar files
/// (`index.{ann}` and `metadata.json` per spec.md §6).
pub struct VectorStore {
    kind: StoreKind,
    encoder: Arc<dyn SentenceEncoder>,
    inner: RwLock<Inner>,
    index_path: PathBuf,
    metadata_path: PathBuf,
}

impl VectorStore {
    /// Opens (or creates) a store rooted at `dir`, named `index.ann` +
    /// `metadata.json`. Returns `MnemosError::IndexCorruption` if an
    /// existing index and metadata file disagree on length (spec.md
    /// §4.C2: "the index and meta list must always stay equal-length").
    pub fn open(dir: &Path, kind: StoreKind, encoder: Arc<dyn SentenceEncoder>) -> Result<Self, MnemosError> {
        std::fs::create_dir_all(dir)?;
        let index_path = dir.join("index.ann");
        let metadata_path = dir.join("metadata.json");

        let (index, metadata, keys) = if index_path.is_file() && metadata_path.is_file() {
            let index = HnswIndex::load(&index_path)?;
            let raw = std::fs::read_to_string(&metadata_path)?;
            let parsed: MetadataFile = serde_json::from_str(&raw).map_err(|e| MnemosError::storage(format!("metadata parse failed: {e}")))?;
            if parsed.metadata.len() != index.len() {
                return Err(MnemosError::index_corruption(format!(
                    "{} store: index has {} vectors but metadata has {} entries",
                    kind.as_str(),
                    index.len(),
                    parsed.metadata.len()
                )));
            }
            (index, parsed.metadata, parsed.keys)
        } else {
            (HnswIndex::new()?, Vec::new(), Vec::new())
        };

        Ok(Self { kind, encoder, inner: RwLock::new(Inner { index, metadata, keys }), index_path, metadata_path })
    }

    #[must_use]
    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.inner.read().metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `add_fragment` (spec.md §4.C2). No-op on empty text. Fills in
    /// `content`, `len`, and `timestamp` when absent, then persists.
    pub fn add_fragment(&self, text: &str, mut meta: Meta, key: impl Into<String>) -> Result<(), MnemosError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let key = key.into();
        let vector = self.encoder.encode(text)?;

        meta.entry("content".to_string()).or_insert_with(|| Value::String(text.to_string()));
        meta.entry("len".to_string()).or_insert_with(|| Value::Number(text.chars().count().into()));
        meta.entry("timestamp".to_string()).or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

        {
            let mut inner = self.inner.write();
            inner.index.add(&key, &vector)?;
            if let Some(pos) = inner.keys.iter().position(|k| k == &key) {
                inner.metadata[pos] = meta;
            } else {
                inner.keys.push(key);
                inner.metadata.push(meta);
            }
        }
        self.persist()
    }

    /// `search` (spec.md §4.C2). Returns `[]` on an empty store.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<VectorHit>, MnemosError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.encoder.encode(query)?;
        let inner = self.inner.read();
        let hits = inner.index.search(&vector, k)?;
        let mut out = Vec::with_capacity(hits.len());
        for (key, score) in hits {
            if let Some(pos) = inner.keys.iter().position(|candidate| candidate == &key) {
                out.push(VectorHit { score, meta: inner.metadata[pos].clone() });
            }
        }
        Ok(out)
    }

    /// Best-effort persistence: logged on failure, never propagated
    /// (spec.md §4.C2: "persistence errors are logged but do not raise").
    fn persist(&self) -> Result<(), MnemosError> {
        let inner = self.inner.read();
        if let Err(e) = inner.index.save(&self.index_path) {
            tracing::warn!(store = self.kind.as_str(), error = %e, "vector index persistence failed");
            return Ok(());
        }
        let file = MetadataFile { keys: inner.keys.clone(), metadata: inner.metadata.clone() };
        match serde_json::to_string(&file) {
            Ok(serialized) => {
                if let Err(e) = std::fs::write(&self.metadata_path, serialized) {
                    tracing::warn!(store = self.kind.as_str(), error = %e, "vector metadata persistence failed");
                }
            }
            Err(e) => tracing::warn!(store = self.kind.as_str(), error = %e, "vector metadata serialization failed"),
        }
        Ok(())
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct MetadataFile {
    keys: Vec<String>,
    metadata: Vec<Meta>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::HashingEncoder;

    fn store(dir: &Path) -> VectorStore {
        VectorStore::open(dir, StoreKind::Narrative, Arc::new(HashingEncoder)).unwrap()
    }

    #[test]
    fn empty_text_is_a_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        store.add_fragment("   ", Map::new(), "k1").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn add_fragment_fills_content_len_timestamp() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        store.add_fragment("hello there", Map::new(), "k1").unwrap();
        let hits = store.search("hello there", 1).unwrap();
        assert_eq!(hits[0].meta["content"], Value::String("hello there".to_string()));
        assert!(hits[0].meta.contains_key("len"));
        assert!(hits[0].meta.contains_key("timestamp"));
    }

    #[test]
    fn search_on_empty_store_returns_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        assert!(store.search("anything", 5).unwrap().is_empty());
    }

    #[test]
    fn reopen_detects_length_mismatch_as_corruption() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let store = store(tmp.path());
            store.add_fragment("one fragment", Map::new(), "k1").unwrap();
        }
        // Corrupt the metadata file by truncating its entries.
        let metadata_path = tmp.path().join("metadata.json");
        std::fs::write(&metadata_path, r#"{"keys": [], "metadata": []}"#).unwrap();

        let reopened = VectorStore::open(tmp.path(), StoreKind::Narrative, Arc::new(HashingEncoder));
        assert!(matches!(reopened, Err(MnemosError::IndexCorruption { .. })));
    }

    #[test]
    fn reopened_store_preserves_search_results() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let store = store(tmp.path());
            store.add_fragment("persisted fragment", Map::new(), "k1").unwrap();
        }
        let reopened = store(tmp.path());
        assert_eq!(reopened.len(), 1);
        let hits = reopened.search("persisted fragment", 1).unwrap();
        assert_eq!(hits.len(), 1);
    }
}
