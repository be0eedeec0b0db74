//! HNSW index wrapper, adapted directly from `vestige-core`'s
//! `search::vector::VectorIndex` (key/id mapping, reserve-before-add to
//! dodge usearch segfaults on capacity overrun, sidecar `.mappings.json`
//! persistence).

use mnemos_core::MnemosError;
use std::collections::HashMap;
use std::path::Path;
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::encoder::EMBEDDING_DIMENSIONS;

const DEFAULT_CONNECTIVITY: usize = 16;
const DEFAULT_EXPANSION_ADD: usize = 128;
const DEFAULT_EXPANSION_SEARCH: usize = 64;

fn index_options() -> IndexOptions {
    IndexOptions {
        dimensions: EMBEDDING_DIMENSIONS,
        metric: MetricKind::Cos,
        quantization: ScalarKind::I8,
        connectivity: DEFAULT_CONNECTIVITY,
        expansion_add: DEFAULT_EXPANSION_ADD,
        expansion_search: DEFAULT_EXPANSION_SEARCH,
        multi: false,
    }
}

/// Thin HNSW wrapper keyed on opaque string ids (the Interaction/atom
/// `path` or `id` the caller already tracks).
pub struct HnswIndex {
    index: Index,
    key_to_id: HashMap<String, u64>,
    id_to_key: HashMap<u64, String>,
    next_id: u64,
}

impl HnswIndex {
    pub fn new() -> Result<Self, MnemosError> {
        let index = Index::new(&index_options()).map_err(|e| MnemosError::storage(format!("vector index creation failed: {e}")))?;
        Ok(Self { index, key_to_id: HashMap::new(), id_to_key: HashMap::new(), next_id: 0 })
    }

    pub fn len(&self) -> usize {
        self.index.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_capacity(&self) -> Result<(), MnemosError> {
        let capacity = self.index.capacity();
        let size = self.index.size();
        if size >= capacity {
            let new_capacity = std::cmp::max(capacity * 2, 16);
            self.index.reserve(new_capacity).map_err(|e| MnemosError::storage(format!("reserve failed: {e}")))?;
        }
        Ok(())
    }

    pub fn add(&mut self, key: &str, vector: &[f32]) -> Result<(), MnemosError> {
        if vector.len() != EMBEDDING_DIMENSIONS {
            return Err(MnemosError::storage(format!("expected {EMBEDDING_DIMENSIONS}-d vector, got {}", vector.len())));
        }

        if let Some(&existing_id) = self.key_to_id.get(key) {
            self.index.remove(existing_id).map_err(|e| MnemosError::storage(format!("remove-before-update failed: {e}")))?;
            self.ensure_capacity()?;
            self.index.add(existing_id, vector).map_err(|e| MnemosError::storage(format!("re-add failed: {e}")))?;
            return Ok(());
        }

        self.ensure_capacity()?;
        let id = self.next_id;
        self.next_id += 1;
        self.index.add(id, vector).map_err(|e| MnemosError::storage(format!("add failed: {e}")))?;
        self.key_to_id.insert(key.to_string(), id);
        self.id_to_key.insert(id, key.to_string());
        Ok(())
    }

    /// Searches for the `limit` nearest keys. Converts cosine distance
    /// into a `(0, 1]` similarity score via `1.0 - distance`
    /// (DESIGN.md Open Question #1).
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<(String, f32)>, MnemosError> {
        if query.len() != EMBEDDING_DIMENSIONS {
            return Err(MnemosError::storage(format!("expected {EMBEDDING_DIMENSIONS}-d query, got {}", query.len())));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let results = self.index.search(query, limit).map_err(|e| MnemosError::storage(format!("search failed: {e}")))?;
        let mut out = Vec::with_capacity(results.keys.len());
        for (id, distance) in results.keys.iter().zip(results.distances.iter()) {
            if let Some(key) = self.id_to_key.get(id) {
                out.push((key.clone(), 1.0 - distance));
            }
        }
        Ok(out)
    }

    pub fn save(&self, path: &Path) -> Result<(), MnemosError> {
        let path_str = path.to_str().ok_or_else(|| MnemosError::storage("non-utf8 index path"))?;
        self.index.save(path_str).map_err(|e| MnemosError::storage(format!("index save failed: {e}")))?;

        let mappings_path = path.with_extension("mappings.json");
        let mappings = serde_json::json!({ "key_to_id": self.key_to_id, "next_id": self.next_id });
        let serialized = serde_json::to_string(&mappings).map_err(|e| MnemosError::storage(format!("mappings serialize failed: {e}")))?;
        std::fs::write(&mappings_path, serialized).map_err(|e| MnemosError::storage(format!("mappings write failed: {e}")))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, MnemosError> {
        let path_str = path.to_str().ok_or_else(|| MnemosError::storage("non-utf8 index path"))?;
        let index = Index::new(&index_options()).map_err(|e| MnemosError::storage(format!("vector index creation failed: {e}")))?;
        index.load(path_str).map_err(|e| MnemosError::storage(format!("index load failed: {e}")))?;

        let mappings_path = path.with_extension("mappings.json");
        let raw = std::fs::read_to_string(&mappings_path).map_err(|e| MnemosError::storage(format!("mappings read failed: {e}")))?;
        let parsed: serde_json::Value = serde_json::from_str(&raw).map_err(|e| MnemosError::storage(format!("mappings parse failed: {e}")))?;
        let key_to_id: HashMap<String, u64> =
            serde_json::from_value(parsed["key_to_id"].clone()).map_err(|e| MnemosError::storage(format!("mappings parse failed: {e}")))?;
        let next_id = parsed["next_id"].as_u64().ok_or_else(|| MnemosError::storage("mappings missing next_id"))?;
        let id_to_key = key_to_id.iter().map(|(k, &v)| (v, k.clone())).collect();

        Ok(Self { index, key_to_id, id_to_key, next_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_vector(seed: f32) -> Vec<f32> {
        (0..EMBEDDING_DIMENSIONS).map(|i| ((i as f32 + seed) / EMBEDDING_DIMENSIONS as f32).sin()).collect()
    }

    #[test]
    fn add_and_search_roundtrip() {
        let mut index = HnswIndex::new().unwrap();
        index.add("a", &fake_vector(1.0)).unwrap();
        index.add("b", &fake_vector(50.0)).unwrap();
        let results = index.search(&fake_vector(1.0), 1).unwrap();
        assert_eq!(results[0].0, "a");
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let mut index = HnswIndex::new().unwrap();
        assert!(index.add("a", &[1.0, 2.0]).is_err());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.ann");
        let mut index = HnswIndex::new().unwrap();
        index.add("a", &fake_vector(1.0)).unwrap();
        index.save(&path).unwrap();

        let loaded = HnswIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        let results = loaded.search(&fake_vector(1.0), 1).unwrap();
        assert_eq!(results[0].0, "a");
    }
}
