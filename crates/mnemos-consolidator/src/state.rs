//! Consolidator checkpoint (spec.md §6 `.traitement_state.json`): the
//! set of already-processed `historique/` filenames plus the last run
//! timestamp, persisted atomically so a crash mid-run never loses or
//! duplicates work (spec.md §8 property 9).

use chrono::{DateTime, Utc};
use mnemos_core::prelude::MnemosError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatorState {
    #[serde(default)]
    pub processed_filenames: HashSet<String>,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
}

impl Default for ConsolidatorState {
    fn default() -> Self {
        Self { processed_filenames: HashSet::new(), last_run: None }
    }
}

impl ConsolidatorState {
    #[must_use]
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path).ok().and_then(|raw| serde_json::from_str(&raw).ok()).unwrap_or_default()
    }

    /// `last_run` is missing or older than `stale_after_hours` (spec.md
    /// §4.C11 "Background boot": "last run is older than 45 hours").
    #[must_use]
    pub fn is_stale(&self, stale_after_hours: i64) -> bool {
        match self.last_run {
            None => true,
            Some(last) => Utc::now().signed_duration_since(last).num_hours() > stale_after_hours,
        }
    }

    /// Writes the state atomically: serialise to a sibling temp file,
    /// then rename over the real path, so a crash never leaves a
    /// half-written state file behind.
    pub fn persist(&self, path: &Path) -> Result<(), MnemosError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}
