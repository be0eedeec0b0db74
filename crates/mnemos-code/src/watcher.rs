//! File-watch-triggered re-indexing (spec.md §4.C10: "runs on demand and
//! on file-watch events", §5: "File-watcher-driven code re-indexing"),
//! grounded on `codescope-core`'s `watch.rs` debounce loop.

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Paths in `pending` whose last-seen time is at or before `now - debounce`
/// (i.e. the burst they were part of has gone quiet), removed from
/// `pending` as they're returned.
fn drain_settled(pending: &mut HashMap<PathBuf, Instant>, debounce: Duration, now: Instant) -> Vec<PathBuf> {
    let cutoff = now - debounce;
    let settled: Vec<PathBuf> = pending.iter().filter(|(_, seen)| **seen <= cutoff).map(|(path, _)| path.clone()).collect();
    for path in &settled {
        pending.remove(path);
    }
    settled
}

/// Watches `project_root` for filesystem events and calls `on_settled`
/// once a burst of changes has been quiet for `debounce` — never more
/// often than that, however many files changed in between.
///
/// Blocks the calling thread; intended to run on a dedicated worker
/// thread/task spawned by `mnemos-runtime`.
pub fn watch_and_reindex(project_root: &Path, debounce: Duration, mut on_settled: impl FnMut(&[PathBuf])) -> notify::Result<()> {
    let (tx, rx) = mpsc::channel::<Event>();
    let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;
    watcher.watch(project_root, RecursiveMode::Recursive)?;

    let mut pending: HashMap<PathBuf, Instant> = HashMap::new();
    loop {
        match rx.recv_timeout(debounce) {
            Ok(event) => {
                for path in event.paths {
                    if path.extension().and_then(|e| e.to_str()) == Some("py") {
                        pending.insert(path, Instant::now());
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(()),
        }

        let settled = drain_settled(&mut pending, debounce, Instant::now());
        if !settled.is_empty() {
            on_settled(&settled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_settled_only_returns_paths_older_than_debounce() {
        let debounce = Duration::from_millis(50);
        let mut pending = HashMap::new();
        let old = PathBuf::from("old.py");
        let fresh = PathBuf::from("fresh.py");
        let now = Instant::now();
        pending.insert(old.clone(), now - Duration::from_millis(100));
        pending.insert(fresh.clone(), now);

        let settled = drain_settled(&mut pending, debounce, now);
        assert_eq!(settled, vec![old]);
        assert!(pending.contains_key(&fresh));
        assert!(!pending.contains_key(&PathBuf::from("old.py")));
    }

    #[test]
    fn drain_settled_is_empty_when_all_paths_are_fresh() {
        let debounce = Duration::from_millis(500);
        let mut pending = HashMap::new();
        pending.insert(PathBuf::from("fresh.py"), Instant::now());
        assert!(drain_settled(&mut pending, debounce, Instant::now()).is_empty());
    }
}
