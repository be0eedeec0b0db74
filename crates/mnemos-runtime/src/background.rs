//! Background workers (spec.md §5 "Background workers (parallel)",
//! §4.C11 "Background boot"): each spawned as its own detached task,
//! one `tokio::spawn` per long-lived concern rather than a single
//! scheduler loop.

use crate::boot::Runtime;
use mnemos_code::watch_and_reindex;
use mnemos_consolidator::state::ConsolidatorState;
use mnemos_consolidator::ConsolidatorWorker;
use std::time::Duration;

const STATS_SYNC_WARMUP: Duration = Duration::from_secs(60);
const STATS_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Runs the deferred consolidator once at boot if its checkpoint is
/// missing or stale (spec.md §4.C11 "Background boot": "If the
/// deferred consolidator's state file is missing or its last run is
/// older than 45 hours, schedule a background run"), then keeps
/// re-checking on the same interval used to judge staleness so a
/// long-lived process doesn't need a restart to pick up new sessions.
pub fn spawn_consolidator(runtime: &Runtime) {
    let paths = runtime.paths.clone();
    let memory = runtime.memory.clone();
    let client = runtime.small_client.clone();
    let stale_after_hours = runtime.orchestrator_config.consolidator_stale_after_hours;
    let timeout_hours = runtime.consolidator_config.processeur_persistante.timeout_session_heures;

    tokio::spawn(async move {
        let worker = ConsolidatorWorker::new(paths.clone(), memory, client, timeout_hours);
        loop {
            let state = ConsolidatorState::load(&paths.traitement_state());
            if state.is_stale(stale_after_hours) {
                match worker.run_once().await {
                    Ok(report) => tracing::info!(
                        sessions = report.sessions_processed,
                        summaries = report.summaries_written,
                        dataset_records = report.dataset_records_written,
                        "deferred consolidation pass completed"
                    ),
                    Err(e) => tracing::warn!(error = %e, "deferred consolidation pass failed"),
                }
            }
            tokio::time::sleep(Duration::from_secs(u64::try_from(stale_after_hours.max(1)).unwrap_or(45) * 3600)).await;
        }
    });
}

/// Ensures `system_summary` exists at cold-start (spec.md §4.C11
/// "Background boot": "If not, generate it in a background thread
/// (read the first 5 non-empty lines of the agent's history and todo
/// markdown files; compose a fixed template; write it)").
pub fn spawn_system_summary_seed(runtime: &Runtime) {
    let memory_root = runtime.paths.root().to_path_buf();
    let summary_path = memory_root.join(&runtime.orchestrator_config.system_summary_path);
    let seed_lines = runtime.orchestrator_config.system_summary_seed_lines;

    tokio::spawn(async move {
        if summary_path.is_file() {
            return;
        }
        tokio::task::spawn_blocking(move || {
            let history_excerpt = first_non_empty_lines(&memory_root.join("connaissances/history.md"), seed_lines);
            let todo_excerpt = first_non_empty_lines(&memory_root.join("connaissances/todo.md"), seed_lines);
            let generated = format!(
                "# System summary\n\nGenerated at cold start because no prior summary was found.\n\n## Recent history\n{}\n\n## Open items\n{}\n",
                if history_excerpt.is_empty() { "(none recorded yet)".to_string() } else { history_excerpt.join("\n") },
                if todo_excerpt.is_empty() { "(none recorded yet)".to_string() } else { todo_excerpt.join("\n") },
            );
            if let Some(parent) = summary_path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Err(e) = std::fs::write(&summary_path, generated) {
                tracing::warn!(error = %e, path = %summary_path.display(), "failed to seed system_summary");
            } else {
                tracing::info!(path = %summary_path.display(), "seeded system_summary from history/todo excerpts");
            }
        })
        .await
        .ok();
    });
}

fn first_non_empty_lines(path: &std::path::Path, n: usize) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(n)
        .map(str::to_string)
        .collect()
}

/// Watches the project checkout and re-indexes the code subsystem
/// whenever a burst of file changes goes quiet (spec.md §4.C10
/// "Worker pipeline: runs on demand and on file-watch events", §5
/// "File-watcher-driven code re-indexing"). Blocks a dedicated OS
/// thread — `notify`'s watcher callback is synchronous.
pub fn spawn_code_watcher(runtime: &Runtime) {
    let code_for_watch = runtime.code.clone();
    let watch_root = runtime.project_root.clone();
    let debounce = Duration::from_millis(runtime.code_config.watch_debounce_ms);

    std::thread::spawn(move || {
        // Initial full index so the first turn already has code context,
        // rather than waiting for the first file-change event. Run on
        // this dedicated thread too, since a cold scan of a large
        // project can take seconds.
        if let Err(e) = code_for_watch.index_project(&watch_root) {
            tracing::warn!(error = %e, "initial code index failed");
        }

        let result = watch_and_reindex(&watch_root, debounce, |changed| {
            tracing::debug!(files = changed.len(), "settled file-change burst, re-indexing code subsystem");
            if let Err(e) = code_for_watch.refresh_index(&watch_root) {
                tracing::warn!(error = %e, "file-watch-triggered code re-index failed");
            }
        });
        if let Err(e) = result {
            tracing::warn!(error = %e, "code file watcher terminated");
        }
    });
}

/// Periodic classification-counts sync (spec.md §5: "Periodic stats
/// synchronisation (every 5 minutes after a 60-second warm-up)"). Logs
/// the snapshot — `rechercher_by_classification` is kept as an
/// optional analytics API (DESIGN.md Open Question 2), so this worker
/// is its only caller in the core runtime.
pub fn spawn_stats_sync(runtime: &Runtime) {
    let retrieval = runtime.retrieval.clone();
    tokio::spawn(async move {
        tokio::time::sleep(STATS_SYNC_WARMUP).await;
        loop {
            let counts = retrieval.classification_counts(None);
            tracing::info!(
                total = counts.total,
                subjects = counts.by_subject.len(),
                actions = counts.by_action.len(),
                categories = counts.by_category.len(),
                "periodic classification stats sync"
            );
            tokio::time::sleep(STATS_SYNC_INTERVAL).await;
        }
    });
}
