//! `mnemos-runtime` (spec.md §1: "packaging/CLI glue... out of scope;
//! specified only where they act as external collaborators"):
//! assembles every agent, spawns the background workers spec.md §5
//! lists, and drives the turn loop from stdin. Grounded on
//! `llmspell-cli::main` (tracing init before config load,
//! `anyhow::Result` at the top level, config loaded before any agent
//! is constructed).

mod background;
mod boot;
mod cli;
mod repl;

use clap::Parser;
use cli::{Cli, Command};
use mnemos_core::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let runtime = boot::assemble(&cli.memory_root, &cli.config_dir, &cli.project_root).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::ReindexCode => {
            runtime.code.index_project(&runtime.project_root)?;
            tracing::info!("code subsystem re-indexed");
        }
        Command::Consolidate => {
            let worker = mnemos_consolidator::ConsolidatorWorker::new(
                runtime.paths.clone(),
                runtime.memory.clone(),
                runtime.small_client.clone(),
                runtime.consolidator_config.processeur_persistante.timeout_session_heures,
            );
            let report = worker.run_once().await?;
            tracing::info!(
                sessions = report.sessions_processed,
                summaries = report.summaries_written,
                dataset_records = report.dataset_records_written,
                "consolidation pass completed"
            );
        }
        Command::Serve => {
            background::spawn_consolidator(&runtime);
            background::spawn_system_summary_seed(&runtime);
            background::spawn_code_watcher(&runtime);
            background::spawn_stats_sync(&runtime);

            repl::run(runtime.orchestrator.clone()).await;
        }
    }

    Ok(())
}
