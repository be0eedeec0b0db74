//! Command-line surface (SPEC_FULL.md ambient stack: "a thin
//! `mnemos-runtime` binary using `clap` (derive) to select a memory
//! root, config directory, and log level"), grounded on
//! `llmspell-cli::cli::Cli`'s derive shape.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mnemos", version, about = "Local multi-agent cognitive runtime")]
pub struct Cli {
    /// Root directory for all persisted memory artefacts (spec.md §6 on-disk layout).
    #[arg(long, env = "MNEMOS_MEMORY_ROOT", default_value = "./mnemos_data")]
    pub memory_root: PathBuf,

    /// Directory holding one YAML file per component (spec.md §6 configuration).
    #[arg(long, env = "MNEMOS_CONFIG_DIR", default_value = "./mnemos_config")]
    pub config_dir: PathBuf,

    /// Project checkout the code subsystem (§4.C10) scans and watches.
    #[arg(long, env = "MNEMOS_PROJECT_ROOT", default_value = ".")]
    pub project_root: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Boot every agent, spawn the background workers, and read turns
    /// from stdin until EOF (the default when no subcommand is given).
    Serve,
    /// Run one code-subsystem indexing pass (spec.md §4.C10 step 1-8)
    /// and exit, without entering the turn loop.
    ReindexCode,
    /// Run one deferred-consolidation pass (spec.md §4.C13) and exit.
    Consolidate,
}
