// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PDF Genie CLI
#[derive(Parser, Debug)]
#[command(name = "pdf-genie-cli")]
#[command(version)]
#[command(about = "Index PDFs and ask questions about them from the terminal", long_about = None)]
pub struct Cli {
    /// Directory holding the persisted index (overrides INDEX_DIR)
    #[arg(long, global = true)]
    pub index_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the index from local PDF files, replacing any existing index
    Process(commands::ProcessArgs),

    /// Answer a question from the persisted index
    Ask(commands::AskArgs),

    /// Show index and API key status
    Status(commands::StatusArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = crate::config::AppConfig::from_env();
    if let Some(dir) = cli.index_dir {
        config.rag.index_dir = dir;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    match cli.command {
        Commands::Process(args) => commands::process(&config, args).await,
        Commands::Ask(args) => commands::ask(&config, args).await,
        Commands::Status(args) => commands::status(&config, args).await,
    }
}
