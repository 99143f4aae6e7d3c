// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::warn;

use crate::config::AppConfig;
use crate::rag::{RagError, RagPipeline, UploadedFile};

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// PDF files to index
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Question about the indexed PDFs
    pub question: String,

    /// Number of passages to retrieve
    #[arg(long)]
    pub top_k: Option<usize>,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print status as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn process(config: &AppConfig, args: ProcessArgs) -> Result<()> {
    let pipeline = RagPipeline::from_config(config).await?;

    let mut uploads = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        uploads.push(UploadedFile::new(file_name, bytes));
    }

    println!("📄 Processing {} PDF(s)...", uploads.len());
    let summary = pipeline
        .process_documents(uploads)
        .await
        .map_err(user_error)?;

    println!("✅ {}", summary.message);
    for doc in &summary.documents {
        println!("   {}: {} pages, {} chunks", doc.file_name, doc.pages, doc.chunks);
    }
    println!(
        "   Index saved to {} ({} chunks, {}ms)",
        config.rag.index_dir.display(),
        summary.chunk_count,
        summary.elapsed_ms
    );
    Ok(())
}

pub async fn ask(config: &AppConfig, args: AskArgs) -> Result<()> {
    let pipeline = RagPipeline::from_config(config).await?;
    pipeline.load_existing().await.map_err(user_error)?;

    let answer = pipeline
        .ask(&args.question, args.top_k)
        .await
        .map_err(user_error)?;

    println!("🤖 Reply:\n{}\n", answer.answer);
    println!("Sources:");
    for source in &answer.sources {
        println!(
            "   {} (chunk {}, pages {}-{}, score {:.3})",
            source.file_name, source.chunk_index, source.page_start, source.page_end, source.score
        );
    }
    Ok(())
}

pub async fn status(config: &AppConfig, args: StatusArgs) -> Result<()> {
    let pipeline = RagPipeline::from_config(config).await?;
    if let Err(e) = pipeline.load_existing().await {
        warn!("Saved index could not be loaded: {}", e);
    }
    let status = pipeline.status().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    if status.api_key_configured {
        println!("✅ API Key Loaded");
    } else {
        println!("⚠️  Add GOOGLE_API_KEY to .env file");
    }
    if status.index_ready {
        println!(
            "📚 Index ready: {} document(s), {} chunks",
            status.document_count, status.chunk_count
        );
        for doc in &status.documents {
            println!("   {}", doc);
        }
    } else {
        println!("📁 {}", crate::rag::INDEX_NOT_READY_MESSAGE);
    }
    println!("   Embedding model: {}", status.embedding_model);
    if let Some(model) = &status.completion_model {
        println!("   Completion model: {}", model);
    }
    Ok(())
}

fn user_error(err: RagError) -> anyhow::Error {
    anyhow::anyhow!("{} ({})", err.user_message(), err.error_code())
}
