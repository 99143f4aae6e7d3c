// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use pdf_genie::{
    api::{ApiConfig, ApiServer},
    config::AppConfig,
    rag::RagPipeline,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; GOOGLE_API_KEY usually lives there
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("🚀 Starting {}...\n", pdf_genie::version::get_version_string());

    let config = AppConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    if config.has_api_key() {
        println!("✅ Google Gemini API key found");
    } else {
        println!("⚠️  GOOGLE_API_KEY not found in .env file; questions are disabled");
    }

    println!("🧠 Initializing embedding model...");
    let pipeline = Arc::new(RagPipeline::from_config(&config).await?);
    println!("✅ Pipeline ready ({:?})", pipeline.config().index_dir);

    match pipeline.load_existing().await {
        Ok(true) => {
            let status = pipeline.status().await;
            info!(
                "📂 Loaded saved index: {} document(s), {} chunks",
                status.document_count, status.chunk_count
            );
        }
        Ok(false) => info!("📁 No saved index; upload and process PDFs to start chatting"),
        Err(e) => warn!("⚠️  Saved index ignored: {}", e.user_message()),
    }

    let server = ApiServer::start(ApiConfig::from(&config), pipeline).await?;
    println!("🌐 Open http://{}/ in your browser", server.local_addr());
    println!("\nPress Ctrl+C to shutdown...");

    signal::ctrl_c().await?;
    println!("\n🛑 Shutting down...");
    server.shutdown().await;

    Ok(())
}
