//! Rebuild the knowledge-base index from the command line.
//!
//! Run with: cargo run -p amitybot-web --bin embed-kb

use amitybot_common::Config;
use anyhow::Context;
use amitybot_kb::{build_embedder, KbIndexer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load().context("loading configuration")?;
    let embedder = build_embedder(&config.embedding, &config.llm);
    info!(
        embedder = %embedder.id(),
        data_dir = %config.kb.data_dir.display(),
        store_dir = %config.kb.store_dir.display(),
        "Rebuilding knowledge base"
    );

    let indexer = KbIndexer::new(config.kb.clone(), embedder);
    match indexer.rebuild().await {
        Ok(report) => {
            info!(
                documents = report.documents,
                chunks = report.chunks,
                dimension = report.dimension,
                duration_ms = report.duration_ms,
                "✅ Knowledge base rebuilt"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "❌ Knowledge base rebuild failed");
            std::process::exit(1);
        }
    }
}
