//! Serve the built site (`browserSync`).

use std::sync::Arc;

use anyhow::Result;
use pipewright_server::DevServer;
use pipewright_static::PipelineConfig;

/// Serve the destination root with live reload until Ctrl-C.
pub async fn run(config: Arc<PipelineConfig>) -> Result<()> {
    let server = DevServer::new(config.server.clone(), config.dirs.dest.clone());

    tokio::select! {
        result = server.start() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Stopping server"),
    }

    Ok(())
}
