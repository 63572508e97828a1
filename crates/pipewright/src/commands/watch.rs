//! Watch sources and re-run stages.

use std::sync::Arc;

use anyhow::Result;
use pipewright_static::{Pipeline, PipelineConfig};

/// Watch until Ctrl-C. No server is running, so nothing is reloaded.
pub async fn run(config: Arc<PipelineConfig>) -> Result<()> {
    let pipeline = Arc::new(Pipeline::new(config)?);

    tokio::select! {
        result = pipewright_server::watch(pipeline) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Stopping watcher"),
    }

    Ok(())
}
