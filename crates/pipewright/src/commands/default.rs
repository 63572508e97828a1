//! Build, serve and watch: the command run when none is given.

use std::sync::Arc;

use anyhow::{Context, Result};
use pipewright_server::DevServer;
use pipewright_static::{Pipeline, PipelineConfig};

/// Build once, then serve and watch until Ctrl-C. A failed initial build
/// does not stop the server; the watcher rebuilds the stage once its
/// sources change.
pub async fn run(config: Arc<PipelineConfig>) -> Result<()> {
    let server = DevServer::new(config.server.clone(), config.dirs.dest.clone());
    let pipeline =
        Arc::new(Pipeline::new(Arc::clone(&config))?.with_notifier(Arc::new(server.hub().clone())));

    if pipeline.build().await.is_err() {
        tracing::warn!("Initial build incomplete, serving and watching anyway");
    }

    let listener = server.bind().await?;
    let serving = tokio::spawn(server.serve(listener));

    tokio::select! {
        result = pipewright_server::watch(pipeline) => result?,
        result = serving => result.context("Server task panicked")??,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}
