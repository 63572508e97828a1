//! One-shot build commands.

use std::sync::Arc;

use anyhow::{Context, Result};
use pipewright_static::{human_size, Pipeline, PipelineConfig, Task};

/// Run a single task and exit.
pub async fn run(config: Arc<PipelineConfig>, task: Task) -> Result<()> {
    let pipeline = Pipeline::new(config)?;

    if task == Task::Build {
        let summary = pipeline.build().await.context("Build failed")?;
        let bytes: u64 = summary.reports.iter().map(|r| r.total()).sum();
        tracing::info!("Output: {} ({})", pipeline.table().dest_root().display(), human_size(bytes));
        return Ok(());
    }

    pipeline
        .run(task)
        .await
        .with_context(|| format!("{} failed", task.name()))?;
    tracing::info!("Finished {}", task.name());

    Ok(())
}
