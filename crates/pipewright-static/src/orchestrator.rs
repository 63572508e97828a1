//! Build orchestration: clean, then every stage in a fixed order.

use std::sync::Arc;
use std::time::Instant;

use pipewright_assets::{CssPipeline, ImageOptimizer, RasterOptimizer};

use crate::clean::clean;
use crate::config::PipelineConfig;
use crate::error::{error_chain, BuildError, StageError};
use crate::paths::{AssetKind, PathTable};
use crate::reload::{NoopNotifier, ReloadNotifier};
use crate::report::StageReport;
use crate::stage::{run_stage, Transformer};

/// Stages in the order a full build runs them, after clean.
pub const BUILD_ORDER: [AssetKind; 4] = [
    AssetKind::Html,
    AssetKind::Js,
    AssetKind::Styles,
    AssetKind::Fonts,
];

/// A named unit of work the command line can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Clean,
    Stage(AssetKind),
    /// Both image stages, concurrently
    Images,
    Build,
}

impl Task {
    pub fn name(self) -> &'static str {
        match self {
            Task::Clean => "clean",
            Task::Stage(kind) => kind.stage_name(),
            Task::Images => "images:build",
            Task::Build => "build",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "clean" => Some(Task::Clean),
            "images:build" => Some(Task::Images),
            "build" => Some(Task::Build),
            other => AssetKind::from_stage_name(other).map(Task::Stage),
        }
    }

    /// The task a change to a file watched by `kind` re-runs.
    pub fn for_change(kind: AssetKind) -> Self {
        if kind.is_image() {
            Task::Images
        } else {
            Task::Stage(kind)
        }
    }
}

/// Result of a full build.
#[derive(Debug)]
pub struct BuildSummary {
    pub reports: Vec<StageReport>,
    pub duration_ms: u64,
}

impl BuildSummary {
    pub fn files(&self) -> usize {
        self.reports.iter().map(|r| r.files.len()).sum()
    }
}

/// The configured pipeline: path table, transforms and reload seam.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    table: PathTable,
    transformer: Transformer,
    notifier: Arc<dyn ReloadNotifier>,
}

/// The one place a failed stage is logged.
fn stage_failed(stage: &'static str, source: StageError) -> BuildError {
    tracing::error!("{}: {}", stage, error_chain(&source));
    BuildError::Stage { stage, source }
}

impl Pipeline {
    pub fn new(config: Arc<PipelineConfig>) -> Result<Self, BuildError> {
        let table =
            PathTable::new(&config.dirs).map_err(|e| BuildError::Config(e.to_string()))?;
        let css = CssPipeline::new(&config.styles.browsers)
            .map_err(|e| BuildError::Config(e.to_string()))?;
        let transformer = Transformer::new(
            config.mode,
            config.dirs.src.clone(),
            css,
            Arc::new(ImageOptimizer::default()),
        );

        Ok(Self {
            config,
            table,
            transformer,
            notifier: Arc::new(NoopNotifier),
        })
    }

    /// Replace the raster optimizer, e.g. with a remote service or a test double.
    pub fn with_raster_optimizer(mut self, optimizer: Arc<dyn RasterOptimizer>) -> Self {
        self.transformer.set_raster(optimizer);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ReloadNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn table(&self) -> &PathTable {
        &self.table
    }

    pub async fn clean(&self) -> Result<(), BuildError> {
        clean(self.table.dest_root())
            .await
            .map_err(|source| stage_failed(Task::Clean.name(), source))
    }

    pub async fn run_stage(&self, kind: AssetKind) -> Result<StageReport, BuildError> {
        let result: Result<StageReport, StageError> = async {
            let entry = self.table.entry(kind)?;
            run_stage(entry, &self.transformer, self.table.dest_root(), &*self.notifier).await
        }
        .await;

        result.map_err(|source| stage_failed(kind.stage_name(), source))
    }

    /// Run the svg and raster stages concurrently; both always finish.
    pub async fn images(&self) -> Result<Vec<StageReport>, BuildError> {
        let (svg, raster) = tokio::join!(
            self.run_stage(AssetKind::ImageSvg),
            self.run_stage(AssetKind::ImageRaster)
        );
        Ok(vec![svg?, raster?])
    }

    /// Run a single task.
    pub async fn run(&self, task: Task) -> Result<Vec<StageReport>, BuildError> {
        match task {
            Task::Clean => self.clean().await.map(|()| Vec::new()),
            Task::Stage(kind) => self.run_stage(kind).await.map(|report| vec![report]),
            Task::Images => self.images().await,
            Task::Build => self.build().await.map(|summary| summary.reports),
        }
    }

    /// Clean, then html, js, styles, fonts and images in order. The first
    /// failing stage aborts the run.
    pub async fn build(&self) -> Result<BuildSummary, BuildError> {
        let start = Instant::now();
        tracing::info!("Building {} in {} mode", self.table.dest_root().display(), self.config.mode);

        self.clean().await?;

        let mut reports = Vec::new();
        for kind in BUILD_ORDER {
            reports.push(self.run_stage(kind).await?);
        }
        reports.extend(self.images().await?);

        let summary = BuildSummary {
            reports,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        tracing::info!("Built {} files in {}ms", summary.files(), summary.duration_ms);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn task_names_round_trip() {
        for name in [
            "clean",
            "build",
            "html:build",
            "js:build",
            "styles:build",
            "fonts:build",
            "images:build",
            "images:svg",
            "images:basic",
        ] {
            assert_eq!(Task::from_name(name).map(Task::name), Some(name));
        }
        assert_eq!(Task::from_name("deploy"), None);
    }

    #[test]
    fn image_changes_rerun_both_image_stages() {
        assert_eq!(Task::for_change(AssetKind::ImageSvg), Task::Images);
        assert_eq!(Task::for_change(AssetKind::ImageRaster), Task::Images);
        assert_eq!(Task::for_change(AssetKind::Styles), Task::Stage(AssetKind::Styles));
    }

    #[test]
    fn fonts_precede_images() {
        assert_eq!(BUILD_ORDER.last(), Some(&AssetKind::Fonts));
    }

    #[test]
    fn rejects_bad_browser_queries() {
        let mut config = PipelineConfig::default();
        config.styles.browsers = vec!["definitely not a browser".to_string()];

        assert!(matches!(
            Pipeline::new(Arc::new(config)),
            Err(BuildError::Config(_))
        ));
    }
}
