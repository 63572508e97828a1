//! Asset pipeline for pipewright.
//!
//! Maps source globs to destinations, runs the per-kind transform stages and
//! sequences them into a full build.

pub mod clean;
pub mod config;
pub mod error;
pub mod globs;
pub mod orchestrator;
pub mod paths;
pub mod reload;
pub mod report;
pub mod stage;

pub use config::{DirsConfig, Mode, PipelineConfig, ServerConfig, StylesConfig, WatchConfig};
pub use error::{error_chain, BuildError, StageError};
pub use globs::SourceGlob;
pub use orchestrator::{BuildSummary, Pipeline, Task, BUILD_ORDER};
pub use paths::{AssetKind, PathEntry, PathTable};
pub use reload::{NoopNotifier, ReloadEvent, ReloadNotifier};
pub use report::{human_size, StageReport};

pub use pipewright_assets::{ImageOptimizer, RasterFormat, RasterOptimizer, TransformError};
