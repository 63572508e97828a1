//! Transform stages: read matching sources, transform, write, report.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use pipewright_assets::{
    collapse_whitespace, compile_scss, inline_js_comment, line_source_map, minify_js,
    optimize_svg, resolve_source, CssPipeline, RasterFormat, RasterOptimizer, TransformError,
};
use tokio::fs;

use crate::config::Mode;
use crate::error::StageError;
use crate::paths::{AssetKind, PathEntry};
use crate::reload::{ReloadEvent, ReloadNotifier};
use crate::report::StageReport;

/// Applies the per-kind transform chain to a single source file.
#[derive(Clone)]
pub struct Transformer {
    mode: Mode,
    src_root: PathBuf,
    css: Arc<CssPipeline>,
    raster: Arc<dyn RasterOptimizer>,
}

impl Transformer {
    pub fn new(
        mode: Mode,
        src_root: PathBuf,
        css: CssPipeline,
        raster: Arc<dyn RasterOptimizer>,
    ) -> Self {
        Self {
            mode,
            src_root,
            css: Arc::new(css),
            raster,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn set_raster(&mut self, raster: Arc<dyn RasterOptimizer>) {
        self.raster = raster;
    }

    /// Produce the output bytes for one source file.
    pub async fn transform(&self, kind: AssetKind, path: &Path) -> Result<Vec<u8>, StageError> {
        match kind {
            AssetKind::Fonts => read(path).await,
            AssetKind::ImageRaster => {
                let bytes = read(path).await?;
                let format = RasterFormat::from_path(path);
                match format {
                    Some(format) if self.mode.is_production() => {
                        let optimizer = Arc::clone(&self.raster);
                        blocking(path, move || optimizer.optimize(format, &bytes)).await
                    }
                    _ => Ok(bytes),
                }
            }
            AssetKind::Styles => {
                let this = self.clone();
                let owned = path.to_path_buf();
                blocking(path, move || this.styles(&owned)).await
            }
            AssetKind::Html | AssetKind::Js | AssetKind::ImageSvg => {
                let source = fs::read_to_string(path)
                    .await
                    .map_err(|e| StageError::io(path, e))?;
                let this = self.clone();
                let owned = path.to_path_buf();
                blocking(path, move || this.text(kind, &owned, source)).await
            }
        }
    }

    fn text(&self, kind: AssetKind, path: &Path, source: String) -> Result<Vec<u8>, TransformError> {
        let production = self.mode.is_production();
        let output = match kind {
            AssetKind::Html => {
                let assembled = resolve_source(path, &source)?;
                if production {
                    collapse_whitespace(&assembled.code)?
                } else {
                    assembled.code
                }
            }
            AssetKind::Js => {
                let assembled = resolve_source(path, &source)?;
                if production {
                    minify_js(&assembled.code)?
                } else {
                    let map = line_source_map(&assembled, &self.src_root)?;
                    format!("{}{}\n", assembled.code, inline_js_comment(&map))
                }
            }
            AssetKind::ImageSvg if production => optimize_svg(&source)?,
            _ => source,
        };
        Ok(output.into_bytes())
    }

    fn styles(&self, path: &Path) -> Result<Vec<u8>, TransformError> {
        let css = compile_scss(path)?;
        let filename = path
            .strip_prefix(&self.src_root)
            .unwrap_or(path)
            .with_extension("css")
            .to_string_lossy()
            .replace('\\', "/");

        let output = if self.mode.is_production() {
            self.css.optimize(&css, &filename)?
        } else {
            self.css.print_with_source_map(&css, &filename)?
        };
        Ok(output.into_bytes())
    }
}

async fn read(path: &Path) -> Result<Vec<u8>, StageError> {
    fs::read(path).await.map_err(|e| StageError::io(path, e))
}

async fn blocking<F>(path: &Path, job: F) -> Result<Vec<u8>, StageError>
where
    F: FnOnce() -> Result<Vec<u8>, TransformError> + Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(result) => result.map_err(|source| StageError::Transform {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) => Err(StageError::Task(e.to_string())),
    }
}

async fn write_output(target: &Path, bytes: &[u8]) -> Result<(), StageError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StageError::io(parent, e))?;
    }
    fs::write(target, bytes)
        .await
        .map_err(|e| StageError::io(target, e))
}

/// URL path of a written file relative to the destination root.
pub fn url_path(dest_root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(dest_root).unwrap_or(file);
    let mut url = String::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            url.push('/');
            url.push_str(&part.to_string_lossy());
        }
    }
    url
}

/// Run one stage over every file its source glob matches.
///
/// The first failing file ends the run; files after it are not processed.
pub async fn run_stage(
    entry: &PathEntry,
    transformer: &Transformer,
    dest_root: &Path,
    notifier: &dyn ReloadNotifier,
) -> Result<StageReport, StageError> {
    let files = entry.source.files()?;
    tracing::debug!("{}: {} file(s) match {}", entry.kind, files.len(), entry.source.as_str());

    let mut report = StageReport::new(entry.kind);
    for path in files {
        let target = entry.output_path(&path);
        let output = transformer.transform(entry.kind, &path).await?;
        write_output(&target, &output).await?;
        report.push(target, output.len() as u64);
    }

    report.log();

    let urls = report
        .files
        .iter()
        .map(|(path, _)| url_path(dest_root, path))
        .collect();
    if let Some(event) = ReloadEvent::for_stage(entry.kind, urls) {
        notifier.notify(event);
    }

    Ok(report)
}
