//! Per-stage size reports.

use std::path::PathBuf;

use crate::paths::AssetKind;

/// Files written by one stage run, with their sizes in bytes.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub kind: AssetKind,
    pub files: Vec<(PathBuf, u64)>,
}

impl StageReport {
    pub fn new(kind: AssetKind) -> Self {
        Self {
            kind,
            files: Vec::new(),
        }
    }

    pub fn push(&mut self, path: PathBuf, bytes: u64) {
        self.files.push((path, bytes));
    }

    pub fn total(&self) -> u64 {
        self.files.iter().map(|(_, bytes)| bytes).sum()
    }

    /// Log each file and the stage total.
    pub fn log(&self) {
        for (path, bytes) in &self.files {
            tracing::info!("{} {} {}", self.kind, path.display(), human_size(*bytes));
        }
        tracing::info!(
            "{} all files {} ({} files)",
            self.kind,
            human_size(self.total()),
            self.files.len()
        );
    }
}

/// Format a byte count with decimal units (`1.5 kB`).
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["kB", "MB", "GB", "TB"];

    if bytes < 1000 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1000.0 {
            break;
        }
        value /= 1000.0;
        unit = next;
    }

    let precision = if value < 10.0 { 2 } else if value < 100.0 { 1 } else { 0 };
    let text = format!("{:.*}", precision, value);
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    };
    format!("{} {}", text, unit)
}
