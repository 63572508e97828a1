//! Pipeline configuration (`pipewright.toml`).
//!
//! Every field has a default, so an empty or missing file is a valid
//! configuration. The loaded value is immutable and shared behind an `Arc`.

use std::path::PathBuf;

use pipewright_assets::DEFAULT_BROWSERS;
use serde::Deserialize;

/// Build mode, fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Minify and compress outputs.
    #[default]
    Production,
    /// Keep outputs readable and emit source maps.
    Development,
}

impl Mode {
    pub fn is_production(self) -> bool {
        self == Mode::Production
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Production => write!(f, "production"),
            Mode::Development => write!(f, "development"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub dirs: DirsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub styles: StylesConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

impl PipelineConfig {
    /// Replace the mode, typically from a command-line override.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}

/// Source and destination roots.
#[derive(Debug, Clone, Deserialize)]
pub struct DirsConfig {
    #[serde(default = "default_src")]
    pub src: PathBuf,
    #[serde(default = "default_dest")]
    pub dest: PathBuf,
}

impl Default for DirsConfig {
    fn default() -> Self {
        Self {
            src: default_src(),
            dest: default_dest(),
        }
    }
}

/// Development server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Open a browser once the server is listening
    #[serde(default)]
    pub open: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StylesConfig {
    /// Browserslist queries used for vendor prefixing
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            browsers: default_browsers(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchConfig {
    /// Skip triggers for a kind whose stage is still running
    #[serde(default)]
    pub single_flight: bool,
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}
fn default_dest() -> PathBuf {
    PathBuf::from("build")
}
fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    9000
}
fn default_browsers() -> Vec<String> {
    DEFAULT_BROWSERS.iter().map(|b| b.to_string()).collect()
}
