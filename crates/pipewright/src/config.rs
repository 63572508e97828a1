//! Loading `pipewright.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use pipewright_static::{Mode, PipelineConfig};

/// Load the config file if it exists, apply the mode override and make the
/// source and destination roots absolute.
///
/// A missing file yields the defaults; a malformed one is an error.
pub fn load(path: &Path, mode: Option<Mode>) -> Result<PipelineConfig> {
    let mut config = read(path)?;
    if let Some(mode) = mode {
        config = config.with_mode(mode);
    }

    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    Ok(absolute_dirs(config, &cwd))
}

fn read(path: &Path) -> Result<PipelineConfig> {
    if !path.exists() {
        tracing::debug!("{} not found, using defaults", path.display());
        return Ok(PipelineConfig::default());
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let config: PipelineConfig =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Watcher events carry absolute paths, so the globs built from these roots
/// must be absolute too.
fn absolute_dirs(mut config: PipelineConfig, base: &Path) -> PipelineConfig {
    if config.dirs.src.is_relative() {
        config.dirs.src = base.join(&config.dirs.src);
    }
    if config.dirs.dest.is_relative() {
        config.dirs.dest = base.join(&config.dirs.dest);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().unwrap();

        let config = read(&temp.path().join("pipewright.toml")).unwrap();

        assert_eq!(config.mode, Mode::Production);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.dirs.src, PathBuf::from("src"));
    }

    #[test]
    fn reads_overrides() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("pipewright.toml");
        fs::write(
            &path,
            "mode = \"development\"\n[dirs]\ndest = \"public\"\n[server]\nport = 3000\n",
        )
        .unwrap();

        let config = read(&path).unwrap();

        assert_eq!(config.mode, Mode::Development);
        assert_eq!(config.dirs.dest, PathBuf::from("public"));
        assert_eq!(config.dirs.src, PathBuf::from("src"));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("pipewright.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        let err = read(&path).unwrap_err();

        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn mode_flag_wins_over_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("pipewright.toml");
        fs::write(&path, "mode = \"development\"\n").unwrap();

        let config = load(&path, Some(Mode::Production)).unwrap();

        assert_eq!(config.mode, Mode::Production);
        assert!(config.dirs.src.is_absolute());
    }

    #[test]
    fn resolves_relative_roots() {
        let config = PipelineConfig::default();
        let mut absolute = PipelineConfig::default();
        absolute.dirs.dest = PathBuf::from("/srv/site");

        let resolved = absolute_dirs(config, Path::new("/work"));
        assert_eq!(resolved.dirs.src, PathBuf::from("/work/src"));
        assert_eq!(resolved.dirs.dest, PathBuf::from("/work/build"));

        let kept = absolute_dirs(absolute, Path::new("/work"));
        assert_eq!(kept.dirs.dest, PathBuf::from("/srv/site"));
    }
}
