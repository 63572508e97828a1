//! pipewright CLI - static-site asset pipeline with live reload.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pipewright_static::{AssetKind, BuildError, Mode, Task};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "pipewright")]
#[command(about = "Static-site asset pipeline with dev server and live reload")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to pipewright.toml config file
    #[arg(short, long, default_value = "pipewright.toml", global = true)]
    config: PathBuf,

    /// Minify and compress outputs (the default)
    #[arg(long, global = true, conflicts_with = "development")]
    production: bool,

    /// Keep outputs readable and emit source maps
    #[arg(long, global = true)]
    development: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

impl Cli {
    fn mode(&self) -> Option<Mode> {
        if self.development {
            Some(Mode::Development)
        } else if self.production {
            Some(Mode::Production)
        } else {
            None
        }
    }
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Build everything, then serve and watch (same as no command)
    Default,

    /// Clean and run every stage once
    Build,

    /// Remove the destination directory
    Clean,

    /// Resolve includes and compact HTML pages
    #[command(name = "html:build")]
    HtmlBuild,

    /// Bundle and minify the script entry point
    #[command(name = "js:build")]
    JsBuild,

    /// Compile, prefix and minify stylesheets
    #[command(name = "styles:build")]
    StylesBuild,

    /// Copy font files
    #[command(name = "fonts:build")]
    FontsBuild,

    /// Optimize SVG and raster images
    #[command(name = "images:build")]
    ImagesBuild,

    /// Optimize SVG images only
    #[command(name = "images:svg")]
    ImagesSvg,

    /// Optimize raster images only
    #[command(name = "images:basic")]
    ImagesBasic,

    /// Serve the destination directory with live reload
    #[command(name = "browserSync")]
    BrowserSync,

    /// Re-run stages when their sources change
    Watch,
}

impl Commands {
    /// The pipeline task a one-shot command runs.
    fn task(self) -> Option<Task> {
        match self {
            Commands::Build => Some(Task::Build),
            Commands::Clean => Some(Task::Clean),
            Commands::HtmlBuild => Some(Task::Stage(AssetKind::Html)),
            Commands::JsBuild => Some(Task::Stage(AssetKind::Js)),
            Commands::StylesBuild => Some(Task::Stage(AssetKind::Styles)),
            Commands::FontsBuild => Some(Task::Stage(AssetKind::Fonts)),
            Commands::ImagesBuild => Some(Task::Images),
            Commands::ImagesSvg => Some(Task::Stage(AssetKind::ImageSvg)),
            Commands::ImagesBasic => Some(Task::Stage(AssetKind::ImageRaster)),
            Commands::Default | Commands::BrowserSync | Commands::Watch => None,
        }
    }
}

/// Whether `error` still needs reporting at exit. Stage failures were
/// logged by the pipeline when they happened.
fn needs_report(error: &anyhow::Error) -> bool {
    !error
        .downcast_ref::<BuildError>()
        .is_some_and(BuildError::is_logged)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if needs_report(&e) {
                tracing::error!("{:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Arc::new(config::load(&cli.config, cli.mode())?);
    let command = cli.command.unwrap_or(Commands::Default);

    match command {
        Commands::Default => commands::default::run(config).await?,
        Commands::BrowserSync => commands::serve::run(config).await?,
        Commands::Watch => commands::watch::run(config).await?,
        other => {
            if let Some(task) = other.task() {
                commands::build::run(config, task).await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pipewright").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_command_means_default() {
        let cli = parse(&[]);

        assert_eq!(cli.command, None);
        assert_eq!(cli.config, PathBuf::from("pipewright.toml"));
        assert_eq!(cli.mode(), None);
    }

    #[test]
    fn parses_task_names() {
        let cases = [
            ("build", Some(Task::Build)),
            ("clean", Some(Task::Clean)),
            ("html:build", Some(Task::Stage(AssetKind::Html))),
            ("js:build", Some(Task::Stage(AssetKind::Js))),
            ("styles:build", Some(Task::Stage(AssetKind::Styles))),
            ("fonts:build", Some(Task::Stage(AssetKind::Fonts))),
            ("images:build", Some(Task::Images)),
            ("images:svg", Some(Task::Stage(AssetKind::ImageSvg))),
            ("images:basic", Some(Task::Stage(AssetKind::ImageRaster))),
            ("browserSync", None),
            ("watch", None),
            ("default", None),
        ];

        for (name, task) in cases {
            let command = parse(&[name]).command.unwrap();
            assert_eq!(command.task(), task, "{}", name);
            if let Some(task) = task {
                assert_eq!(task.name(), name);
            }
        }
    }

    #[test]
    fn mode_flags_override() {
        assert_eq!(parse(&["build", "--development"]).mode(), Some(Mode::Development));
        assert_eq!(parse(&["--production", "build"]).mode(), Some(Mode::Production));
        assert!(Cli::try_parse_from(["pipewright", "--production", "--development"]).is_err());
    }

    #[test]
    fn accepts_config_and_verbose_anywhere() {
        let cli = parse(&["js:build", "-c", "site.toml", "-v"]);

        assert_eq!(cli.config, PathBuf::from("site.toml"));
        assert!(cli.verbose);
    }

    #[test]
    fn stage_failures_are_not_reported_twice() {
        use anyhow::Context;
        use pipewright_static::{StageError, TransformError};

        let stage: Result<()> = Err(BuildError::Stage {
            stage: "styles:build",
            source: StageError::Transform {
                path: PathBuf::from("src/main.scss"),
                source: TransformError::Sass("expected \"}\"".to_string()),
            },
        })
        .context("Build failed");
        let config: Result<()> = Err(BuildError::Config("bad glob".to_string())).context("Build failed");

        assert!(!needs_report(&stage.unwrap_err()));
        assert!(needs_report(&config.unwrap_err()));
        assert!(needs_report(&anyhow::anyhow!("Failed to parse pipewright.toml")));
    }

    #[test]
    fn rejects_unknown_tasks() {
        assert!(Cli::try_parse_from(["pipewright", "deploy"]).is_err());
    }
}
