//! Development server and watch loop for pipewright.
//!
//! Serves the destination root with a live-reload client injected into HTML
//! pages, and re-runs stages when their sources change.

pub mod livereload;
pub mod server;
pub mod watcher;

pub use livereload::{inject_script, LiveReloadHub, LiveReloadMessage, LIVERELOAD_PATH};
pub use server::{DevServer, ServerError};
pub use watcher::{tasks_for_change, watch, FileWatcher, InFlight};
