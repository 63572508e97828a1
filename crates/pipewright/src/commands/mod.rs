pub mod build;
pub mod default;
pub mod serve;
pub mod watch;
