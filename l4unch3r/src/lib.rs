//! # l4unch3r
//!
//! Bootstrap launcher: checks the host, self-updates from the source
//! repository, installs runtime dependencies and hands control to a
//! separately built payload library.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod exec;
pub mod orchestrator;

pub use config::{LaunchConfig, LaunchContext};
pub use error::{ConfigError, LaunchError};
pub use orchestrator::{BootstrapOrchestrator, RunOutcome, Stage};
