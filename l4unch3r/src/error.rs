//! Typed errors for the launcher.
//!
//! Component boundaries never surface these as `Err` to the orchestrator;
//! they are carried inside outcome enums so the fatal/non-fatal policy stays
//! in one place.

use snafu::Snafu;
use std::path::PathBuf;

/// Why the payload could not be started or did not finish cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum LaunchError {
    /// No payload artifact at the expected path.
    #[snafu(display("module not found: {}", path.display()))]
    PayloadNotFound { path: PathBuf },

    /// The artifact exists but the dynamic loader rejected it.
    #[snafu(display("failed to load {}: {message}", path.display()))]
    LoadFailed { path: PathBuf, message: String },

    /// Loaded, but the designated entry symbol is not exported.
    #[snafu(display("entry point missing: `{symbol}` is not exported by the payload"))]
    EntryPointMissing { symbol: String },

    /// The entry point reported failure or its process died.
    #[snafu(display("payload raised an error: {message}"))]
    InvocationFailed { message: String },
}

impl LaunchError {
    /// Short machine-friendly tag, used by the run report.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PayloadNotFound { .. } => "not_found",
            Self::LoadFailed { .. } => "load_failed",
            Self::EntryPointMissing { .. } => "entry_point_missing",
            Self::InvocationFailed { .. } => "invocation_failed",
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    #[snafu(display("failed to read config {}: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse config {}: {source}", path.display()))]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[snafu(display("working directory {} is not usable: {source}", path.display()))]
    Workdir {
        path: PathBuf,
        source: std::io::Error,
    },
}
