//! Launcher configuration and the explicit run context.
//!
//! Layering: built-in defaults → `l4unch3r.toml` in the working directory
//! (or an explicitly named file) → command-line overrides applied by `main`.

use crate::error::{ConfigError, ParseSnafu, ReadSnafu, WorkdirSnafu};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "l4unch3r.toml";

/// Placeholder in installer args replaced by the package name.
pub const PACKAGE_PLACEHOLDER: &str = "{package}";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LaunchConfig {
    pub update: UpdateConfig,
    pub platform: PlatformConfig,
    pub artifacts: ArtifactsConfig,
    pub payload: PayloadConfig,
    pub installer: InstallerConfig,
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct UpdateConfig {
    pub enabled: bool,
    /// Version control executable.
    pub program: String,
    /// Substring of the status output meaning "local branch is behind".
    pub behind_marker: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "git".to_string(),
            behind_marker: "Your branch is behind".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlatformConfig {
    /// Replaces the detected machine string.
    pub arch_override: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Compiled payload, relative to the working directory.
    pub payload: String,
    /// Zero-byte marker file, relative to the working directory.
    pub marker: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            payload: format!("{DLL_PREFIX}main{DLL_SUFFIX}"),
            marker: "checker.txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PayloadConfig {
    pub entry_symbol: String,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            entry_symbol: "main".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct InstallerConfig {
    pub enabled: bool,
    /// Runtime whose package manager installs the dependencies.
    pub runtime: String,
    /// Arguments for a single install; `{package}` is substituted.
    pub args: Vec<String>,
    /// Installed in order, unpinned.
    pub packages: Vec<String>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            runtime: "python3".to_string(),
            args: ["-m", "pip", "install", PACKAGE_PLACEHOLDER, "-q"]
                .into_iter()
                .map(String::from)
                .collect(),
            packages: ["yt-dlp", "instaloader", "colorama"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl InstallerConfig {
    /// Install arguments for one package.
    pub fn args_for(&self, package: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(PACKAGE_PLACEHOLDER, package))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Block on Enter before exiting.
    pub wait_for_ack: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { wait_for_ack: true }
    }
}

impl LaunchConfig {
    /// Load the config for `workdir`.
    ///
    /// An explicit path must exist; the implicit `l4unch3r.toml` is optional.
    pub fn load(workdir: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => workdir.join(path),
            None => {
                let candidate = workdir.join(DEFAULT_CONFIG_FILE);
                if !candidate.exists() {
                    debug!("no {DEFAULT_CONFIG_FILE} in {}, using defaults", workdir.display());
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let content = std::fs::read_to_string(&path).context(ReadSnafu { path: &path })?;
        let config = toml::from_str(&content).context(ParseSnafu { path: &path })?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }
}

/// Everything a run needs, passed explicitly instead of read from process
/// globals.
#[derive(Debug, Clone)]
pub struct LaunchContext {
    workdir: PathBuf,
    pub config: LaunchConfig,
}

impl LaunchContext {
    /// Canonicalizes `workdir` so every stage sees the same absolute path.
    pub fn new(workdir: &Path, config: LaunchConfig) -> Result<Self, ConfigError> {
        let workdir = workdir
            .canonicalize()
            .context(WorkdirSnafu { path: workdir })?;
        Ok(Self { workdir, config })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn payload_path(&self) -> PathBuf {
        self.workdir.join(&self.config.artifacts.payload)
    }

    pub fn marker_path(&self) -> PathBuf {
        self.workdir.join(&self.config.artifacts.marker)
    }

    /// Artifacts audited before launch, payload first.
    pub fn required_artifacts(&self) -> Vec<String> {
        vec![
            self.config.artifacts.payload.clone(),
            self.config.artifacts.marker.clone(),
        ]
    }
}
