//! Self-update from the version control remote.
//!
//! Never fatal: every failure mode collapses into [`UpdateOutcome`].

use crate::config::UpdateConfig;
use crate::exec::CommandRunner;
use std::fmt;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Metadata directory whose presence marks a working copy.
pub const VCS_METADATA_DIR: &str = ".git";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate,
    Updated,
    Skipped(SkipReason),
    /// Pull ran and exited non-zero; carries its stderr.
    Failed(String),
}

impl UpdateOutcome {
    /// `false` only for a failed pull; skips are not failures.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    NotARepository,
    ToolMissing(String),
    Error(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "update check disabled"),
            Self::NotARepository => write!(f, "not a repository"),
            Self::ToolMissing(tool) => write!(f, "{tool} not installed"),
            Self::Error(message) => write!(f, "error checking updates: {message}"),
        }
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate => write!(f, "already up to date"),
            Self::Updated => write!(f, "updated"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
            Self::Failed(stderr) => write!(f, "failed: {stderr}"),
        }
    }
}

pub struct VersionControlUpdater<'a> {
    runner: &'a dyn CommandRunner,
    workdir: &'a Path,
    config: &'a UpdateConfig,
}

impl<'a> VersionControlUpdater<'a> {
    pub fn new(runner: &'a dyn CommandRunner, workdir: &'a Path, config: &'a UpdateConfig) -> Self {
        Self {
            runner,
            workdir,
            config,
        }
    }

    /// fetch → status → pull when behind.
    pub fn attempt_update(&self) -> UpdateOutcome {
        if !self.config.enabled {
            return UpdateOutcome::Skipped(SkipReason::Disabled);
        }

        if !self.workdir.join(VCS_METADATA_DIR).exists() {
            return UpdateOutcome::Skipped(SkipReason::NotARepository);
        }

        match self.check_and_pull() {
            Ok(outcome) => outcome,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!("{} not found on PATH: {err}", self.config.program);
                UpdateOutcome::Skipped(SkipReason::ToolMissing(self.config.program.clone()))
            }
            Err(err) => {
                warn!("update check aborted: {err}");
                UpdateOutcome::Skipped(SkipReason::Error(err.to_string()))
            }
        }
    }

    fn check_and_pull(&self) -> io::Result<UpdateOutcome> {
        // Network result deliberately ignored; status reflects whatever arrived.
        let fetch = self.git(&["fetch"])?;
        if !fetch.success() {
            debug!(stderr = %fetch.stderr.trim(), "fetch exited non-zero");
        }

        let status = self.git(&["status", "-uno"])?;
        if !status.stdout.contains(&self.config.behind_marker) {
            return Ok(UpdateOutcome::UpToDate);
        }

        println!("🔄 Updates available! Pulling latest changes...");
        let pull = self.git(&["pull"])?;
        if pull.success() {
            Ok(UpdateOutcome::Updated)
        } else {
            Ok(UpdateOutcome::Failed(pull.stderr.trim().to_string()))
        }
    }

    fn git(&self, args: &[&str]) -> io::Result<crate::exec::CommandOutput> {
        let args: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
        self.runner.run(&self.config.program, &args, self.workdir)
    }
}
