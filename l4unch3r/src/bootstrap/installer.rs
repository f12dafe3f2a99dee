//! Runtime dependency installer.
//!
//! Installs each configured package through the runtime's package manager,
//! one process per package. A failed package is recorded and the remaining
//! packages are still attempted.

use crate::config::InstallerConfig;
use crate::exec::{CommandRunner, resolve_program};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageStatus {
    Installed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInstall {
    pub name: String,
    pub status: PackageStatus,
}

/// Per-package results in install order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Executable every install was issued against.
    pub runtime: String,
    pub packages: Vec<PackageInstall>,
}

impl InstallReport {
    pub fn success(&self) -> bool {
        self.packages
            .iter()
            .all(|p| p.status == PackageStatus::Installed)
    }

    pub fn failed(&self) -> Vec<&str> {
        self.packages
            .iter()
            .filter(|p| p.status != PackageStatus::Installed)
            .map(|p| p.name.as_str())
            .collect()
    }
}

pub struct PackageInstaller<'a> {
    runner: &'a dyn CommandRunner,
    workdir: &'a Path,
    config: &'a InstallerConfig,
    runtime: String,
}

impl<'a> PackageInstaller<'a> {
    /// Resolves the runtime up front so every install targets the same binary.
    pub fn new(runner: &'a dyn CommandRunner, workdir: &'a Path, config: &'a InstallerConfig) -> Self {
        let runtime = resolve_program(&config.runtime);
        debug!(runtime, "resolved installer runtime");
        Self::with_runtime(runner, workdir, config, runtime)
    }

    pub fn with_runtime(
        runner: &'a dyn CommandRunner,
        workdir: &'a Path,
        config: &'a InstallerConfig,
        runtime: String,
    ) -> Self {
        Self {
            runner,
            workdir,
            config,
            runtime,
        }
    }

    pub fn install_all<S: AsRef<str>>(&self, names: &[S]) -> InstallReport {
        let packages = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                print!("  Installing {name}... ");
                let _ = std::io::stdout().flush();

                let status = self.install_one(name);
                match &status {
                    PackageStatus::Installed => println!("✅"),
                    PackageStatus::Failed(reason) => {
                        println!("❌ Failed to install {name}");
                        warn!(package = name, "install failed: {reason}");
                    }
                }

                PackageInstall {
                    name: name.to_string(),
                    status,
                }
            })
            .collect();

        InstallReport {
            runtime: self.runtime.clone(),
            packages,
        }
    }

    fn install_one(&self, name: &str) -> PackageStatus {
        let args = self.config.args_for(name);
        match self.runner.run(&self.runtime, &args, self.workdir) {
            Ok(output) if output.success() => PackageStatus::Installed,
            Ok(output) => {
                let code = output
                    .code
                    .map_or_else(|| "signal".to_string(), |c| c.to_string());
                let stderr = output.stderr.trim();
                if stderr.is_empty() {
                    PackageStatus::Failed(format!("exit status {code}"))
                } else {
                    PackageStatus::Failed(format!("exit status {code}: {stderr}"))
                }
            }
            Err(err) => PackageStatus::Failed(format!("could not run {}: {err}", self.runtime)),
        }
    }
}
