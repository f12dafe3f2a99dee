//! Bootstrap orchestrator.
//!
//! Sequences the stages in a fixed order:
//!
//! `Start → UpdateChecked → ArchitectureChecked → RequirementsAudited →
//! MarkerEnsured → DependenciesInstalled → PayloadLaunched → Done`
//!
//! Every stage failure is recorded and the machine advances, except the
//! architecture gate, which moves straight to `Unsupported`. Both terminal
//! states end with one acknowledgment from the user.

use crate::bootstrap::audit::check_required;
use crate::bootstrap::installer::{InstallReport, PackageInstaller};
use crate::bootstrap::launcher::{LaunchOutcome, Launcher, PayloadLoader};
use crate::bootstrap::marker::{MarkerOutcome, ensure_marker};
use crate::bootstrap::platform::{ArchitectureReport, PlatformProbe};
use crate::bootstrap::report::{LaunchReport, StageStatus, print_report, write_report};
use crate::bootstrap::updater::{UpdateOutcome, VersionControlUpdater};
use crate::config::LaunchContext;
use crate::console::{self, Acknowledge};
use crate::exec::CommandRunner;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

pub const EXIT_OK: i32 = 0;
pub const EXIT_UNEXPECTED: i32 = 1;
pub const EXIT_UNSUPPORTED: i32 = 3;
pub const EXIT_LAUNCH_FAILED: i32 = 4;
pub const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    UpdateChecked,
    ArchitectureChecked,
    RequirementsAudited,
    MarkerEnsured,
    DependenciesInstalled,
    PayloadLaunched,
    Done,
    Unsupported,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::UpdateChecked => "update check",
            Self::ArchitectureChecked => "architecture check",
            Self::RequirementsAudited => "required files",
            Self::MarkerEnsured => "marker file",
            Self::DependenciesInstalled => "dependencies",
            Self::PayloadLaunched => "payload",
            Self::Done => "done",
            Self::Unsupported => "unsupported device",
        }
    }

    /// Successor on the normal path; terminal states have none.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Start => Some(Self::UpdateChecked),
            Self::UpdateChecked => Some(Self::ArchitectureChecked),
            Self::ArchitectureChecked => Some(Self::RequirementsAudited),
            Self::RequirementsAudited => Some(Self::MarkerEnsured),
            Self::MarkerEnsured => Some(Self::DependenciesInstalled),
            Self::DependenciesInstalled => Some(Self::PayloadLaunched),
            Self::PayloadLaunched => Some(Self::Done),
            Self::Done | Self::Unsupported => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    LaunchFailed,
    Unsupported,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Completed => EXIT_OK,
            Self::LaunchFailed => EXIT_LAUNCH_FAILED,
            Self::Unsupported => EXIT_UNSUPPORTED,
        }
    }
}

pub struct BootstrapOrchestrator<'a> {
    ctx: &'a LaunchContext,
    runner: &'a dyn CommandRunner,
    loader: &'a dyn PayloadLoader,
    ack: &'a dyn Acknowledge,
    report_path: Option<PathBuf>,
    state: Stage,
    report: LaunchReport,
}

impl<'a> BootstrapOrchestrator<'a> {
    pub fn new(
        ctx: &'a LaunchContext,
        runner: &'a dyn CommandRunner,
        loader: &'a dyn PayloadLoader,
        ack: &'a dyn Acknowledge,
    ) -> Self {
        Self {
            ctx,
            runner,
            loader,
            ack,
            report_path: None,
            state: Stage::Start,
            report: LaunchReport::new(ctx.workdir()),
        }
    }

    /// Also write the run report as TOML before the final acknowledgment.
    #[must_use]
    pub fn with_report_path(mut self, path: Option<PathBuf>) -> Self {
        self.report_path = path;
        self
    }

    pub fn run(mut self) -> (RunOutcome, LaunchReport) {
        info!(workdir = %self.ctx.workdir().display(), "bootstrap starting");

        let update = self.check_updates();
        self.advance(Stage::UpdateChecked);
        if !update.is_success() {
            println!("⚠ Continuing with current version...");
        }

        let arch = self.check_architecture();
        self.advance(Stage::ArchitectureChecked);
        if !arch.is_64bit() {
            console::print_unsupported(&arch.machine);
            return self.finish(Stage::Unsupported, RunOutcome::Unsupported);
        }
        println!("\n✅ Device is 64-bit, continuing...");

        self.audit_requirements();
        self.advance(Stage::RequirementsAudited);

        self.provision_marker();
        self.advance(Stage::MarkerEnsured);

        self.install_dependencies();
        self.advance(Stage::DependenciesInstalled);

        let launched = self.launch();
        self.advance(Stage::PayloadLaunched);

        let outcome = if launched.is_success() {
            RunOutcome::Completed
        } else {
            RunOutcome::LaunchFailed
        };
        self.finish(Stage::Done, outcome)
    }

    fn advance(&mut self, to: Stage) {
        debug_assert_eq!(self.state.next(), Some(to), "out-of-order transition");
        info!(from = self.state.label(), to = to.label(), "stage transition");
        self.state = to;
    }

    fn finish(mut self, terminal: Stage, outcome: RunOutcome) -> (RunOutcome, LaunchReport) {
        self.state = terminal;
        self.report.final_state = terminal;
        info!(state = terminal.label(), ?outcome, "bootstrap finished");

        println!();
        print_report(&self.report);

        if let Some(path) = &self.report_path {
            match write_report(&self.report, path) {
                Ok(()) => println!("📄 Report written to: {}", path.display()),
                Err(err) => {
                    warn!("{err:#}");
                    println!("⚠ Could not write report: {err:#}");
                }
            }
        }

        self.ack.acknowledge();
        (outcome, self.report)
    }

    fn check_updates(&mut self) -> UpdateOutcome {
        println!("🔍 Checking for updates...");
        let outcome = VersionControlUpdater::new(
            self.runner,
            self.ctx.workdir(),
            &self.ctx.config.update,
        )
        .attempt_update();

        let (status, detail) = match &outcome {
            UpdateOutcome::UpToDate => {
                println!("✅ Already up to date!");
                (StageStatus::Ok, None)
            }
            UpdateOutcome::Updated => {
                println!("✅ Successfully updated!");
                (StageStatus::Ok, Some("updated".to_string()))
            }
            UpdateOutcome::Skipped(reason) => {
                println!("⚠ Skipping update check: {reason}");
                (StageStatus::Skipped, Some(reason.to_string()))
            }
            UpdateOutcome::Failed(stderr) => {
                println!("❌ Failed to update: {stderr}");
                warn!("update failed: {stderr}");
                (StageStatus::Warning, Some(outcome.to_string()))
            }
        };
        self.report.record(Stage::UpdateChecked, status, detail);
        outcome
    }

    fn check_architecture(&mut self) -> ArchitectureReport {
        println!("🔍 Checking device architecture...");
        let probe = PlatformProbe::new(self.ctx.config.platform.arch_override.clone());
        let arch = probe.detect();

        println!("Device architecture: {}", arch.machine);
        match arch.runtime_is_64bit {
            Some(flag) => println!("Runtime is 64-bit: {flag}"),
            None => println!("Runtime is 64-bit: unknown"),
        }
        println!("System: {}", arch.os);
        println!("Machine: {}", arch.machine);

        let status = if arch.is_64bit() {
            StageStatus::Ok
        } else {
            StageStatus::Failed
        };
        self.report
            .record(Stage::ArchitectureChecked, status, Some(arch.to_string()));
        arch
    }

    fn audit_requirements(&mut self) {
        println!("🔍 Checking required files...");
        let audit = check_required(self.ctx.workdir(), &self.ctx.required_artifacts());

        for artifact in &audit.artifacts {
            if artifact.present {
                println!("✅ Found: {}", artifact.name);
            } else {
                println!("❌ Missing: {}", artifact.name);
            }
        }

        if audit.all_present() {
            self.report.record(Stage::RequirementsAudited, StageStatus::Ok, None);
        } else {
            println!("\n⚠ Some files are missing, but we can continue...");
            let missing = audit.missing().join(", ");
            self.report.record(
                Stage::RequirementsAudited,
                StageStatus::Warning,
                Some(format!("missing: {missing}")),
            );
        }
    }

    fn provision_marker(&mut self) {
        let path = self.ctx.marker_path();
        let outcome = ensure_marker(&path);
        let name = &self.ctx.config.artifacts.marker;

        let status = match &outcome {
            MarkerOutcome::AlreadyPresent => StageStatus::Ok,
            MarkerOutcome::Created => {
                println!("📄 Created {name}");
                StageStatus::Ok
            }
            MarkerOutcome::Failed(err) => {
                println!("❌ Failed to create {name}: {err}");
                warn!("marker provisioning failed: {err}");
                StageStatus::Warning
            }
        };
        self.report
            .record(Stage::MarkerEnsured, status, Some(outcome.to_string()));
    }

    fn install_dependencies(&mut self) {
        let config = &self.ctx.config.installer;
        if !config.enabled {
            self.report.record(
                Stage::DependenciesInstalled,
                StageStatus::Skipped,
                Some("install disabled".to_string()),
            );
            return;
        }

        console::section("🔧 Setting up environment...");
        println!("📦 Installing requirements...");
        let installer = PackageInstaller::new(self.runner, self.ctx.workdir(), config);
        let report: InstallReport = installer.install_all(&config.packages);

        if report.success() {
            self.report.record(
                Stage::DependenciesInstalled,
                StageStatus::Ok,
                Some(format!("{} package(s) via {}", report.packages.len(), report.runtime)),
            );
        } else {
            println!("⚠ Some packages failed to install, but we can try to continue...");
            let failed = report.failed().join(", ");
            self.report.record(
                Stage::DependenciesInstalled,
                StageStatus::Warning,
                Some(format!("failed: {failed}")),
            );
        }
    }

    fn launch(&mut self) -> LaunchOutcome {
        println!("\n{}", console::rule());
        println!("🚀 Starting payload...");
        println!("{}", console::rule());

        let launcher = Launcher::new(
            self.loader,
            self.ctx.payload_path(),
            &self.ctx.config.payload.entry_symbol,
        );
        let outcome = launcher.launch_payload();

        match &outcome {
            LaunchOutcome::Completed => {
                self.report.record(Stage::PayloadLaunched, StageStatus::Ok, None);
            }
            LaunchOutcome::Failed(err) => {
                warn!(kind = err.kind(), "payload failed: {err}");
                console::print_launch_failure(&err.to_string(), &self.troubleshooting_hints());
                self.report.record(
                    Stage::PayloadLaunched,
                    StageStatus::Failed,
                    Some(err.to_string()),
                );
            }
        }
        outcome
    }

    fn troubleshooting_hints(&self) -> Vec<String> {
        let config = &self.ctx.config;
        let install_command = (!config.installer.packages.is_empty()).then(|| {
            let args = config
                .installer
                .args_for(&config.installer.packages.join(" "));
            format!("{} {}", config.installer.runtime, args.join(" "))
        });
        console::troubleshooting_hints(
            &config.artifacts.payload,
            &config.installer.runtime,
            install_command.as_deref(),
        )
    }
}
