//! Bootstrap stages run ahead of the payload.
//!
//! - Self-update from the version control remote
//! - Architecture gate (the only fatal check)
//! - Required artifact audit and marker provisioning
//! - Runtime dependency install
//! - Payload hand-off
//! - Run report

pub mod audit;
pub mod installer;
pub mod launcher;
pub mod marker;
pub mod platform;
pub mod report;
pub mod updater;

pub use audit::{AuditResult, check_required};
pub use installer::{InstallReport, PackageInstaller};
pub use launcher::{DylibLoader, IsolatedLoader, LaunchOutcome, Launcher, PayloadLoader};
pub use marker::{MarkerOutcome, ensure_marker};
pub use platform::{ArchitectureReport, PlatformProbe};
pub use report::{LaunchReport, print_report, write_report};
pub use updater::{UpdateOutcome, VersionControlUpdater};
