//! Run report for a bootstrap sequence.
//!
//! One record per stage, in execution order. Printed as a summary at the end
//! of the run and optionally written as TOML for scripts and support tickets.

use crate::orchestrator::Stage;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Ok,
    Skipped,
    Warning,
    Failed,
}

impl StageStatus {
    fn icon(self) -> &'static str {
        match self {
            Self::Ok => "✅",
            Self::Skipped => "⏭️ ",
            Self::Warning => "⚠️ ",
            Self::Failed => "❌",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LaunchReport {
    pub timestamp: String,
    pub workdir: PathBuf,
    /// Terminal state the run ended in.
    pub final_state: Stage,
    pub stages: Vec<StageRecord>,
}

impl LaunchReport {
    pub fn new(workdir: &Path) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            workdir: workdir.to_path_buf(),
            final_state: Stage::Start,
            stages: Vec::new(),
        }
    }

    pub fn record(&mut self, stage: Stage, status: StageStatus, detail: Option<String>) {
        self.stages.push(StageRecord {
            stage,
            status,
            detail,
        });
    }

    pub fn status_of(&self, stage: Stage) -> Option<StageStatus> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| r.status)
    }

    /// Stages that ran, in order.
    pub fn visited(&self) -> Vec<Stage> {
        self.stages.iter().map(|r| r.stage).collect()
    }
}

/// Serialize the report as TOML at `output_path`, creating parent dirs.
pub fn write_report(report: &LaunchReport, output_path: &Path) -> Result<()> {
    let body = toml::to_string_pretty(report).context("Failed to serialize launch report")?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directory: {}", parent.display()))?;
    }

    let content = format!("# l4unch3r run report\n\n{body}");
    fs::write(output_path, content)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    Ok(())
}

/// Human-readable summary.
pub fn print_report(report: &LaunchReport) {
    println!("📋 Run summary ({})", report.timestamp);
    for record in &report.stages {
        match &record.detail {
            Some(detail) => println!(
                "  {} {:<22} {}",
                record.status.icon(),
                record.stage.label(),
                detail
            ),
            None => println!("  {} {}", record.status.icon(), record.stage.label()),
        }
    }
}
