//! Command-line surface.
//!
//! A bare invocation runs the full bootstrap against the current directory;
//! every flag is optional and mirrors a config value.

use crate::bootstrap::launcher::IsolatedLoader;
use crate::config::{LaunchConfig, LaunchContext};
use crate::console::{Acknowledge, NoAck, StdinAck};
use crate::exec::DuctRunner;
use crate::orchestrator::{BootstrapOrchestrator, EXIT_UNEXPECTED, RunOutcome};
use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::fmt::Display;
use std::path::PathBuf;
use tracing::error;

#[derive(Debug, Parser, Clone)]
#[command(name = "l4unch3r", version, about = "Check, update and launch the payload")]
pub struct Cli {
    /// Directory holding the payload, marker file and repository checkout
    #[arg(short = 'C', long, env = "L4UNCH3R_WORKDIR", default_value = ".")]
    pub workdir: PathBuf,

    /// Config file (default: l4unch3r.toml in the working directory, if present)
    #[arg(long, env = "L4UNCH3R_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the detected machine architecture string
    #[arg(long, env = "L4UNCH3R_ARCH")]
    pub arch: Option<String>,

    /// Exit without waiting for Enter
    #[arg(long, env = "L4UNCH3R_NO_WAIT")]
    pub no_wait: bool,

    /// Skip the self-update check
    #[arg(long)]
    pub skip_update: bool,

    /// Skip the dependency install
    #[arg(long)]
    pub skip_install: bool,

    /// Write the run report as TOML to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Run as payload host: load and call the payload in this process
    #[arg(long, hide = true, value_name = "PATH")]
    pub run_payload: Option<PathBuf>,

    #[arg(long, hide = true, requires = "run_payload")]
    pub entry_symbol: Option<String>,
}

impl Cli {
    /// Layer command-line overrides on top of the loaded config.
    pub fn apply(&self, mut config: LaunchConfig) -> LaunchConfig {
        if let Some(arch) = &self.arch {
            config.platform.arch_override = Some(arch.clone());
        }
        if self.no_wait {
            config.console.wait_for_ack = false;
        }
        if self.skip_update {
            config.update.enabled = false;
        }
        if self.skip_install {
            config.installer.enabled = false;
        }
        config
    }

    /// Default log filter for the verbosity level.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "l4unch3r=warn",
            1 => "l4unch3r=info",
            _ => "l4unch3r=debug",
        }
    }
}

/// Run the bootstrap and map the result to a process exit code.
///
/// Errors outside the stage contracts (config, working directory) are
/// reported generically and still followed by the acknowledgment wait.
pub fn run(cli: &Cli) -> i32 {
    match launch(cli) {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            error!("{err:#}");
            report_unexpected(&format!("{err:#}"), acknowledger(!cli.no_wait))
        }
    }
}

/// Generic report for errors outside the stage contracts, followed by the
/// usual acknowledgment.
pub fn report_unexpected(err: &dyn Display, ack: &dyn Acknowledge) -> i32 {
    println!("\n❌ Unexpected error: {err}");
    ack.acknowledge();
    EXIT_UNEXPECTED
}

pub fn acknowledger(wait: bool) -> &'static dyn Acknowledge {
    if wait { &StdinAck } else { &NoAck }
}

fn launch(cli: &Cli) -> Result<RunOutcome> {
    let config = LaunchConfig::load(&cli.workdir, cli.config.as_deref())?;
    let ctx = LaunchContext::new(&cli.workdir, cli.apply(config))?;

    let ack = acknowledger(ctx.config.console.wait_for_ack);
    let loader = IsolatedLoader::current().context("cannot locate the l4unch3r executable")?;

    let (outcome, _report) = BootstrapOrchestrator::new(&ctx, &DuctRunner, &loader, ack)
        .with_report_path(cli.report.clone())
        .run();
    Ok(outcome)
}
