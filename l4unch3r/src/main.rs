//! l4unch3r binary entry point.
//!
//! The bootstrap itself is strictly sequential and blocking; it runs on a
//! blocking thread so a Ctrl-C can end the process with a short message at
//! any point.

use clap::Parser;
use l4unch3r::bootstrap::launcher::host_payload;
use l4unch3r::cli::{Cli, acknowledger, report_unexpected, run};
use l4unch3r::config::PayloadConfig;
use l4unch3r::orchestrator::{EXIT_INTERRUPTED, EXIT_UNEXPECTED};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_filter());

    if let Some(path) = &cli.run_payload {
        let symbol = cli
            .entry_symbol
            .clone()
            .unwrap_or_else(|| PayloadConfig::default().entry_symbol);
        std::process::exit(host_payload(path, &symbol));
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("❌ Unexpected error: failed to start runtime: {err}");
            std::process::exit(EXIT_UNEXPECTED);
        }
    };

    let code = runtime.block_on(supervise(cli));
    // Exit without dropping the runtime: an interrupted run may still have a
    // blocking step in flight.
    std::process::exit(code);
}

async fn supervise(cli: Cli) -> i32 {
    let wait = !cli.no_wait;

    // Spawned on first poll, after the interrupt handler is registered.
    let bootstrap = async move {
        match tokio::task::spawn_blocking(move || run(&cli)).await {
            Ok(code) => code,
            Err(err) => {
                tracing::error!("bootstrap task aborted: {err}");
                tokio::task::spawn_blocking(move || report_unexpected(&err, acknowledger(wait)))
                    .await
                    .unwrap_or(EXIT_UNEXPECTED)
            }
        }
    };

    tokio::select! {
        biased;

        Ok(()) = tokio::signal::ctrl_c() => {
            println!("\n\n⚠ Interrupted by user");
            EXIT_INTERRUPTED
        }
        code = bootstrap => code,
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
