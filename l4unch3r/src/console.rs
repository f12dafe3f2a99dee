//! Terminal interaction: section headers, failure blocks, and the final
//! "press Enter" acknowledgment.

use std::io::{self, BufRead, Write};

const RULE_WIDTH: usize = 60;

/// Blocks until the user acknowledges the end of the run.
pub trait Acknowledge {
    fn acknowledge(&self);
}

/// Waits for a line on stdin. EOF counts as acknowledgment.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinAck;

impl Acknowledge for StdinAck {
    fn acknowledge(&self) {
        print!("\nPress Enter to exit...");
        let _ = io::stdout().flush();
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
    }
}

/// For `--no-wait` and non-interactive runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAck;

impl Acknowledge for NoAck {
    fn acknowledge(&self) {}
}

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn section(title: &str) {
    println!();
    println!("{title}");
}

pub fn print_unsupported(machine: &str) {
    println!();
    println!("{}", rule());
    println!("❌ UNSUPPORTED DEVICE");
    println!("{}", rule());
    println!("This tool requires a 64-bit device.");
    println!("Detected architecture: {machine}");
    println!("Please run it on a 64-bit system.");
    println!("{}", rule());
}

/// Remediation hints shown when the payload could not be started.
pub fn troubleshooting_hints(
    payload: &str,
    runtime: &str,
    install_command: Option<&str>,
) -> Vec<String> {
    let mut hints = vec![
        format!("Reinstall the payload and check that '{payload}' exists"),
        format!("Verify that '{runtime}' is the expected runtime version"),
    ];
    if let Some(command) = install_command {
        hints.push(format!("Re-run the dependency install: {command}"));
    }
    hints
}

pub fn print_launch_failure(cause: &str, hints: &[String]) {
    println!();
    println!("{}", rule());
    println!("❌ TOOL FAILED TO START");
    println!("{}", rule());
    println!("Cause: {cause}");
    println!("Troubleshooting steps:");
    for (n, hint) in hints.iter().enumerate() {
        println!("{}. {hint}", n + 1);
    }
    println!("{}", rule());
}

#[cfg(test)]
pub(crate) mod fake {
    use super::Acknowledge;
    use std::cell::Cell;

    /// Counts acknowledgments instead of reading stdin.
    #[derive(Default)]
    pub struct CountingAck {
        pub count: Cell<usize>,
    }

    impl Acknowledge for CountingAck {
        fn acknowledge(&self) {
            self.count.set(self.count.get() + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints_include_install_command() {
        let hints = troubleshooting_hints(
            "libmain.so",
            "python3",
            Some("python3 -m pip install yt-dlp colorama -q"),
        );
        assert_eq!(hints.len(), 3);
        assert!(hints[0].contains("libmain.so"));
        assert_eq!(
            hints[2],
            "Re-run the dependency install: python3 -m pip install yt-dlp colorama -q"
        );
    }

    #[test]
    fn test_hints_without_packages() {
        assert_eq!(troubleshooting_hints("libmain.so", "python3", None).len(), 2);
    }
}
