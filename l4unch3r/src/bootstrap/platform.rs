//! Host architecture probe, the single fatal gate.
//!
//! Two signals are ANDed: the host machine string must name a 64-bit
//! architecture, and this executable must itself be 64-bit. OS name and
//! machine string are carried for diagnostics only.

use std::fmt;

/// Substrings identifying 64-bit machines, matched case-insensitively.
pub const X64_ARCHS: [&str; 6] = ["x86_64", "amd64", "x64", "arm64", "aarch64", "armv8"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchitectureReport {
    /// Lowercased machine string.
    pub machine: String,
    pub os: String,
    pub machine_is_64bit: bool,
    /// Pointer width of this executable; `None` when unknown.
    pub runtime_is_64bit: Option<bool>,
}

impl ArchitectureReport {
    pub fn new(machine: &str, os: &str, runtime_is_64bit: Option<bool>) -> Self {
        let machine = machine.trim().to_lowercase();
        Self {
            machine_is_64bit: is_64bit_machine(&machine),
            machine,
            os: os.to_string(),
            runtime_is_64bit,
        }
    }

    /// Combined verdict. An unreadable runtime width does not count against.
    pub fn is_64bit(&self) -> bool {
        self.machine_is_64bit && self.runtime_is_64bit.unwrap_or(true)
    }
}

impl fmt::Display for ArchitectureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.machine, self.os)
    }
}

/// Substring match against [`X64_ARCHS`].
pub fn is_64bit_machine(machine: &str) -> bool {
    let machine = machine.to_lowercase();
    X64_ARCHS.iter().any(|arch| machine.contains(arch))
}

#[derive(Debug, Clone, Default)]
pub struct PlatformProbe {
    machine_override: Option<String>,
}

impl PlatformProbe {
    pub fn new(machine_override: Option<String>) -> Self {
        Self { machine_override }
    }

    pub fn detect(&self) -> ArchitectureReport {
        let (sysname, machine) = host_uname();
        let machine = self.machine_override.clone().unwrap_or(machine);
        ArchitectureReport::new(&machine, &sysname, runtime_pointer_width_is_64())
    }

    pub fn is_supported(&self) -> bool {
        self.detect().is_64bit()
    }
}

fn runtime_pointer_width_is_64() -> Option<bool> {
    Some(cfg!(target_pointer_width = "64"))
}

/// `(os, machine)` as reported by the running kernel.
fn host_uname() -> (String, String) {
    (whoami::platform().to_string(), whoami::arch().to_string())
}
