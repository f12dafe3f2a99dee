//! Payload hand-off.
//!
//! The payload is a dynamic library exporting a no-argument entry symbol
//! (`main` by default) with the signature
//! `extern "C-unwind" fn() -> c_int`. Zero means success. Loading goes
//! through [`PayloadLoader`] so the launcher never depends on how the
//! payload is materialized.
//!
//! A payload built against its own copy of std cannot be unwound into this
//! process, so the launcher runs it through [`IsolatedLoader`]: a second
//! copy of this executable (the payload host) loads and calls the entry
//! point, and reports the outcome through its exit status. An abort or
//! signal inside the payload ends the host, not the launcher.

use crate::error::{
    EntryPointMissingSnafu, InvocationFailedSnafu, LaunchError, LoadFailedSnafu,
    PayloadNotFoundSnafu,
};
use libloading::{Library, Symbol};
use std::ffi::{OsString, c_int};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tracing::{debug, info};

/// Hidden flag that turns the executable into a payload host.
pub const RUN_PAYLOAD_FLAG: &str = "--run-payload";
pub const ENTRY_SYMBOL_FLAG: &str = "--entry-symbol";

// Payload host exit statuses (sysexits values).
pub const HOST_EXIT_LOAD_FAILED: i32 = 65;
pub const HOST_EXIT_NOT_FOUND: i32 = 66;
pub const HOST_EXIT_ENTRY_MISSING: i32 = 69;
pub const HOST_EXIT_INVOCATION_FAILED: i32 = 70;

/// A resolved entry point.
pub type EntryPoint<'a> = Box<dyn Fn() -> Result<(), LaunchError> + 'a>;

/// Opaque loaded payload.
pub trait Payload {
    /// `None` when the symbol is known not to be exported.
    fn entry_point(&self, symbol: &str) -> Option<EntryPoint<'_>>;
}

pub trait PayloadLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn Payload>, LaunchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    Completed,
    Failed(LaunchError),
}

impl LaunchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

pub struct Launcher<'a> {
    loader: &'a dyn PayloadLoader,
    path: PathBuf,
    entry_symbol: &'a str,
}

impl<'a> Launcher<'a> {
    pub fn new(loader: &'a dyn PayloadLoader, path: PathBuf, entry_symbol: &'a str) -> Self {
        Self {
            loader,
            path,
            entry_symbol,
        }
    }

    /// Load, resolve, invoke. Every failure becomes [`LaunchOutcome::Failed`].
    pub fn launch_payload(&self) -> LaunchOutcome {
        match self.try_launch() {
            Ok(()) => LaunchOutcome::Completed,
            Err(err) => LaunchOutcome::Failed(err),
        }
    }

    fn try_launch(&self) -> Result<(), LaunchError> {
        let payload = self.loader.load(&self.path)?;
        debug!(path = %self.path.display(), "payload loaded");

        let entry = payload.entry_point(self.entry_symbol).ok_or_else(|| {
            EntryPointMissingSnafu {
                symbol: self.entry_symbol,
            }
            .build()
        })?;

        info!(symbol = self.entry_symbol, "invoking payload entry point");
        entry()
    }
}

/// Loads payloads as native shared libraries into this process.
///
/// Only the payload host uses this directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibLoader;

impl PayloadLoader for DylibLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn Payload>, LaunchError> {
        if !path.exists() {
            return PayloadNotFoundSnafu { path }.fail();
        }

        // SAFETY: loading runs the library's initializers; the payload is
        // trusted by configuration.
        let library = unsafe { Library::new(path) }.map_err(|err| {
            LoadFailedSnafu {
                path,
                message: err.to_string(),
            }
            .build()
        })?;

        Ok(Box::new(DylibPayload { library }))
    }
}

struct DylibPayload {
    library: Library,
}

type RawEntry = unsafe extern "C-unwind" fn() -> c_int;

impl Payload for DylibPayload {
    fn entry_point(&self, symbol: &str) -> Option<EntryPoint<'_>> {
        let mut name = symbol.as_bytes().to_vec();
        name.push(0);

        // SAFETY: the entry point ABI is fixed by convention (see module docs).
        let entry: Symbol<'_, RawEntry> = unsafe { self.library.get(&name) }.ok()?;

        Some(Box::new(move || {
            let status = unsafe { entry() };
            if status == 0 {
                Ok(())
            } else {
                InvocationFailedSnafu {
                    message: format!("entry point returned status {status}"),
                }
                .fail()
            }
        }))
    }
}

/// Body of the payload host: load and call in this process, then map the
/// outcome to an exit status for the launcher.
pub fn host_payload(path: &Path, entry_symbol: &str) -> i32 {
    match Launcher::new(&DylibLoader, path.to_path_buf(), entry_symbol).launch_payload() {
        LaunchOutcome::Completed => 0,
        LaunchOutcome::Failed(err) => {
            eprintln!("❌ {err}");
            host_exit_code(&err)
        }
    }
}

fn host_exit_code(err: &LaunchError) -> i32 {
    match err {
        LaunchError::PayloadNotFound { .. } => HOST_EXIT_NOT_FOUND,
        LaunchError::LoadFailed { .. } => HOST_EXIT_LOAD_FAILED,
        LaunchError::EntryPointMissing { .. } => HOST_EXIT_ENTRY_MISSING,
        LaunchError::InvocationFailed { .. } => HOST_EXIT_INVOCATION_FAILED,
    }
}

/// Runs the payload inside a payload host process.
#[derive(Debug, Clone)]
pub struct IsolatedLoader {
    host: PathBuf,
}

impl IsolatedLoader {
    /// `host` must accept [`RUN_PAYLOAD_FLAG`]; normally this executable.
    pub fn new(host: impl Into<PathBuf>) -> Self {
        Self { host: host.into() }
    }

    pub fn current() -> std::io::Result<Self> {
        std::env::current_exe().map(Self::new)
    }
}

impl PayloadLoader for IsolatedLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn Payload>, LaunchError> {
        if !path.exists() {
            return PayloadNotFoundSnafu { path }.fail();
        }
        Ok(Box::new(IsolatedPayload {
            host: self.host.clone(),
            path: path.to_path_buf(),
        }))
    }
}

struct IsolatedPayload {
    host: PathBuf,
    path: PathBuf,
}

impl Payload for IsolatedPayload {
    // The symbol is resolved by the host; a missing export surfaces on call.
    fn entry_point(&self, symbol: &str) -> Option<EntryPoint<'_>> {
        let symbol = symbol.to_string();
        Some(Box::new(move || self.invoke(&symbol)))
    }
}

impl IsolatedPayload {
    fn invoke(&self, symbol: &str) -> Result<(), LaunchError> {
        let args: Vec<OsString> = vec![
            RUN_PAYLOAD_FLAG.into(),
            self.path.clone().into_os_string(),
            ENTRY_SYMBOL_FLAG.into(),
            symbol.into(),
        ];
        debug!(host = %self.host.display(), "starting payload host");

        // stdio stays attached: the payload talks to the user directly.
        let output = duct::cmd(self.host.as_path(), args)
            .unchecked()
            .run()
            .map_err(|err| {
                LoadFailedSnafu {
                    path: &self.path,
                    message: format!("could not start payload host: {err}"),
                }
                .build()
            })?;

        classify_host_exit(output.status, &self.path, symbol)
    }
}

fn classify_host_exit(status: ExitStatus, path: &Path, symbol: &str) -> Result<(), LaunchError> {
    match status.code() {
        Some(0) => Ok(()),
        Some(HOST_EXIT_NOT_FOUND) => PayloadNotFoundSnafu { path }.fail(),
        Some(HOST_EXIT_LOAD_FAILED) => LoadFailedSnafu {
            path,
            message: "rejected by the dynamic loader",
        }
        .fail(),
        Some(HOST_EXIT_ENTRY_MISSING) => EntryPointMissingSnafu { symbol }.fail(),
        Some(HOST_EXIT_INVOCATION_FAILED) => InvocationFailedSnafu {
            message: "entry point reported failure",
        }
        .fail(),
        Some(code) => InvocationFailedSnafu {
            message: format!("payload exited with status {code}"),
        }
        .fail(),
        None => InvocationFailedSnafu {
            message: abnormal_termination(status),
        }
        .fail(),
    }
}

#[cfg(unix)]
fn abnormal_termination(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;

    match status.signal() {
        Some(signal) => format!("payload terminated by signal {signal}"),
        None => format!("payload terminated abnormally ({status})"),
    }
}

#[cfg(not(unix))]
fn abnormal_termination(status: ExitStatus) -> String {
    format!("payload terminated abnormally ({status})")
}
