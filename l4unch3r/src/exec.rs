//! External process execution.
//!
//! Every tool the launcher drives (version control, package manager) goes
//! through [`CommandRunner`] so the bootstrap stages can be exercised without
//! spawning anything.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Exit status and captured streams of a finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Synchronous process spawner.
///
/// A non-zero exit is *not* an error here; `Err` means the process could not
/// be started at all (missing binary, permission denied, bad cwd).
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> io::Result<CommandOutput>;
}

/// Production runner backed by `duct`, blocking until the child exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct DuctRunner;

impl CommandRunner for DuctRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> io::Result<CommandOutput> {
        debug!(program, ?args, cwd = %cwd.display(), "spawning");

        let output = duct::cmd(program, args)
            .dir(cwd)
            .stdin_null()
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()?;

        let output = CommandOutput::from(output);
        debug!(program, code = ?output.code, "finished");
        Ok(output)
    }
}

/// Look up a binary on `PATH` via `which`.
pub fn find_binary(name: &str) -> Option<PathBuf> {
    Command::new("which")
        .arg(name)
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
            } else {
                None
            }
        })
}

/// Resolve `program` to an absolute executable path once, so repeated
/// invocations hit the same binary. Anything already containing a path
/// separator is taken as-is; unresolvable names fall back to the bare name.
pub fn resolve_program(program: &str) -> String {
    if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
        return program.to_string();
    }

    find_binary(program)
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string())
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted runner for stage tests.

    use super::{CommandOutput, CommandRunner};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;
    use std::path::Path;

    /// One recorded invocation: program followed by its arguments.
    pub type Call = Vec<String>;

    pub enum Reply {
        Output(CommandOutput),
        SpawnError(io::ErrorKind),
    }

    #[derive(Default)]
    pub struct FakeRunner {
        replies: RefCell<VecDeque<Reply>>,
        calls: RefCell<Vec<Call>>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn ok(self, stdout: &str) -> Self {
            self.exit(0, stdout, "")
        }

        pub fn exit(self, code: i32, stdout: &str, stderr: &str) -> Self {
            self.replies.borrow_mut().push_back(Reply::Output(CommandOutput {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            }));
            self
        }

        pub fn spawn_error(self, kind: io::ErrorKind) -> Self {
            self.replies.borrow_mut().push_back(Reply::SpawnError(kind));
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[String], _cwd: &Path) -> io::Result<CommandOutput> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().cloned());
            self.calls.borrow_mut().push(call);

            // Unscripted calls succeed silently.
            match self.replies.borrow_mut().pop_front() {
                Some(Reply::Output(output)) => Ok(output),
                Some(Reply::SpawnError(kind)) => Err(io::Error::new(kind, "scripted failure")),
                None => Ok(CommandOutput {
                    code: Some(0),
                    stdout: String::new(),
                    stderr: String::new(),
                }),
            }
        }
    }
}
