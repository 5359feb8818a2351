//! External command execution.
//!
//! Package-manager and key-server operations go through the [`CommandRunner`]
//! trait so the build can run them inside the image (`chroot`) and tests can
//! record them without spawning anything.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tracing::debug;

use crate::error::{Error, Result};

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs an external executable to completion, blocking.
///
/// Implementations must return [`Error::Command`] when the program cannot be
/// spawned or exits non-zero.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        (**self).run(program, args)
    }
}

/// Runs commands on the host, optionally chrooted into the image rootfs.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    chroot: Option<PathBuf>,
}

impl SystemRunner {
    /// Run commands directly on the host.
    pub fn host() -> Self {
        Self { chroot: None }
    }

    /// Run every command as `chroot <rootfs> <program> <args>...`.
    pub fn chroot(rootfs: &Path) -> Self {
        Self {
            chroot: Some(rootfs.to_path_buf()),
        }
    }

    /// Root the commands are chrooted into, `None` when running on the host.
    pub fn chroot_dir(&self) -> Option<&Path> {
        self.chroot.as_deref()
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let cmd = match &self.chroot {
            Some(root) => Cmd::new("chroot")
                .arg_path(root)
                .arg(program)
                .args(args),
            None => Cmd::new(program).args(args),
        };
        cmd.run()
    }
}

/// Builder for a single host command.
pub struct Cmd {
    program: String,
    args: Vec<String>,
}

impl Cmd {
    /// Create a new command for `program`.
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Add a path argument.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Run the command, capturing stdout and stderr.
    pub fn run(self) -> Result<CommandOutput> {
        debug!(program = %self.program, args = ?self.args, "spawning command");

        let output = match Command::new(&self.program).args(&self.args).output() {
            Ok(output) => output,
            Err(e) => {
                return Err(Error::Command {
                    program: self.program,
                    args: self.args,
                    output: format!("failed to execute: {}", e),
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(Error::Command {
                output: failure_output(output.status, &stdout, &stderr),
                program: self.program,
                args: self.args,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

fn failure_output(status: ExitStatus, stdout: &str, stderr: &str) -> String {
    let code = status.code().unwrap_or(-1);
    let captured = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };
    if captured.is_empty() {
        format!("exit code {}", code)
    } else {
        format!("exit code {}\n{}", code, captured)
    }
}
