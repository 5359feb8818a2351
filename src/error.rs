//! Error types for rootfs configuration.
//!
//! Every failure carries enough context (path, command, target) to be shown
//! to the user verbatim by whoever drives the build.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A filesystem operation failed on `path`.
    #[error("Failed to {action} '{}'", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An external command could not be spawned or exited non-zero.
    #[error("Command '{}' failed{}", command_line(program, args), format_output(output))]
    Command {
        program: String,
        args: Vec<String>,
        /// Captured stderr (or the spawn error) of the failing command.
        output: String,
    },

    /// The operation has no valid behavior for this target or manager.
    #[error("{operation} not supported for {target}")]
    Unsupported { operation: String, target: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },
}

impl Error {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsupported(operation: impl Into<String>, target: impl Into<String>) -> Self {
        Error::Unsupported {
            operation: operation.into(),
            target: target.into(),
        }
    }

    /// True for [`Error::Unsupported`], which callers may treat as "no artifact".
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported { .. })
    }
}

fn command_line(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

fn format_output(output: &str) -> String {
    let output = output.trim();
    if output.is_empty() {
        String::new()
    } else {
        format!(":\n{}", output)
    }
}
