//! Test helpers shared by unit tests.

use std::cell::RefCell;

use crate::error::{Error, Result};
use crate::process::{CommandOutput, CommandRunner};

/// Records every command instead of running it.
///
/// Calls are recorded as `"program arg1 arg2"`. Canned stdout and simulated
/// failures are matched by prefix of that string.
#[derive(Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<String>>,
    failing: Option<String>,
    responses: Vec<(String, String)>,
}

impl RecordingRunner {
    pub fn failing_on(prefix: &str) -> Self {
        Self {
            failing: Some(prefix.to_string()),
            ..Self::default()
        }
    }

    pub fn respond(mut self, prefix: &str, stdout: &str) -> Self {
        self.responses.push((prefix.to_string(), stdout.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.borrow_mut().push(line.clone());

        if let Some(prefix) = &self.failing {
            if line.starts_with(prefix.as_str()) {
                return Err(Error::Command {
                    program: program.to_string(),
                    args: args.to_vec(),
                    output: "simulated failure".to_string(),
                });
            }
        }

        let stdout = self
            .responses
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, stdout)| stdout.clone())
            .unwrap_or_default();

        Ok(CommandOutput {
            stdout,
            stderr: String::new(),
        })
    }
}
