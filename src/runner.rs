//! Subprocess execution
//!
//! Abstracts running external tools (GN, the isolate script) for
//! testability:
//! - CommandRunner trait: run a command to completion and capture output
//! - SystemRunner: real child processes
//! - MockRunner: scripted responses for tests

use std::collections::VecDeque;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;

use tracing::debug;

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status (non-zero means failure)
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Successful run with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed run with the given status
    pub fn failed(status: i32) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runner errors
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("empty command line")]
    Empty,

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs a command and waits for it
pub trait CommandRunner {
    /// Run `cmd` (program first) in `cwd` and capture its output.
    fn call(&self, cmd: &[String], cwd: &Path) -> Result<CommandOutput, RunnerError>;
}

/// Runs real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn call(&self, cmd: &[String], cwd: &Path) -> Result<CommandOutput, RunnerError> {
        let (program, args) = cmd.split_first().ok_or(RunnerError::Empty)?;
        debug!(program = %program, ?args, cwd = %cwd.display(), "spawning");

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|source| RunnerError::Spawn {
                program: program.clone(),
                source,
            })?;

        Ok(CommandOutput {
            // Killed by a signal: no code, report a plain failure
            status: output.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

type Hook = Box<dyn Fn(&[String]) -> Option<CommandOutput> + Send + Sync>;

/// Scripted runner for tests
///
/// Each call is recorded. The response comes from the hook if it returns
/// one, then from the queue, and otherwise is an empty success.
#[derive(Default)]
pub struct MockRunner {
    calls: Mutex<Vec<Vec<String>>>,
    responses: Mutex<VecDeque<CommandOutput>>,
    hook: Option<Hook>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next call
    pub fn with_response(self, output: CommandOutput) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(output);
        }
        self
    }

    /// Inspect each command; returning `Some` answers the call. Hooks may
    /// write files the real tool would produce.
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&[String]) -> Option<CommandOutput> + Send + Sync + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Commands run so far, in order
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl CommandRunner for MockRunner {
    fn call(&self, cmd: &[String], _cwd: &Path) -> Result<CommandOutput, RunnerError> {
        if cmd.is_empty() {
            return Err(RunnerError::Empty);
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(cmd.to_vec());
        }

        if let Some(output) = self.hook.as_ref().and_then(|hook| hook(cmd)) {
            return Ok(output);
        }
        let queued = self.responses.lock().ok().and_then(|mut r| r.pop_front());
        Ok(queued.unwrap_or_default())
    }
}
