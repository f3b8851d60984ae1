//! External Command Execution
//!
//! Every CIME utility (`create_clone`, `xmlchange`, `case.submit`) goes
//! through the `CommandRunner` trait, so orchestration can be exercised
//! against a recording fake instead of a real CESM installation.

mod cime;

pub use cime::{CimeTools, DEFAULT_CIME_SCRIPTS};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{LatticeError, Result};
use crate::utils::{truncate_text, TruncationPolicy};

/// Program, arguments and working directory of one external call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// File name of the program, e.g. `xmlchange`.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Exit status and captured streams of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion. A non-zero exit is not an error here.
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput>;

    /// Run the command and turn a non-zero exit into `CommandFailed`.
    async fn run_checked(&self, command: &CommandSpec) -> Result<CommandOutput> {
        let output = self.run(command).await?;
        if output.success() {
            return Ok(output);
        }
        warn!(command = %command, status = output.status, "command failed");
        Err(LatticeError::CommandFailed {
            command: command.to_string(),
            status: output.status,
            stderr: failure_excerpt(&output.stderr),
        })
    }
}

/// Last lines of a failed command's stderr, capped in size for error messages.
fn failure_excerpt(stderr: &str) -> String {
    let tail = truncate_text(stderr.trim(), TruncationPolicy::Lines(STDERR_LINES));
    truncate_text(&tail, TruncationPolicy::Bytes(STDERR_BYTES))
}

const STDERR_LINES: usize = 40;
const STDERR_BYTES: usize = 2000;

/// Runs commands as child processes, waiting for each to exit.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    /// Append command lines and their output here instead of only capturing them
    log_file: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    async fn append_log(&self, command: &CommandSpec, output: &CommandOutput) -> Result<()> {
        let Some(path) = &self.log_file else {
            return Ok(());
        };
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| LatticeError::io(path, e))?;
        let entry = format!(
            "$ {}\n{}{}[exit {}]\n\n",
            command, output.stdout, output.stderr, output.status
        );
        file.write_all(entry.as_bytes())
            .await
            .map_err(|e| LatticeError::io(path, e))
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        debug!(command = %command, cwd = ?command.cwd, "running command");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| LatticeError::io(&command.program, e))?;
        let output = CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        self.append_log(command, &output).await?;
        Ok(output)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fake for unit tests.

    use super::*;
    use std::sync::Mutex;

    /// Records every call. `create_clone` is simulated by creating the case
    /// directory and seeding it with the configured files.
    #[derive(Default)]
    pub struct RecordingRunner {
        calls: Mutex<Vec<CommandSpec>>,
        case_files: Vec<(String, String)>,
        fail_program: Option<String>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_case_file(mut self, name: &str, content: &str) -> Self {
            self.case_files.push((name.to_string(), content.to_string()));
            self
        }

        pub fn failing(mut self, program: &str) -> Self {
            self.fail_program = Some(program.to_string());
            self
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().map(|c| c.to_vec()).unwrap_or_default()
        }

        pub fn calls_to(&self, program: &str) -> Vec<CommandSpec> {
            self.calls()
                .into_iter()
                .filter(|c| c.program_name() == program)
                .collect()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(command.clone());
            }
            if self.fail_program.as_deref() == Some(command.program_name().as_str()) {
                return Ok(CommandOutput {
                    status: 1,
                    stderr: "simulated failure".to_string(),
                    ..Default::default()
                });
            }
            if command.program_name() == "create_clone" {
                let case = command
                    .args
                    .iter()
                    .position(|a| a == "--case")
                    .and_then(|i| command.args.get(i + 1))
                    .map(PathBuf::from)
                    .ok_or_else(|| LatticeError::configuration("create_clone without --case"))?;
                std::fs::create_dir_all(&case).map_err(|e| LatticeError::io(&case, e))?;
                for (name, content) in &self.case_files {
                    let path = case.join(name);
                    std::fs::write(&path, content).map_err(|e| LatticeError::io(&path, e))?;
                }
            }
            Ok(CommandOutput::default())
        }
    }
}
