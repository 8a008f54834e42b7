//! Builder for executing external converters with timeout support.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use daopub_common::{Error, Result};
use tokio::process::Command;

use crate::config::ToolSpec;

/// Default command timeout: 1 hour. PDF assembly over a few hundred
/// 3200px pages is slow.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// Arguments are passed as an argument vector, never through a shell, so
/// titles containing quotes or spaces reach the tool unchanged.
///
/// # Example
///
/// ```no_run
/// use daopub::tools::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> daopub_common::Result<()> {
/// let output = ToolCommand::new("xslt", PathBuf::from("java"))
///     .arg("-jar").arg("saxon9he.jar")
///     .arg("-xsl:folder2mets.xsl")
///     .arg("-s:/data/C0022/c0031.xml")
///     .arg("-o:/mets/C0022/c0031.mets")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command. `name` labels the tool in errors and logs.
    pub fn new(name: impl Into<String>, program: PathBuf) -> Self {
        Self {
            name: name.into(),
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a command from a configured program and its leading arguments.
    pub fn from_spec(name: impl Into<String>, spec: &ToolSpec) -> Self {
        let mut cmd = Self::new(name, spec.program.clone());
        cmd.args(spec.args.iter().cloned());
        cmd
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append a path argument.
    pub fn arg_path(&mut self, path: &Path) -> &mut Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// The tool label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full argument vector, for logging and dry runs.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalTool`] when the process cannot be spawned,
    /// times out (the child is killed), or exits non-zero. A non-zero exit
    /// carries the exit code and captured stderr.
    pub async fn execute(&self) -> Result<ToolOutput> {
        tracing::debug!(tool = %self.name, argv = ?self.argv(), "Running external tool");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            Error::tool(
                &self.name,
                format!("failed to spawn {}: {e}", self.program.display()),
            )
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    return Err(Error::ExternalTool {
                        tool: self.name.clone(),
                        status: output.status.code(),
                        message: format!(
                            "exited with status {}: {}",
                            output.status,
                            tool_output.stderr.trim()
                        ),
                        stderr: tool_output.stderr,
                    });
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(Error::tool(
                &self.name,
                format!("I/O error waiting for process: {e}"),
            )),
            Err(_elapsed) => Err(Error::tool(
                &self.name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}
