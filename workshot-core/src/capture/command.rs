//! External command execution with a bounded timeout.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::DEFAULT_GIT_TIMEOUT_SECS;
use crate::{Result, WorkshotError};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok<S: Into<String>>(stdout: S) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given stderr
    pub fn failed<S: Into<String>>(stderr: S) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Trimmed stdout of a successful run, `None` when it failed or printed nothing
    pub fn trimmed_stdout(&self) -> Option<&str> {
        let out = self.stdout.trim();
        (self.success && !out.is_empty()).then_some(out)
    }

    /// Stdout followed by stderr, trimmed, as a user would see it in a terminal
    pub fn combined(&self) -> String {
        let mut combined = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        combined.push_str(self.stdout.trim_end());
        if !combined.is_empty() && !self.stderr.trim().is_empty() {
            combined.push('\n');
        }
        combined.push_str(self.stderr.trim_end());
        combined.trim().to_string()
    }
}

/// Port for running external programs
///
/// Capturers depend on this instead of `std::process` so their logic can be
/// exercised with scripted output.
pub trait CommandRunner {
    /// Run `program` with `args` and wait for it to exit
    ///
    /// A non-zero exit is reported through `CommandOutput::success`, not as an
    /// error. `Err` means the command could not be run to completion.
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Runs commands as child processes, killing any that exceed the timeout
#[derive(Debug, Clone)]
pub struct SystemCommandRunner {
    timeout: Duration,
    current_dir: Option<PathBuf>,
}

impl SystemCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            current_dir: None,
        }
    }

    /// Run commands in `dir` instead of the process working directory
    pub fn in_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    fn wait_with_timeout(&self, child: &mut Child, description: &str) -> Result<bool> {
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status.success());
            }
            if start.elapsed() > self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                warn!(command = %description, timeout_secs = self.timeout.as_secs(), "command timed out");
                return Err(WorkshotError::Command {
                    command: description.to_string(),
                    message: format!("timed out after {}s", self.timeout.as_secs()),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS))
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let description = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        debug!(command = %description, "running command");

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| WorkshotError::Command {
            command: description.clone(),
            message: e.to_string(),
        })?;

        // Pipes are drained concurrently so a chatty child cannot block on a
        // full pipe while we poll for its exit.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let success = self.wait_with_timeout(&mut child, &description)?;

        Ok(CommandOutput {
            success,
            stdout: join_drain(stdout),
            stderr: join_drain(stderr),
        })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn join_drain(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_stdout() {
        assert_eq!(CommandOutput::ok("main\n").trimmed_stdout(), Some("main"));
        assert_eq!(CommandOutput::ok("  \n").trimmed_stdout(), None);
        assert_eq!(CommandOutput::failed("fatal").trimmed_stdout(), None);
    }

    #[test]
    fn test_combined_output() {
        let output = CommandOutput {
            success: false,
            stdout: "partial\n".to_string(),
            stderr: "error: conflict\n".to_string(),
        };
        assert_eq!(output.combined(), "partial\nerror: conflict");
        assert_eq!(CommandOutput::failed("only stderr\n").combined(), "only stderr");
    }

    #[test]
    fn test_missing_program_is_command_error() {
        let runner = SystemCommandRunner::new(Duration::from_secs(5));
        let result = runner.run("workshot-definitely-not-a-real-program", &["--version"]);
        assert!(matches!(result, Err(WorkshotError::Command { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_collects_stdout_and_exit_status() {
        let runner = SystemCommandRunner::new(Duration::from_secs(5));

        let output = runner.run("sh", &["-c", "echo hello; echo oops >&2"]).unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");

        let output = runner.run("sh", &["-c", "exit 3"]).unwrap();
        assert!(!output.success);
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_command_times_out() {
        let runner = SystemCommandRunner::new(Duration::from_millis(200));
        let result = runner.run("sh", &["-c", "sleep 5"]);
        assert!(matches!(result, Err(WorkshotError::Command { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_in_configured_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let runner = SystemCommandRunner::new(Duration::from_secs(5)).in_dir(dir.path());

        let output = runner.run("pwd", &[]).unwrap();
        let reported = std::path::PathBuf::from(output.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }
}
