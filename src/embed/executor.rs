//! Shell execution for command directives.
//!
//! Command directives run through a [`ShellExecutor`] so the resolver can be
//! driven by a fake in tests. [`SystemShell`] is the real implementation:
//! it runs the command through the platform shell with stderr merged into
//! stdout, optionally bounded by a timeout.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Captured result of a shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Combined stdout and stderr.
    pub output: Vec<u8>,
    /// Exit code, `-1` if the process was terminated by a signal.
    pub exit_code: i32,
    pub success: bool,
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` timed out after {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },
    #[error("I/O error while running `{command}`: {message}")]
    Io { command: String, message: String },
}

/// Runs a command string in a working directory and captures its combined output.
pub trait ShellExecutor {
    fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, ExecutorError>;
}

/// Executes commands through the system shell.
#[derive(Debug, Clone)]
pub struct SystemShell {
    /// Shell program and the flag that precedes the script, e.g. `["sh", "-c"]`.
    shell: Vec<String>,
    /// Timeout in milliseconds; `0` waits forever.
    timeout_ms: u64,
}

impl SystemShell {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            shell: default_shell(),
            timeout_ms,
        }
    }

    /// Use a custom shell invocation. An empty `shell` keeps the platform default.
    pub fn with_shell(mut self, shell: Vec<String>) -> Self {
        if !shell.is_empty() {
            self.shell = shell;
        }
        self
    }

    fn build_command(&self, command: &str, cwd: &Path) -> Command {
        let mut cmd = Command::new(&self.shell[0]);
        cmd.args(&self.shell[1..]);
        cmd.arg(merged_output_script(command));
        cmd.current_dir(cwd);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // Own process group so a timeout can take down everything the shell started
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut cmd, 0);
        cmd
    }
}

impl Default for SystemShell {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(unix)]
fn default_shell() -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string()]
}

#[cfg(windows)]
fn default_shell() -> Vec<String> {
    vec!["cmd".to_string(), "/C".to_string()]
}

#[cfg(unix)]
fn merged_output_script(command: &str) -> String {
    format!("exec 2>&1\n{command}")
}

#[cfg(windows)]
fn merged_output_script(command: &str) -> String {
    format!("({command}) 2>&1")
}

impl ShellExecutor for SystemShell {
    fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, ExecutorError> {
        let mut child = self
            .build_command(command, cwd)
            .spawn()
            .map_err(|source| ExecutorError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let mut stdout_handle = child.stdout.take().map(|stdout| thread::spawn(move || read_pipe(stdout)));
        let mut stderr_handle = child.stderr.take().map(|stderr| thread::spawn(move || read_pipe(stderr)));

        let io_error = |message: String| ExecutorError::Io {
            command: command.to_string(),
            message,
        };

        let timeout = Duration::from_millis(self.timeout_ms);
        let status = if timeout.is_zero() {
            child.wait().map_err(|e| io_error(format!("failed to wait: {e}")))?
        } else {
            let start = Instant::now();
            loop {
                if let Some(status) = child.try_wait().map_err(|e| io_error(format!("failed to poll: {e}")))? {
                    break status;
                }
                if start.elapsed() >= timeout {
                    kill_process_tree(&mut child);
                    let _ = child.wait();
                    // Readers finish once the pipes close; anything that escaped
                    // the group may keep them open, so don't wait for them
                    drop(stdout_handle.take());
                    drop(stderr_handle.take());
                    return Err(ExecutorError::Timeout {
                        command: command.to_string(),
                        timeout_ms: self.timeout_ms,
                    });
                }
                thread::sleep(Duration::from_millis(10));
            }
        };

        let mut output = join_reader(stdout_handle.take()).map_err(io_error)?;
        // Anything the shell itself wrote before the redirect took effect
        output.extend(join_reader(stderr_handle.take()).map_err(io_error)?);

        Ok(CommandOutput {
            output,
            exit_code: status.code().unwrap_or(-1),
            success: status.success(),
        })
    }
}

#[cfg(unix)]
fn kill_process_tree(child: &mut Child) {
    if let Ok(pid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: plain syscall on the group created for this child
        unsafe {
            libc::kill(-pid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child) {
    let _ = child.kill();
}

fn read_pipe<R: Read>(mut pipe: R) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(buf)
}

fn join_reader(handle: Option<thread::JoinHandle<std::io::Result<Vec<u8>>>>) -> Result<Vec<u8>, String> {
    match handle {
        Some(handle) => match handle.join() {
            Ok(res) => res.map_err(|e| format!("failed to read output: {e}")),
            Err(_) => Err("output reader thread panicked".to_string()),
        },
        None => Ok(Vec::new()),
    }
}
