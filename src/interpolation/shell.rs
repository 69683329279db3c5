//! Synchronous shell command execution with a bounded timeout

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::EvalError;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Runs shell interpolations through `<program> -c <command>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellRunner {
    pub enabled: bool,
    pub program: String,
    pub timeout: Duration,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "sh".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner that refuses every command
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `command` and return its trimmed standard output
    pub fn run(&self, command: &str) -> Result<String, EvalError> {
        if !self.enabled {
            return Err(EvalError::Unsupported { kind: "shell" });
        }
        debug!(command, "running shell interpolation");

        let spawn_error = |source| EvalError::Spawn {
            command: command.to_string(),
            source,
        };
        let mut child = Command::new(&self.program)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // Drain both pipes on their own threads so a chatty command cannot
        // block on a full pipe while we wait for it.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait().map_err(spawn_error)? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(EvalError::Timeout {
                        command: command.to_string(),
                        timeout: self.timeout,
                    });
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        let stdout = stdout.map(collect).unwrap_or_default();
        let stderr = stderr.map(collect).unwrap_or_default();

        if !status.success() {
            return Err(EvalError::Failed {
                command: command.to_string(),
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(stdout.trim().to_string())
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}
