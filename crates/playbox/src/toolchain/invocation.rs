//! Builder and runner for a single toolchain process

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::toolchain::ToolchainError;
use crate::types::RawOutput;

const TRUNCATION_MARKER: &str = "\n[output truncated]";

/// One external process launch
#[derive(Debug, Clone)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
    timeout: Duration,
    max_output: Option<usize>,
}

impl Invocation {
    /// Create an invocation from an expanded command line
    pub fn new(command: Vec<String>) -> Result<Self, ToolchainError> {
        let mut command = command.into_iter();
        let program = command.next().ok_or(ToolchainError::EmptyCommand)?;
        if program.is_empty() {
            return Err(ToolchainError::EmptyCommand);
        }

        Ok(Self {
            program,
            args: command.collect(),
            working_dir: None,
            env: HashMap::new(),
            timeout: Duration::from_secs(5),
            max_output: None,
        })
    }

    /// Set the working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set an environment variable (the parent environment is inherited)
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set multiple environment variables
    pub fn envs<'a>(mut self, vars: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Set the wall clock deadline
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cap captured bytes per stream
    pub fn max_output(mut self, bytes: Option<usize>) -> Self {
        self.max_output = bytes;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// `./name` is resolved against the working directory, not ours
    fn resolved_program(&self) -> PathBuf {
        match (&self.working_dir, self.program.strip_prefix("./")) {
            (Some(dir), Some(relative)) => dir.join(relative),
            _ => PathBuf::from(&self.program),
        }
    }

    /// Run the process to completion or until the deadline
    ///
    /// The child leads its own process group. When the deadline fires the
    /// whole group is killed and the partial output is discarded.
    #[instrument(skip(self), fields(program = %self.program, timeout = ?self.timeout))]
    pub async fn run(self) -> Result<RawOutput, ToolchainError> {
        let mut command = Command::new(self.resolved_program());
        command
            .args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        #[cfg(unix)]
        command.process_group(0);

        debug!(args = ?self.args, "spawning toolchain process");

        let started = Instant::now();
        let mut child = command.spawn().map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                ToolchainError::NotFound(self.program.clone())
            } else {
                ToolchainError::SpawnFailed {
                    program: self.program.clone(),
                    source,
                }
            }
        })?;
        let pid = child.id();

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let cap = self.max_output;

        let collected = tokio::time::timeout(self.timeout, async {
            tokio::try_join!(
                read_capped(stdout, cap),
                read_capped(stderr, cap),
                child.wait(),
            )
        })
        .await;

        let elapsed = started.elapsed();

        match collected {
            Ok(Ok(((stdout, stdout_truncated), (stderr, stderr_truncated), status))) => {
                let output = RawOutput {
                    stdout: into_text(stdout, stdout_truncated),
                    stderr: into_text(stderr, stderr_truncated),
                    exit_code: status.code(),
                    timed_out: false,
                    elapsed,
                };
                debug!(exit_code = ?output.exit_code, ?elapsed, "toolchain process exited");
                Ok(output)
            }
            Ok(Err(source)) => Err(ToolchainError::WaitFailed {
                program: self.program.clone(),
                source,
            }),
            Err(_) => {
                warn!(?elapsed, "deadline exceeded, killing process group");
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                // Reaps the direct child; kill_on_drop covers the error path
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "child already gone");
                }
                Ok(RawOutput::timed_out(elapsed))
            }
        }
    }
}

/// Read a stream to EOF, keeping at most `cap` bytes
///
/// Bytes beyond the cap are drained and dropped so the child never blocks
/// on a full pipe.
async fn read_capped<R>(reader: Option<R>, cap: Option<usize>) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok((Vec::new(), false));
    };

    let mut kept = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        match cap {
            Some(cap) if kept.len() + n > cap => {
                let room = cap.saturating_sub(kept.len());
                kept.extend_from_slice(&chunk[..room]);
                truncated = true;
            }
            _ => kept.extend_from_slice(&chunk[..n]),
        }
    }

    Ok((kept, truncated))
}

fn into_text(bytes: Vec<u8>, truncated: bool) -> String {
    let mut text = String::from_utf8_lossy(&bytes).into_owned();
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    text
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) takes plain integers; a negative pid addresses the
    // process group led by the child we spawned with process_group(0).
    let rc = unsafe { libc::kill(-pid, libc::SIGKILL) };
    if rc != 0 {
        debug!(pid, error = %std::io::Error::last_os_error(), "process group kill failed");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}
