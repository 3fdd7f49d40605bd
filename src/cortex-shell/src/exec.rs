//! Running a single command through the host shell.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::shell::{ShellInvocationConfig, ShellPlatform};

/// How long a cancelled process group gets between SIGTERM and SIGKILL.
pub const KILL_GRACE_PERIOD: Duration = Duration::from_millis(200);

/// How long output is still collected once the shell itself is gone.
pub const OUTPUT_DRAIN_WINDOW: Duration = Duration::from_millis(150);

/// Variables forced on every child so tools never wait on a terminal.
const NON_INTERACTIVE_ENV: &[(&str, &str)] = &[
    ("CORTEX_CLI", "1"),
    ("TERM", "dumb"),
    ("NO_COLOR", "1"),
    ("PAGER", "cat"),
    ("GIT_PAGER", "cat"),
];

/// Output chunk from streaming execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChunk {
    Stdout(String),
    Stderr(String),
}

impl OutputChunk {
    pub fn text(&self) -> &str {
        match self {
            Self::Stdout(s) | Self::Stderr(s) => s,
        }
    }
}

/// Outcome of one shell command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Stdout and stderr interleaved in arrival order.
    pub output: String,
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    /// Terminating signal, when the process was killed by one.
    pub signal: Option<i32>,
    /// Set when the process could not be started or waited on.
    pub spawn_error: Option<String>,
    /// Whether cancellation was requested while the command was live.
    pub aborted: bool,
}

impl ExecutionResult {
    /// A result for a process that never ran (or could not be reaped).
    pub fn spawn_failure(message: impl Into<String>, aborted: bool) -> Self {
        Self {
            spawn_error: Some(message.into()),
            aborted,
            ..Default::default()
        }
    }

    /// True for a clean zero exit.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && self.spawn_error.is_none() && !self.aborted
    }
}

/// A spawned command whose result is still pending.
pub struct ShellExecution {
    /// OS process id; `None` when nothing was spawned.
    pub pid: Option<u32>,
    /// Resolves once the child has exited or been torn down.
    pub result: BoxFuture<'static, ExecutionResult>,
}

impl ShellExecution {
    fn resolved(result: ExecutionResult) -> Self {
        Self {
            pid: None,
            result: futures::future::ready(result).boxed(),
        }
    }
}

impl std::fmt::Debug for ShellExecution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellExecution")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// Spawns commands through a resolved shell invocation.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutionService {
    config: ShellInvocationConfig,
}

impl ShellExecutionService {
    /// Service using the shell detected for this process.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ShellInvocationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShellInvocationConfig {
        &self.config
    }

    /// Spawn `command` in `cwd`.
    ///
    /// Output is forwarded to `output` as it arrives and also accumulated
    /// into the final [`ExecutionResult`]; a reader that falls behind never
    /// delays the result. Cancelling `cancel` terminates the child together
    /// with its process group. The result resolves when the shell exits,
    /// plus at most [`OUTPUT_DRAIN_WINDOW`] for trailing output. Must be
    /// called from within a tokio runtime.
    pub fn execute(
        &self,
        command: &str,
        cwd: &Path,
        output: Option<mpsc::Sender<OutputChunk>>,
        cancel: CancellationToken,
    ) -> ShellExecution {
        if cancel.is_cancelled() {
            debug!(command, "Cancellation requested before spawn");
            return ShellExecution::resolved(ExecutionResult::spawn_failure(
                "cancelled before the shell was started",
                true,
            ));
        }

        let mut cmd = self.build_command(command, cwd);
        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                // A kill racing the spawn is an abort, not a failure.
                let aborted = cancel.is_cancelled();
                if !aborted {
                    warn!(command, executable = %self.config.executable, error = %e, "Failed to spawn shell");
                }
                return ShellExecution::resolved(ExecutionResult::spawn_failure(
                    format!("failed to spawn {}: {e}", self.config.executable),
                    aborted,
                ));
            }
        };

        let pid = child.id();
        debug!(?pid, command, cwd = %cwd.display(), "Spawned shell command");

        ShellExecution {
            pid,
            result: collect(child, pid, output, cancel).boxed(),
        }
    }

    /// Spawn and wait in one step.
    pub async fn run(
        &self,
        command: &str,
        cwd: &Path,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        self.execute(command, cwd, None, cancel).result.await
    }

    fn build_command(&self, command: &str, cwd: &Path) -> Command {
        let mut cmd = Command::new(&self.config.executable);
        cmd.args(&self.config.argument_prefix);

        match self.config.platform {
            ShellPlatform::Posix => {
                cmd.arg(command);
            }
            ShellPlatform::Windows => {
                // cmd.exe /s strips exactly one pair of outer quotes.
                #[cfg(windows)]
                cmd.raw_arg(format!("\"{command}\""));
                #[cfg(not(windows))]
                cmd.arg(command);
            }
        }

        cmd.current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .envs(NON_INTERACTIVE_ENV.iter().copied())
            .kill_on_drop(true);

        // Unix-specific: put the shell in its own process group so the
        // whole pipeline can be signalled at once.
        #[cfg(unix)]
        {
            // SAFETY: setpgid only changes process group, no undefined behavior
            unsafe {
                cmd.pre_exec(|| {
                    if libc::setpgid(0, 0) == -1 {
                        return Err(std::io::Error::last_os_error());
                    }
                    Ok(())
                });
            }
        }

        cmd
    }
}

async fn collect(
    mut child: Child,
    pid: Option<u32>,
    output: Option<mpsc::Sender<OutputChunk>>,
    cancel: CancellationToken,
) -> ExecutionResult {
    let (tx, mut rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(pump(stdout, tx.clone(), OutputChunk::Stdout));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(pump(stderr, tx.clone(), OutputChunk::Stderr));
    }
    drop(tx);

    let relay = output.map(|sender| forward(sender, cancel.clone()));
    let mut combined = String::new();
    let mut aborted = false;
    let mut pipes_closed = false;

    let status = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                aborted = true;
                terminate(&mut child, pid).await;
                break child.wait().await;
            }

            chunk = rx.recv(), if !pipes_closed => match chunk {
                Some(chunk) => record(&mut combined, relay.as_ref(), chunk),
                None => pipes_closed = true,
            },

            status = child.wait() => break status,
        }
    };

    // Background jobs may keep the pipes open long after the shell exits.
    if !pipes_closed {
        let deadline = tokio::time::Instant::now() + OUTPUT_DRAIN_WINDOW;
        while let Ok(Some(chunk)) = tokio::time::timeout_at(deadline, rx.recv()).await {
            record(&mut combined, relay.as_ref(), chunk);
        }
    }

    match status {
        Ok(status) => {
            #[cfg(unix)]
            let signal = std::os::unix::process::ExitStatusExt::signal(&status);
            #[cfg(not(unix))]
            let signal = None;

            debug!(?pid, exit_code = ?status.code(), ?signal, aborted, "Shell command finished");
            ExecutionResult {
                output: combined,
                exit_code: status.code(),
                signal,
                spawn_error: None,
                aborted,
            }
        }
        Err(e) => {
            if !aborted {
                warn!(?pid, error = %e, "Failed to wait for shell command");
            }
            ExecutionResult {
                output: combined,
                ..ExecutionResult::spawn_failure(format!("failed to wait for shell: {e}"), aborted)
            }
        }
    }
}

fn record(
    combined: &mut String,
    relay: Option<&mpsc::UnboundedSender<OutputChunk>>,
    chunk: OutputChunk,
) {
    combined.push_str(chunk.text());
    if let Some(relay) = relay {
        let _ = relay.send(chunk);
    }
}

/// Relay chunks to the caller's channel without letting a slow reader
/// hold up the process itself. Stops once `cancel` fires or the reader
/// goes away.
fn forward(
    sender: mpsc::Sender<OutputChunk>,
    cancel: CancellationToken,
) -> mpsc::UnboundedSender<OutputChunk> {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputChunk>();
    tokio::spawn(async move {
        while let Some(chunk) = rx.recv().await {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = sender.send(chunk) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
    });
    tx
}

/// Forward one pipe line by line, preserving the original bytes.
async fn pump<R>(
    reader: R,
    tx: mpsc::UnboundedSender<OutputChunk>,
    wrap: fn(String) -> OutputChunk,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    loop {
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                if tx.send(wrap(String::from_utf8_lossy(&buf).into_owned())).is_err() {
                    break;
                }
            }
        }
    }
}

async fn terminate(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pid) = pid {
            signal_group(pid, libc::SIGTERM);
            if tokio::time::timeout(KILL_GRACE_PERIOD, child.wait())
                .await
                .is_ok()
            {
                return;
            }
            signal_group(pid, libc::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
    }

    if let Err(e) = child.start_kill() {
        debug!(error = %e, "Child already gone during kill");
    }
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created by setpgid at spawn
    let rc = unsafe { libc::killpg(pgid, signal) };
    if rc == -1 {
        warn!(pid, signal, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}
