//! Broker process lifecycle control.
//!
//! The [`ProcessController`] launches the broker in its own process group
//! so one signal reaches it and any children it spawns, captures combined
//! stdout/stderr, and enforces the escalation contract: a bounded wait,
//! then — only if the wait times out — a single forced kill followed by a
//! final reap. The process is always reaped through one of those paths.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::{HarnessError, Result};

/// Command line used to launch the broker under test.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

impl ProcessSpec {
    /// Create a spec from a program and its arguments.
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Build a spec from a full command line (`["cargo", "run"]`).
    ///
    /// Returns `None` for an empty command line.
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

/// Lifecycle state of the broker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Spawn requested but not yet confirmed.
    Starting,
    /// Spawned and (presumably) serving.
    Running,
    /// A termination signal has been delivered to the group.
    SignalSent,
    /// Exited and reaped after a bounded wait.
    Exited,
    /// Did not exit in time; killed unconditionally and reaped.
    ForceKilled,
}

/// Result of delivering a signal to the process group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Signal delivered to a live group.
    Delivered,
    /// The group was already gone — benign, not an error.
    AlreadyTerminated,
}

/// Result of a bounded wait for process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The process exited; the code follows the `subprocess` convention
    /// (negated signal number when signal-terminated, `None` only when
    /// neither a code nor a signal is available).
    Exited(Option<i32>),
    /// The timeout elapsed with the process still running.
    TimedOut,
}

/// Controls one broker child process.
#[derive(Debug)]
pub struct ProcessController {
    child: Child,
    pid: i32,
    state: ProcessState,
    output: Arc<Mutex<Vec<u8>>>,
    capture_tasks: Vec<JoinHandle<()>>,
}

impl ProcessController {
    /// Launch the broker in a new process group.
    ///
    /// stdout and stderr are piped and drained into a single combined
    /// capture buffer by background tasks, so the child can never block
    /// on a full pipe. State moves Starting → Running.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Launch`] if the spawn fails or the child
    /// dies before a pid can be observed. This is the one scenario-fatal
    /// failure.
    pub async fn start(spec: &ProcessSpec) -> Result<Self> {
        tracing::info!(program = %spec.program, args = ?spec.args, "starting broker");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .process_group(0);

        let mut child = command.spawn().map_err(|e| {
            HarnessError::Launch(format!("failed to spawn `{}`: {e}", spec.program))
        })?;

        let pid = child
            .id()
            .ok_or_else(|| HarnessError::Launch("broker exited before a pid was observed".into()))?
            as i32;

        let output = Arc::new(Mutex::new(Vec::new()));
        let mut capture_tasks = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            capture_tasks.push(spawn_capture(stdout, Arc::clone(&output)));
        }
        if let Some(stderr) = child.stderr.take() {
            capture_tasks.push(spawn_capture(stderr, Arc::clone(&output)));
        }

        tracing::info!(pid, "broker running");
        Ok(Self {
            child,
            pid,
            state: ProcessState::Running,
            output,
            capture_tasks,
        })
    }

    /// Process id of the group leader (the broker itself).
    #[inline]
    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Deliver `sig` to the whole process group.
    ///
    /// ESRCH (no such process group) means the broker already exited and
    /// is reported as [`SignalOutcome::AlreadyTerminated`].
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Signal`] for any other delivery failure,
    /// which is scenario-fatal.
    pub fn signal_group(&mut self, sig: Signal) -> Result<SignalOutcome> {
        // process_group(0) made the child its own group leader, so the
        // group id equals its pid.
        match killpg(Pid::from_raw(self.pid), sig) {
            Ok(()) => {
                tracing::info!(pid = self.pid, signal = %sig, "signaled process group");
                self.state = ProcessState::SignalSent;
                Ok(SignalOutcome::Delivered)
            }
            Err(Errno::ESRCH) => {
                tracing::info!(pid = self.pid, "process group already terminated");
                Ok(SignalOutcome::AlreadyTerminated)
            }
            Err(e) => Err(HarnessError::Signal(format!(
                "killpg({}, {sig}) failed: {e}",
                self.pid
            ))),
        }
    }

    /// Wait for exit, bounded by `timeout`.
    ///
    /// On exit the process is reaped and state moves to `Exited`. On
    /// timeout the process keeps running and the caller is expected to
    /// escalate via [`force_kill`](Self::force_kill).
    pub async fn wait(&mut self, timeout: Duration) -> Result<WaitOutcome> {
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => {
                let code = exit_code(&status?);
                self.state = ProcessState::Exited;
                tracing::info!(pid = self.pid, ?code, "broker exited");
                Ok(WaitOutcome::Exited(code))
            }
            Err(_) => {
                tracing::warn!(pid = self.pid, "broker did not exit within {:?}", timeout);
                Ok(WaitOutcome::TimedOut)
            }
        }
    }

    /// Kill the process group unconditionally, then reap.
    ///
    /// The escalation path for a wait timeout. The final reap is
    /// unbounded by design: after SIGKILL the only thing left to collect
    /// is the zombie entry, and skipping it would leak the process.
    pub async fn force_kill(&mut self) -> Result<Option<i32>> {
        tracing::warn!(pid = self.pid, "force-killing broker process group");
        // ESRCH here means it died between the wait timeout and now.
        match killpg(Pid::from_raw(self.pid), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => {
                return Err(HarnessError::Signal(format!(
                    "killpg({}, SIGKILL) failed: {e}",
                    self.pid
                )))
            }
        }
        let status = self.child.wait().await?;
        self.state = ProcessState::ForceKilled;
        Ok(exit_code(&status))
    }

    /// Combined captured stdout/stderr.
    ///
    /// Waits briefly for the drain tasks to hit EOF so output produced
    /// right before exit is included. Call after the process has been
    /// reaped.
    pub async fn output(&mut self) -> String {
        for task in self.capture_tasks.drain(..) {
            let _ = tokio::time::timeout(Duration::from_secs(1), task).await;
        }
        let buffer = self.output.lock().await;
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Drain one child pipe into the shared combined buffer until EOF.
fn spawn_capture(
    mut reader: impl AsyncRead + Unpin + Send + 'static,
    buffer: Arc<Mutex<Vec<u8>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buffer.lock().await.extend_from_slice(&chunk[..n]),
            }
        }
    })
}

/// Exit code following the `subprocess` convention: the code when the
/// process exited normally, the negated signal number when it was
/// signal-terminated.
fn exit_code(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.code().or_else(|| status.signal().map(|s| -s))
}
