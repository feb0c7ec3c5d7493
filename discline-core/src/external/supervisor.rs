// ============================================================================
// discline-core/src/external/supervisor.rs
// ============================================================================
//
// PROCESS SUPERVISION: One External Worker Process per Run
//
// The supervisor spawns the configured command, reads stdout and stderr on
// background threads and funnels every line into a single channel, so lines
// from both streams arrive in the order they were read. A waiter thread polls
// the child for exit and optionally enforces a watchdog.
//
// Termination is polite first: the process gets SIGTERM so it can close its
// output, and the waiter escalates to SIGKILL once the termination grace
// period has passed without an exit.
//
// The consumer drains the channel with `next_event`. An exit reported by the
// waiter is held back until both output streams have closed (or a short
// flush grace period has passed), so no output line is ever delivered after
// the exit event. Once the exit has been delivered the run is over and any
// late output is dropped.
//
// KEY COMPONENTS:
// - ProcessCommand: pure description of what to run
// - ProcessSupervisor: lifecycle Unconfigured -> Configured -> Running -> Exited
// - CancelHandle: thread-safe cancellation for other threads
// - ExitInfo: how the run ended

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use super::line_buffer::LineBuffer;
use crate::error::{CoreError, CoreResult, spawn_error};

/// How long after the exit to keep waiting for stream EOF before the exit is
/// delivered anyway (a grandchild may hold a pipe open).
const OUTPUT_FLUSH_GRACE: Duration = Duration::from_secs(2);

/// Which output stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Where the child's stdout goes. Stderr is always captured.
#[derive(Debug, Default)]
pub enum OutputSink {
    /// Read stdout line by line like stderr.
    #[default]
    Capture,
    /// Send stdout straight into a file or pipe; only stderr is parsed.
    Redirect(File),
}

/// Everything needed to launch one process. Building it has no side effects.
#[derive(Debug)]
pub struct ProcessCommand {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    stdout: OutputSink,
}

impl ProcessCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            stdout: OutputSink::Capture,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn output_sink(mut self, sink: OutputSink) -> Self {
        self.stdout = sink;
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// The command line as one string, for logs and debugging output.
    #[must_use]
    pub fn joined(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Supervisor timing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOptions {
    /// How often the waiter thread checks for exit.
    pub poll_interval: Duration,
    /// How long a terminated process may take to exit before it is killed.
    pub termination_grace: Duration,
    /// Terminate the process when it runs longer than this.
    pub watchdog: Option<Duration>,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            termination_grace: Duration::from_secs(5),
            watchdog: None,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// False when the process was terminated by a signal.
    pub normal_exit: bool,
    /// Exit code, or the signal number for an abnormal exit.
    pub exit_code: i32,
    /// `cancel` was called before the process exited.
    pub user_canceled: bool,
    /// The watchdog killed the process.
    pub timed_out: bool,
}

impl ExitInfo {
    fn from_status(status: ExitStatus, user_canceled: bool, timed_out: bool) -> Self {
        let (normal_exit, exit_code) = match status.code() {
            Some(code) => (true, code),
            None => (false, signal_of(status)),
        };
        Self {
            normal_exit,
            exit_code,
            user_canceled,
            timed_out,
        }
    }
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().unwrap_or(-1)
}

#[cfg(not(unix))]
fn signal_of(_status: ExitStatus) -> i32 {
    -1
}

/// Delivered by [`ProcessSupervisor::next_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    Line { stream: OutputStream, text: String },
    /// Always the last event of a run.
    Exited(ExitInfo),
}

/// Lifecycle of a supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Unconfigured,
    Configured,
    Running,
    Exited,
}

enum Message {
    Line(OutputStream, String),
    StreamClosed,
    Exited(ExitInfo),
}

struct ChildSlot {
    child: Child,
    /// Status observed by `cancel` or the waiter; set at most once.
    status: Option<ExitStatus>,
    /// The waiter has delivered the exit.
    reaped: bool,
    user_canceled: bool,
    timed_out: bool,
    /// When SIGTERM was first sent.
    terminate_sent: Option<Instant>,
    killed: bool,
}

impl ChildSlot {
    fn new(child: Child) -> Self {
        Self {
            child,
            status: None,
            reaped: false,
            user_canceled: false,
            timed_out: false,
            terminate_sent: None,
            killed: false,
        }
    }

    /// The process has not been waited for yet, so its pid is still ours.
    fn is_live(&self) -> bool {
        !self.reaped && self.status.is_none()
    }

    /// Asks the process to exit.
    fn terminate(&mut self) -> io::Result<()> {
        if self.terminate_sent.is_none() {
            self.terminate_sent = Some(Instant::now());
        }
        send_terminate(&mut self.child)
    }

    /// Kills a process that ignored termination for longer than `grace`.
    fn escalate(&mut self, grace: Duration) {
        let Some(since) = self.terminate_sent else { return };
        if self.killed || since.elapsed() < grace {
            return;
        }
        warn!(
            "Process {} did not exit within {}s of termination; killing it",
            self.child.id(),
            grace.as_secs_f64()
        );
        self.killed = true;
        if let Err(e) = self.child.kill() {
            warn!("Failed to kill process {}: {e}", self.child.id());
        }
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) -> io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let pid = i32::try_from(child.id())
        .map_err(|_| io::Error::other(format!("process id {} out of range", child.id())))?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) -> io::Result<()> {
    child.kill()
}

type SharedSlot = Arc<Mutex<Option<ChildSlot>>>;

fn lock(slot: &SharedSlot) -> MutexGuard<'_, Option<ChildSlot>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Requests termination of the supervised process from any thread.
#[derive(Clone)]
pub struct CancelHandle {
    slot: SharedSlot,
}

impl CancelHandle {
    /// Terminates the process if it is still running and marks the run as
    /// canceled. Returns whether a termination signal was sent; repeated
    /// calls, calls before start and calls after the process has exited do
    /// nothing.
    pub fn cancel(&self) -> bool {
        let mut guard = lock(&self.slot);
        let Some(slot) = guard.as_mut() else {
            return false;
        };
        if slot.reaped || slot.status.is_some() || slot.user_canceled {
            return false;
        }
        // Exit and cancel are exclusive: an exit that already happened wins.
        if let Ok(Some(status)) = slot.child.try_wait() {
            slot.status = Some(status);
            return false;
        }
        slot.user_canceled = true;
        if let Err(e) = slot.terminate() {
            warn!("Failed to terminate process {}: {e}", slot.child.id());
        } else {
            info!("Sent termination signal to process {}", slot.child.id());
        }
        true
    }
}

/// Owns one external process run.
pub struct ProcessSupervisor {
    options: SupervisorOptions,
    command: Option<ProcessCommand>,
    state: SupervisorState,
    slot: SharedSlot,
    receiver: Option<Receiver<Message>>,
    open_streams: usize,
    pending_exit: Option<(ExitInfo, Instant)>,
}

impl ProcessSupervisor {
    #[must_use]
    pub fn new(options: SupervisorOptions) -> Self {
        Self {
            options,
            command: None,
            state: SupervisorState::Unconfigured,
            slot: Arc::new(Mutex::new(None)),
            receiver: None,
            open_streams: 0,
            pending_exit: None,
        }
    }

    /// Stores the command to run. Only valid before `start`.
    pub fn configure(&mut self, command: ProcessCommand) -> CoreResult<()> {
        match self.state {
            SupervisorState::Unconfigured | SupervisorState::Configured => {
                self.command = Some(command);
                self.state = SupervisorState::Configured;
                Ok(())
            }
            _ => Err(CoreError::InvalidJobState(
                "process has already been started".to_string(),
            )),
        }
    }

    #[must_use]
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    #[must_use]
    pub fn command(&self) -> Option<&ProcessCommand> {
        self.command.as_ref()
    }

    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            slot: Arc::clone(&self.slot),
        }
    }

    /// See [`CancelHandle::cancel`].
    pub fn cancel(&self) -> bool {
        self.cancel_handle().cancel()
    }

    /// Spawns the configured process and starts the reader and waiter
    /// threads. Returns as soon as the spawn has been attempted.
    pub fn start(&mut self) -> CoreResult<()> {
        match self.state {
            SupervisorState::Configured => {}
            SupervisorState::Unconfigured => return Err(CoreError::NotConfigured),
            _ => {
                return Err(CoreError::InvalidJobState(
                    "process has already been started".to_string(),
                ));
            }
        }
        let Some(command) = self.command.as_mut() else {
            return Err(CoreError::NotConfigured);
        };

        let tool = command
            .program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| command.program.display().to_string());

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }
        let capture_stdout = match std::mem::take(&mut command.stdout) {
            OutputSink::Capture => {
                cmd.stdout(Stdio::piped());
                true
            }
            OutputSink::Redirect(file) => {
                cmd.stdout(Stdio::from(file));
                false
            }
        };

        debug!("Spawning: {}", command.joined());
        let mut child = cmd.spawn().map_err(|e| {
            error!("Failed to start {tool}: {e}");
            spawn_error(&tool, &command.program, e)
        })?;
        info!("Started {tool} (pid {})", child.id());

        let (sender, receiver) = mpsc::channel();
        self.open_streams = 0;
        if capture_stdout {
            if let Some(stdout) = child.stdout.take() {
                spawn_reader(stdout, OutputStream::Stdout, sender.clone());
                self.open_streams += 1;
            }
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(stderr, OutputStream::Stderr, sender.clone());
            self.open_streams += 1;
        }

        *lock(&self.slot) = Some(ChildSlot::new(child));
        spawn_waiter(Arc::clone(&self.slot), sender, self.options);

        self.receiver = Some(receiver);
        self.state = SupervisorState::Running;
        Ok(())
    }

    /// Waits up to `timeout` (forever with `None`) for the next line or the
    /// exit. Returns `None` on timeout and after the exit was delivered.
    pub fn next_event(&mut self, timeout: Option<Duration>) -> Option<SupervisorEvent> {
        if self.state != SupervisorState::Running {
            return None;
        }
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if let Some((exit, since)) = self.pending_exit {
                if self.open_streams == 0 || since.elapsed() >= OUTPUT_FLUSH_GRACE {
                    if self.open_streams > 0 {
                        warn!("Output streams still open after exit; dropping late output");
                    }
                    return Some(self.finish(exit));
                }
            }

            let now = Instant::now();
            let flush_deadline = self.pending_exit.map(|(_, since)| since + OUTPUT_FLUSH_GRACE);
            let wait_until = match (deadline, flush_deadline) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };

            let Some(receiver) = self.receiver.as_ref() else {
                return None;
            };
            let received = match wait_until {
                Some(until) => receiver.recv_timeout(until.saturating_duration_since(now)),
                None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(Message::Line(stream, text)) => {
                    return Some(SupervisorEvent::Line { stream, text });
                }
                Ok(Message::StreamClosed) => {
                    self.open_streams = self.open_streams.saturating_sub(1);
                }
                Ok(Message::Exited(exit)) => {
                    self.pending_exit = Some((exit, Instant::now()));
                }
                Err(RecvTimeoutError::Timeout) => {
                    let flush_due = self
                        .pending_exit
                        .is_some_and(|(_, since)| since.elapsed() >= OUTPUT_FLUSH_GRACE);
                    if !flush_due && deadline.is_some_and(|d| Instant::now() >= d) {
                        return None;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.open_streams = 0;
                    return match self.pending_exit {
                        Some((exit, _)) => Some(self.finish(exit)),
                        None => {
                            error!("Process monitor stopped without reporting an exit");
                            let exit = ExitInfo {
                                normal_exit: false,
                                exit_code: -1,
                                user_canceled: false,
                                timed_out: false,
                            };
                            Some(self.finish(exit))
                        }
                    };
                }
            }
        }
    }

    fn finish(&mut self, exit: ExitInfo) -> SupervisorEvent {
        self.pending_exit = None;
        self.receiver = None;
        self.state = SupervisorState::Exited;
        debug!(
            "Process finished: normal_exit={}, code={}, canceled={}, timed_out={}",
            exit.normal_exit, exit.exit_code, exit.user_canceled, exit.timed_out
        );
        SupervisorEvent::Exited(exit)
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        if self.state != SupervisorState::Running {
            return;
        }
        {
            let mut guard = lock(&self.slot);
            let Some(slot) = guard.as_mut() else { return };
            if !slot.is_live() {
                return;
            }
            warn!("Terminating process {} still running at shutdown", slot.child.id());
            let _ = slot.terminate();
        }

        // The waiter kills the process after one grace period; allow a
        // second one for the kill to land.
        let deadline = Instant::now() + self.options.termination_grace * 2;
        while Instant::now() < deadline {
            if lock(&self.slot).as_ref().is_none_or(|slot| slot.reaped) {
                return;
            }
            thread::sleep(self.options.poll_interval);
        }
        warn!("Process did not exit within the termination grace period");
    }
}

fn spawn_reader<R>(mut reader: R, stream: OutputStream, sender: Sender<Message>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = LineBuffer::new();
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    for line in buffer.push(&chunk[..n]) {
                        if sender.send(Message::Line(stream, line)).is_err() {
                            return;
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    debug!("Stopped reading {stream:?}: {e}");
                    break;
                }
            }
        }
        if let Some(tail) = buffer.finish() {
            let _ = sender.send(Message::Line(stream, tail));
        }
        let _ = sender.send(Message::StreamClosed);
    });
}

fn spawn_waiter(slot: SharedSlot, sender: Sender<Message>, options: SupervisorOptions) {
    thread::spawn(move || {
        let started = Instant::now();
        loop {
            {
                let mut guard = lock(&slot);
                let Some(child) = guard.as_mut() else { return };

                let status = match child.status {
                    Some(status) => Some(status),
                    None => match child.child.try_wait() {
                        Ok(status) => status,
                        Err(e) => {
                            error!("Failed to poll process {}: {e}", child.child.id());
                            None
                        }
                    },
                };

                if let Some(status) = status {
                    child.status = Some(status);
                    child.reaped = true;
                    let exit = ExitInfo::from_status(status, child.user_canceled, child.timed_out);
                    let _ = sender.send(Message::Exited(exit));
                    return;
                }

                if let Some(limit) = options.watchdog {
                    if !child.timed_out && !child.user_canceled && started.elapsed() >= limit {
                        warn!(
                            "Process {} exceeded the {}s watchdog; terminating",
                            child.child.id(),
                            limit.as_secs()
                        );
                        child.timed_out = true;
                        if let Err(e) = child.terminate() {
                            warn!("Failed to terminate process {}: {e}", child.child.id());
                        }
                    }
                }
                child.escalate(options.termination_grace);
            }
            thread::sleep(options.poll_interval);
        }
    });
}
