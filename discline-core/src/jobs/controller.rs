// ============================================================================
// discline-core/src/jobs/controller.rs
// ============================================================================
//
// JOB CONTROLLER: Drives One Read Run and Classifies Its Outcome
//
// The controller locates the tool, assembles the command line, starts the
// supervisor and then turns every output line into normalized job events.
// It observes and classifies; sector retries are left to the tool itself.
//
// All events of a run are emitted from the thread that calls `start`,
// `process_events` or `wait`, in production order. Other threads stop a run
// through a `CancelHandle`; the outcome still arrives through the event
// stream when the process has actually exited.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use super::params::{ImageDestination, ReadParams};
use super::readcd::{READCD, readcd_arguments};
use super::{FailureReason, JobState};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::events::{EventDispatcher, JobEvent, JobEventHandler, Severity};
use crate::external::{
    CancelHandle, ExitInfo, FEATURE_CLONE, OutputSink, ProcessCommand, ProcessSupervisor,
    SupervisorEvent, ToolLocator, locate_tool,
};
use crate::parser::{OutputEvent, OutputGrammar};
use crate::progress::ProgressTracker;

/// Summary of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOutcome {
    pub state: JobState,
    pub unreadable_blocks: u64,
}

/// Reads a medium into an image with `readcd`.
pub struct JobController {
    params: ReadParams,
    config: CoreConfig,
    locator: Arc<dyn ToolLocator>,
    dispatcher: EventDispatcher,
    supervisor: ProcessSupervisor,
    grammar: OutputGrammar,
    tracker: ProgressTracker,
    state: JobState,
    unreadable_blocks: u64,
}

impl JobController {
    pub fn new(params: ReadParams, config: CoreConfig, locator: Arc<dyn ToolLocator>) -> Self {
        let supervisor = ProcessSupervisor::new(config.supervisor_options());
        let tracker = ProgressTracker::new(params.block_offset());
        Self {
            params,
            config,
            locator,
            dispatcher: EventDispatcher::new(),
            supervisor,
            grammar: OutputGrammar::for_tool(READCD),
            tracker,
            state: JobState::Idle,
            unreadable_blocks: 0,
        }
    }

    /// Subscribes a handler to this job's events.
    pub fn add_handler(&mut self, handler: Arc<dyn JobEventHandler>) {
        self.dispatcher.add_handler(handler);
    }

    #[must_use]
    pub fn state(&self) -> JobState {
        self.state
    }

    #[must_use]
    pub fn params(&self) -> &ReadParams {
        &self.params
    }

    /// Sector errors reported by the tool so far.
    #[must_use]
    pub fn unreadable_blocks(&self) -> u64 {
        self.unreadable_blocks
    }

    /// Handle for canceling this job from another thread.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.supervisor.cancel_handle()
    }

    /// Requests termination of a running job. The outcome is reported
    /// through the event stream once the process has exited; calling this
    /// in any other state does nothing.
    pub fn cancel(&self) -> bool {
        if self.state != JobState::Running {
            debug!(target: "discline::job", "Ignoring cancel in state {}", self.state);
            return false;
        }
        self.supervisor.cancel()
    }

    /// Validates preconditions and spawns the tool.
    ///
    /// Returns once the spawn has been attempted. Parameter errors leave the
    /// job Idle without emitting anything. A missing tool, a missing
    /// feature or a failed spawn emit `started`, an error notice and
    /// `finished(false)`, move the job to Failed and are returned as errors.
    pub fn start(&mut self) -> CoreResult<()> {
        if self.state != JobState::Idle {
            return Err(CoreError::InvalidJobState(format!(
                "cannot start a job that is {}",
                self.state
            )));
        }
        self.params.validate()?;

        self.emit(JobEvent::Started);
        info!(target: "discline::job", "Starting read of {}", self.params.device);

        let feature = self.params.clone.then_some(FEATURE_CLONE);
        let located = match locate_tool(self.locator.as_ref(), READCD, feature) {
            Ok(located) => located,
            Err(e) => {
                let (text, reason) = match &e {
                    CoreError::ToolFeatureUnsupported { .. } => (
                        "Could not find readcd executable with cloning support.".to_string(),
                        FailureReason::ToolFeatureUnsupported,
                    ),
                    _ => (
                        format!("Could not find {READCD} executable."),
                        FailureReason::ToolNotFound,
                    ),
                };
                self.fail_before_spawn(text, reason);
                return Err(e);
            }
        };
        if located.substituted {
            self.notice(
                format!(
                    "Using readcd {} instead of default version for clone support.",
                    located.bin.version_string()
                ),
                Severity::Info,
            );
        }

        let args = readcd_arguments(&self.params, &located.bin, &self.config.transfer_size);
        let sink = match &self.params.destination {
            ImageDestination::Path(path) => {
                let text = format!("Writing image to {}.", path.display());
                self.emit(JobEvent::NewTask {
                    description: text.clone(),
                });
                self.notice(text, Severity::Info);
                OutputSink::Capture
            }
            ImageDestination::Pipe(file) => match file.try_clone() {
                Ok(file) => OutputSink::Redirect(file),
                Err(e) => {
                    self.fail_before_spawn(
                        format!("Could not open the image destination: {e}"),
                        FailureReason::Spawn,
                    );
                    return Err(CoreError::Io(e));
                }
            },
        };

        let command = ProcessCommand::new(&located.bin.path)
            .args(args)
            .output_sink(sink);
        self.emit(JobEvent::DebuggingOutput {
            tag: "readcd command:".to_string(),
            line: command.joined(),
        });

        self.supervisor.configure(command)?;
        if let Err(e) = self.supervisor.start() {
            self.fail_before_spawn(format!("Could not start {READCD}: {e}"), FailureReason::Spawn);
            return Err(e);
        }

        self.state = JobState::Running;
        Ok(())
    }

    /// Dispatches output that arrives within `timeout` (blocking without
    /// one), then everything already queued. Returns whether the job is
    /// still running.
    pub fn process_events(&mut self, timeout: Option<Duration>) -> bool {
        if self.state != JobState::Running {
            return false;
        }
        let mut next = self.supervisor.next_event(timeout);
        while let Some(event) = next {
            match event {
                SupervisorEvent::Line { text, .. } => self.handle_line(&text),
                SupervisorEvent::Exited(exit) => {
                    self.handle_exit(exit);
                    return false;
                }
            }
            next = self.supervisor.next_event(Some(Duration::ZERO));
        }
        self.state == JobState::Running
    }

    /// Blocks until the run is over and returns its outcome.
    pub fn wait(&mut self) -> JobOutcome {
        while self.process_events(None) {}
        self.outcome()
    }

    #[must_use]
    pub fn outcome(&self) -> JobOutcome {
        JobOutcome {
            state: self.state,
            unreadable_blocks: self.unreadable_blocks,
        }
    }

    fn emit(&self, event: JobEvent) {
        self.dispatcher.emit(event);
    }

    fn notice(&self, text: impl Into<String>, severity: Severity) {
        self.emit(JobEvent::info(text, severity));
    }

    fn fail_before_spawn(&mut self, text: String, reason: FailureReason) {
        error!(target: "discline::job", "{text}");
        self.notice(text, Severity::Error);
        self.state = JobState::Failed(reason);
        self.emit(JobEvent::Finished { success: false });
    }

    fn handle_line(&mut self, line: &str) {
        self.emit(JobEvent::DebuggingOutput {
            tag: READCD.to_string(),
            line: line.to_string(),
        });

        match self.grammar.parse_line(line) {
            OutputEvent::TotalBlocksAnnounced(total) => self.tracker.set_total(total),
            OutputEvent::PositionAdvanced(block) => {
                let sample = self.tracker.advance(block);
                if let Some(value) = sample.percent {
                    self.emit(JobEvent::Percent { value });
                }
                if let Some((current_kib, total_kib)) = sample.processed_kib {
                    self.emit(JobEvent::ProcessedSize {
                        current_kib,
                        total_kib,
                    });
                }
            }
            OutputEvent::FatalCondition(text) => {
                warn!(target: "discline::job", "{text}");
                self.notice(text, Severity::Error);
            }
            OutputEvent::RetryNotice(sector) => {
                self.notice(format!("Retrying from sector {sector}."), Severity::Info);
            }
            OutputEvent::SectorError { sector, corrected } => {
                self.unreadable_blocks += 1;
                let text = if corrected {
                    format!("Corrected error in sector {sector}")
                } else {
                    format!("Uncorrected error in sector {sector}")
                };
                self.notice(text, Severity::Error);
            }
            OutputEvent::Unrecognized(text) => debug!("(readcd) {text}"),
        }
    }

    fn handle_exit(&mut self, exit: ExitInfo) {
        if self.unreadable_blocks > 0 {
            self.notice(
                format!("{} unreadable blocks reported.", self.unreadable_blocks),
                Severity::Warning,
            );
        }

        if exit.user_canceled {
            info!(target: "discline::job", "Read canceled");
            self.state = JobState::Canceled;
            self.emit(JobEvent::Canceled);
            self.emit(JobEvent::Finished { success: false });
            return;
        }

        if exit.timed_out {
            let limit = self.config.supervisor_options().watchdog.unwrap_or_default();
            self.notice(
                format!("Readcd did not finish within {}s and was terminated.", limit.as_secs()),
                Severity::Error,
            );
            self.state = JobState::Failed(FailureReason::TimedOut(limit));
        } else if exit.normal_exit && exit.exit_code == 0 {
            self.state = JobState::Finished;
        } else if exit.normal_exit {
            self.notice(format!("Readcd returned error: {}", exit.exit_code), Severity::Error);
            self.state = JobState::Failed(FailureReason::NonZeroExit(exit.exit_code));
        } else {
            self.notice("Readcd exited abnormally.", Severity::Error);
            self.state = JobState::Failed(FailureReason::AbnormalExit(exit.exit_code));
        }

        info!(target: "discline::job", "Read {}", self.state);
        self.emit(JobEvent::Finished {
            success: self.state.is_success(),
        });
    }
}
