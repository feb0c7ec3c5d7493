// ============================================================================
// discline-core/src/jobs/mod.rs
// ============================================================================
//
// JOBS: Observable Runs of External Tools
//
// A job combines parameters, a tool located through a `ToolLocator`, one
// supervised process and the tool's output grammar into a single run with a
// monotonic state machine:
//
//   Idle -> Running -> Finished | Failed | Canceled
//
// Pre-spawn failures go from Idle straight to Failed. Once a terminal state
// is reached the job never changes again.

mod controller;
mod params;
mod readcd;

pub use controller::{JobController, JobOutcome};
pub use params::{ImageDestination, ReadParams, SectorRange};
pub use readcd::{READCD, readcd_arguments};

use std::fmt;
use std::time::Duration;

/// Why a job ended in [`JobState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    ToolNotFound,
    ToolFeatureUnsupported,
    Spawn,
    /// Normal exit with this nonzero code.
    NonZeroExit(i32),
    /// Killed by this signal.
    AbnormalExit(i32),
    /// Terminated by the watchdog after this long.
    TimedOut(Duration),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ToolNotFound => f.write_str("tool not found"),
            FailureReason::ToolFeatureUnsupported => f.write_str("required tool feature unavailable"),
            FailureReason::Spawn => f.write_str("process could not be started"),
            FailureReason::NonZeroExit(code) => write!(f, "exited with code {code}"),
            FailureReason::AbnormalExit(signal) => write!(f, "terminated abnormally (signal {signal})"),
            FailureReason::TimedOut(after) => write!(f, "timed out after {}s", after.as_secs()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Finished,
    Failed(FailureReason),
    Canceled,
}

impl JobState {
    /// Finished, Failed or Canceled.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Idle | JobState::Running)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, JobState::Finished)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Idle => f.write_str("idle"),
            JobState::Running => f.write_str("running"),
            JobState::Finished => f.write_str("finished"),
            JobState::Failed(reason) => write!(f, "failed: {reason}"),
            JobState::Canceled => f.write_str("canceled"),
        }
    }
}
