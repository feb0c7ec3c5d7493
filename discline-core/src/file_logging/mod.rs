pub mod setup;

pub use setup::{log_file_path, setup_file_logging};

use crate::events::{JobEvent, JobEventHandler, Severity};
use log::{debug, error, info, warn};
use std::sync::Mutex;

/// Mirrors job events into the log, so a log file tells the whole story of
/// a run.
pub struct LoggingEventHandler {
    last_logged_percent: Mutex<Option<u8>>,
}

impl Default for LoggingEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingEventHandler {
    pub fn new() -> Self {
        Self {
            last_logged_percent: Mutex::new(None),
        }
    }

    fn reset_progress_state(&self) {
        if let Ok(mut last) = self.last_logged_percent.lock() {
            *last = None;
        }
    }
}

impl JobEventHandler for LoggingEventHandler {
    fn handle(&self, event: &JobEvent) {
        match event {
            JobEvent::Started => {
                self.reset_progress_state();
                info!("Job started");
            }

            JobEvent::NewTask { description } => {
                info!("{description}");
            }

            JobEvent::InfoMessage { text, severity } => match severity {
                Severity::Info | Severity::Success => info!("{text}"),
                Severity::Warning => warn!("{text}"),
                Severity::Error => error!("{text}"),
            },

            JobEvent::Percent { value } => {
                // 10% milestones only, plus completion
                if let Ok(mut last) = self.last_logged_percent.lock() {
                    let due = match *last {
                        None => true,
                        Some(prev) => *value >= prev.saturating_add(10) || (*value == 100 && prev < 100),
                    };
                    if due {
                        info!("Progress: {value}%");
                        *last = Some(*value);
                    }
                }
            }

            JobEvent::ProcessedSize { .. } => {}

            JobEvent::Canceled => {
                warn!("Job canceled by user");
            }

            JobEvent::Finished { success } => {
                if *success {
                    info!("Job finished successfully");
                } else {
                    warn!("Job finished with errors");
                }
            }

            JobEvent::DebuggingOutput { tag, line } => {
                debug!("{tag} {line}");
            }
        }
    }
}
