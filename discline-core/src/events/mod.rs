//! Job events and their consumers.
//!
//! A job run emits a stream of [`JobEvent`]s through an [`EventDispatcher`]
//! to every registered [`JobEventHandler`]. `Finished` is always the last
//! event of a run.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

pub mod json_handler;

pub use json_handler::JsonEventHandler;

/// Importance of an [`JobEvent::InfoMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    Started,
    NewTask {
        description: String,
    },
    InfoMessage {
        text: String,
        severity: Severity,
    },
    Percent {
        value: u8,
    },
    ProcessedSize {
        current_kib: u64,
        total_kib: u64,
    },
    Canceled,
    Finished {
        success: bool,
    },
    /// Raw tool output, outside the normalized stream.
    DebuggingOutput {
        tag: String,
        line: String,
    },
}

impl JobEvent {
    pub fn info(text: impl Into<String>, severity: Severity) -> Self {
        JobEvent::InfoMessage {
            text: text.into(),
            severity,
        }
    }
}

pub trait JobEventHandler: Send + Sync {
    fn handle(&self, event: &JobEvent);
}

pub struct EventDispatcher {
    handlers: Vec<Arc<dyn JobEventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn JobEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn emit(&self, event: JobEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps every event in memory.
#[derive(Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<JobEvent>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    pub fn events(&self) -> Vec<JobEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events without the raw debugging output.
    pub fn normalized(&self) -> Vec<JobEvent> {
        self.events()
            .into_iter()
            .filter(|e| !matches!(e, JobEvent::DebuggingOutput { .. }))
            .collect()
    }
}

impl JobEventHandler for RecordingHandler {
    fn handle(&self, event: &JobEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
