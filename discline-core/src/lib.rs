//! Core library for supervising optical-media tools and composing data
//! projects.
//!
//! This crate launches external reading tools such as `readcd`, turns their
//! textual output into structured job events, and maintains a content tree
//! whose sizes and counts stay consistent under every mutation.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use discline_core::{CoreConfig, ImageDestination, JobController, ReadParams, ToolRegistry};
//! use discline_core::events::RecordingHandler;
//!
//! let config = CoreConfig::default();
//! let registry = ToolRegistry::from_config(&config);
//! let params = ReadParams::from_config(
//!     &config,
//!     "/dev/sr0",
//!     ImageDestination::Path("/tmp/disc.iso".into()),
//! );
//!
//! let events = Arc::new(RecordingHandler::new());
//! let mut job = JobController::new(params, config, Arc::new(registry));
//! job.add_handler(events.clone());
//! job.start().unwrap();
//! let outcome = job.wait();
//! println!("{} ({} unreadable blocks)", outcome.state, outcome.unreadable_blocks);
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod events;
pub mod external;
pub mod file_logging;
pub mod jobs;
pub mod msf;
pub mod parser;
pub mod progress;
pub mod utils;

// Re-exports for public API
pub use config::{CoreConfig, CoreConfigBuilder};
pub use content::{ContentItem, ContentTree, DirectoryItem, FileItem, InsertMode, ItemId, ItemSource};
pub use error::{CoreError, CoreResult, TreeError};
pub use events::{EventDispatcher, JobEvent, JobEventHandler, Severity};
pub use external::{ExternalBin, ProcessSupervisor, ToolLocator, ToolRegistry};
pub use jobs::{FailureReason, ImageDestination, JobController, JobOutcome, JobState, ReadParams, SectorRange};
pub use msf::MsfTime;
pub use parser::{OutputEvent, OutputGrammar};
pub use progress::{ProgressSample, ProgressTracker};
pub use utils::{format_bytes, format_kib};
