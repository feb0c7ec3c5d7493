// ============================================================================
// discline-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Installations, Discovery and Process Supervision
//
// This module encapsulates everything that touches external command-line
// tools: describing installations, finding them, and running one process at
// a time with captured output and cancellation.
//
// KEY COMPONENTS:
// - ExternalBin / ExternalProgram: installation descriptors
// - ToolLocator trait and ToolRegistry: lookup passed into jobs
// - ProcessSupervisor: spawn, line capture, cancel, exit reporting
// - ToolVersion: tool version parsing and ordering

mod line_buffer;
pub mod program;
pub mod registry;
pub mod supervisor;
pub mod version;

pub use program::{ExternalBin, ExternalProgram, FEATURE_CLONE};
pub use registry::{KNOWN_TOOLS, LocatedTool, ToolLocator, ToolRegistry, locate_tool};
pub use supervisor::{
    CancelHandle, ExitInfo, OutputSink, OutputStream, ProcessCommand, ProcessSupervisor,
    SupervisorEvent, SupervisorOptions, SupervisorState,
};
pub use version::{ToolVersion, VersionParseError};
