// ============================================================================
// discline-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error Types for the Discline Core Library
//
// Process and parsing problems are recovered into notice events by the job
// controller; only the failures listed here cross an API boundary.
//
// KEY COMPONENTS:
// - CoreError: crate-wide error enum, with CoreResult alias
// - TreeError: content tree mutation failures (tree left unchanged)
// - Helper constructors for the common process errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Could not find {0} executable")]
    ToolNotFound(String),

    #[error("Could not find {tool} executable with {feature} support")]
    ToolFeatureUnsupported { tool: String, feature: String },

    #[error("Failed to start {tool} ({}): {source}", path.display())]
    Spawn {
        tool: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Process supervisor is not configured")]
    NotConfigured,

    #[error("Invalid job state: {0}")]
    InvalidJobState(String),

    #[error("Invalid job parameters: {0}")]
    InvalidParameters(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Content tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Invalid media position: {0}")]
    Msf(#[from] crate::msf::ParseMsfError),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for discline operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors returned by content tree mutations.
///
/// Every mutation that fails with one of these leaves the tree exactly as it
/// was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("cannot move a directory into itself or one of its descendants")]
    Cycle,

    #[error("an item named '{0}' already exists in this directory")]
    DuplicateName(String),

    #[error("cannot replace '{0}' with an item it contains")]
    ReplacesAncestor(String),

    #[error("invalid item name '{0}'")]
    InvalidName(String),

    #[error("item is not a directory")]
    NotADirectory,

    #[error("unknown or stale item id")]
    UnknownItem,

    #[error("the root item cannot be moved or removed")]
    RootImmutable,

    #[error("item is not removable")]
    NotRemovable,
}

/// Creates a spawn error for a tool that failed to start.
pub fn spawn_error(tool: impl Into<String>, path: impl Into<PathBuf>, source: io::Error) -> CoreError {
    CoreError::Spawn {
        tool: tool.into(),
        path: path.into(),
        source,
    }
}

/// Creates the precondition error for a missing tool.
pub fn tool_not_found_error(tool: impl Into<String>) -> CoreError {
    CoreError::ToolNotFound(tool.into())
}
