// discline-cli/src/lib.rs
//
// Library portion of the Discline CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands};
pub use commands::read::run_read;
pub use error::{CliErrorContext, CliResult};
