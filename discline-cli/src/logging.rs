// ============================================================================
// discline-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: Console and File Logging for the CLI
//
// Without a log directory the CLI logs through `env_logger`: errors only by
// default, debug with --verbose, and RUST_LOG overrides both. With a log
// directory, discline-core's log4rs setup writes a timestamped file per run
// and still shows warnings on the console.

use std::path::{Path, PathBuf};

use discline_core::file_logging::{log_file_path, setup_file_logging};
use log::LevelFilter;

use crate::error::{CliErrorContext, CliResult};

/// Level for console-only runs.
pub fn console_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Error
    }
}

/// Initializes `env_logger`, letting RUST_LOG take precedence.
pub fn init_console_logging(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(console_level(verbose));
    builder.parse_default_env();
    builder.format_timestamp(None);
    // A logger may already be installed when running inside tests.
    let _ = builder.try_init();
}

/// Installs file logging for one `command` run and returns the log file.
pub fn init_file_logging(log_dir: &Path, command: &str, verbose: bool) -> CliResult<PathBuf> {
    let log_file = log_file_path(log_dir, command);
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    setup_file_logging(&log_file, level)
        .map_err(|e| discline_core::CoreError::Config(e.to_string()))
        .cli_with_context(|| format!("Failed to set up logging in {}", log_dir.display()))?;
    Ok(log_file)
}

/// Returns the current local timestamp formatted for run headers.
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
