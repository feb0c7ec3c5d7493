// ============================================================================
// discline-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Error types and utilities for the CLI
//
// Commands return the core library's error type; this module adds a result
// alias and context helpers so command code can say what it was doing when
// something failed.

use discline_core::{CoreError, CoreResult};

use std::fmt;

/// Result type for CLI commands.
pub type CliResult<T> = CoreResult<T>;

/// Adds context to errors and missing values in command code.
pub trait CliErrorContext<T> {
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display;

    /// Like [`CliErrorContext::cli_context`], building the context lazily.
    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C;
}

impl<T, E> CliErrorContext<T> for Result<T, E>
where
    E: Into<CoreError>,
{
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display,
    {
        self.map_err(|e| {
            let core_error: CoreError = e.into();
            CoreError::OperationFailed(format!("{context}: {core_error}"))
        })
    }

    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| {
            let core_error: CoreError = e.into();
            CoreError::OperationFailed(format!("{}: {core_error}", f()))
        })
    }
}

impl<T> CliErrorContext<T> for Option<T> {
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display,
    {
        self.ok_or_else(|| CoreError::OperationFailed(context.to_string()))
    }

    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| CoreError::OperationFailed(f().to_string()))
    }
}

/// Creates a CLI error with a formatted message.
#[macro_export]
macro_rules! cli_error {
    ($($arg:tt)*) => {
        ::discline_core::CoreError::OperationFailed(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use discline_core::TreeError;

    #[test]
    fn test_context_wraps_core_errors() {
        let result: Result<(), TreeError> = Err(TreeError::Cycle);
        let err = result.cli_context("Moving folder").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Operation failed: Moving folder: Content tree error: cannot move a directory into itself or one of its descendants"
        );
    }

    #[test]
    fn test_context_on_missing_values() {
        let missing: Option<u32> = None;
        let err = missing.cli_with_context(|| format!("No {} found", "readcd")).unwrap_err();
        assert!(matches!(err, CoreError::OperationFailed(msg) if msg == "No readcd found"));
        assert_eq!(Some(3).cli_context("unused").unwrap(), 3);
    }

    #[test]
    fn test_cli_error_macro() {
        let err = cli_error!("Read {}", "failed");
        assert_eq!(err.to_string(), "Operation failed: Read failed");
    }
}
