//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// Reads a medium into an image with `readcd`.
pub mod read;

pub mod msf;
pub mod tools;
pub mod tree;
