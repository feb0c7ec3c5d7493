// ============================================================================
// discline-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Fluent Construction of CoreConfig
//
// The CLI layers command-line arguments and environment variables on top of
// an optional config file. The builder starts from either the defaults or a
// loaded file and overrides only what was given.

use std::path::PathBuf;

use super::{CoreConfig, ToolConfig};
use crate::error::CoreResult;

/// Builder for [`CoreConfig`].
///
/// ```rust
/// use discline_core::config::CoreConfigBuilder;
///
/// let config = CoreConfigBuilder::new()
///     .default_retries(32)
///     .watchdog_secs(Some(600))
///     .search_path("/opt/schily/bin")
///     .build()
///     .unwrap();
/// assert_eq!(config.default_retries, 32);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// Starts from the built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration, e.g. one loaded from a file.
    #[must_use]
    pub fn from_config(config: CoreConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn default_speed(mut self, speed: u32) -> Self {
        self.config.default_speed = speed;
        self
    }

    #[must_use]
    pub fn default_retries(mut self, retries: u32) -> Self {
        self.config.default_retries = retries;
        self
    }

    #[must_use]
    pub fn transfer_size(mut self, size: impl Into<String>) -> Self {
        self.config.transfer_size = size.into();
        self
    }

    #[must_use]
    pub fn watchdog_secs(mut self, secs: Option<u64>) -> Self {
        self.config.watchdog_secs = secs;
        self
    }

    #[must_use]
    pub fn termination_grace_secs(mut self, secs: u64) -> Self {
        self.config.termination_grace_secs = secs;
        self
    }

    #[must_use]
    pub fn search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.search_paths.push(dir.into());
        self
    }

    #[must_use]
    pub fn tool(mut self, tool: ToolConfig) -> Self {
        self.config.tools.push(tool);
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> CoreResult<CoreConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
