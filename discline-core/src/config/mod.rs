//! Configuration structures and constants for the discline-core library.
//!
//! This module holds the defaults that read jobs fall back to, the timing of
//! process supervision, and the list of configured tool installations. A
//! configuration can be built in code (see [`CoreConfigBuilder`]) or loaded
//! from a TOML file where every key is optional:
//!
//! ```toml
//! default_retries = 64
//! watchdog_secs = 3600
//! search_paths = ["/opt/schily/bin"]
//!
//! [[tools]]
//! name = "readcd"
//! path = "/opt/schily/bin/readcd"
//! version = "3.02a09"
//! features = ["clone"]
//! user_parameters = ["-overhead"]
//! ```

mod builder;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

pub use builder::CoreConfigBuilder;

use crate::error::{CoreError, CoreResult};
use crate::external::{ExternalBin, SupervisorOptions, ToolVersion};

// Default constants

/// Read speed passed to tools; 0 lets the drive choose.
pub const DEFAULT_SPEED: u32 = 0;

/// Sector retries requested from the tool.
pub const DEFAULT_RETRIES: u32 = 128;

/// Transfer size argument for `readcd` (`ts=`). Smaller values fail on some
/// kernels.
pub const DEFAULT_TRANSFER_SIZE: &str = "128k";

/// How long a terminated tool may take to exit before it is killed.
pub const DEFAULT_TERMINATION_GRACE_SECS: u64 = 5;

/// How often the supervisor polls the process for exit.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// One configured tool installation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub name: String,
    pub path: PathBuf,
    pub version: Option<ToolVersion>,
    pub features: Vec<String>,
    pub user_parameters: Vec<String>,
}

impl ToolConfig {
    /// The installation this entry describes.
    #[must_use]
    pub fn to_bin(&self) -> ExternalBin {
        let mut bin = ExternalBin::new(&self.name, &self.path)
            .with_user_parameters(self.user_parameters.iter().cloned());
        bin.version = self.version.clone();
        bin.features.extend(self.features.iter().cloned());
        bin
    }
}

/// Main configuration structure for the discline-core library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Read speed used when a job does not set one (0 = drive default)
    pub default_speed: u32,

    /// Retry count used when a job does not set one
    pub default_retries: u32,

    /// Transfer size argument passed to `readcd`
    pub transfer_size: String,

    /// Kill a tool that runs longer than this many seconds
    pub watchdog_secs: Option<u64>,

    /// Seconds a terminated process gets to exit before it is killed
    pub termination_grace_secs: u64,

    /// Exit polling interval in milliseconds
    pub poll_interval_ms: u64,

    /// Extra directories searched for tools, before `PATH`
    pub search_paths: Vec<PathBuf>,

    /// Explicitly configured installations; these take precedence over
    /// discovered ones
    pub tools: Vec<ToolConfig>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            default_speed: DEFAULT_SPEED,
            default_retries: DEFAULT_RETRIES,
            transfer_size: DEFAULT_TRANSFER_SIZE.to_string(),
            watchdog_secs: None,
            termination_grace_secs: DEFAULT_TERMINATION_GRACE_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            search_paths: Vec::new(),
            tools: Vec::new(),
        }
    }
}

impl CoreConfig {
    /// Loads a TOML configuration file. Missing keys take their defaults.
    pub fn load(path: &Path) -> CoreResult<Self> {
        debug!("Loading configuration from {}", path.display());
        let text = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: CoreConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> CoreResult<()> {
        if self.default_retries == 0 {
            return Err(CoreError::Config(
                "default_retries must be at least 1".to_string(),
            ));
        }
        if self.transfer_size.trim().is_empty() {
            return Err(CoreError::Config("transfer_size must not be empty".to_string()));
        }
        if self.termination_grace_secs == 0 {
            return Err(CoreError::Config(
                "termination_grace_secs must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(CoreError::Config(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.watchdog_secs == Some(0) {
            return Err(CoreError::Config(
                "watchdog_secs must be at least 1 when set".to_string(),
            ));
        }
        for tool in &self.tools {
            if tool.name.trim().is_empty() || tool.path.as_os_str().is_empty() {
                return Err(CoreError::Config(
                    "every [[tools]] entry needs a name and a path".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Supervisor timing derived from this configuration.
    #[must_use]
    pub fn supervisor_options(&self) -> SupervisorOptions {
        SupervisorOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            termination_grace: Duration::from_secs(self.termination_grace_secs),
            watchdog: self.watchdog_secs.map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_retries, 128);
        assert_eq!(config.transfer_size, "128k");
        assert_eq!(config.supervisor_options().watchdog, None);
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config: CoreConfig = toml::from_str(
            r#"
            default_retries = 16
            watchdog_secs = 90

            [[tools]]
            name = "readcd"
            path = "/opt/schily/bin/readcd"
            version = "3.02a09"
            features = ["clone"]
            "#,
        )
        .unwrap();
        assert_eq!(config.default_retries, 16);
        assert_eq!(config.default_speed, 0);
        assert_eq!(
            config.supervisor_options().watchdog,
            Some(Duration::from_secs(90))
        );

        let bin = config.tools[0].to_bin();
        assert!(bin.has_feature("clone"));
        assert_eq!(bin.version_string(), "3.02a09");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = CoreConfig {
            default_retries: 0,
            ..CoreConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        let config = CoreConfig {
            transfer_size: "  ".to_string(),
            ..CoreConfig::default()
        };
        assert!(config.validate().is_err());

        let config = CoreConfig {
            tools: vec![ToolConfig {
                name: "readcd".to_string(),
                ..ToolConfig::default()
            }],
            ..CoreConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("discline.toml");
        fs::write(&path, "default_retries = \"many\"").unwrap();
        assert!(matches!(CoreConfig::load(&path), Err(CoreError::ConfigParse(_))));

        fs::write(&path, "default_speed = 8").unwrap();
        assert_eq!(CoreConfig::load(&path).unwrap().default_speed, 8);

        assert!(matches!(
            CoreConfig::load(&dir.path().join("missing.toml")),
            Err(CoreError::Config(_))
        ));
    }
}
