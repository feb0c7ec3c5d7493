// ============================================================================
// discline-core/src/external/registry.rs
// ============================================================================
//
// TOOL REGISTRY: Locating External Tool Installations
//
// Jobs never look tools up through global state; they receive a
// `ToolLocator` and ask it for a tool, optionally with a required feature.
// `ToolRegistry` is the default locator, filled from configuration and from
// searching the configured directories and `PATH`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info, warn};

use super::program::{ExternalBin, ExternalProgram, FEATURE_CLONE};
use super::version::ToolVersion;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult, tool_not_found_error};

/// Tools this crate knows how to drive.
pub const KNOWN_TOOLS: &[&str] = &["readcd"];

/// Lookup of tool installations, passed into jobs.
pub trait ToolLocator: Send + Sync {
    /// All installations of `program`, default first.
    fn installations(&self, program: &str) -> Vec<ExternalBin>;

    /// The default installation of `program`.
    fn default_bin(&self, program: &str) -> Option<ExternalBin> {
        self.installations(program).into_iter().next()
    }
}

/// A located tool and whether it replaced the default installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedTool {
    pub bin: ExternalBin,
    pub substituted: bool,
}

/// Finds `program`, preferring the default installation and falling back to
/// any other installation that has `feature`.
pub fn locate_tool(
    locator: &dyn ToolLocator,
    program: &str,
    feature: Option<&str>,
) -> CoreResult<LocatedTool> {
    let installations = locator.installations(program);
    let Some(default) = installations.first() else {
        return Err(tool_not_found_error(program));
    };

    let Some(feature) = feature else {
        return Ok(LocatedTool {
            bin: default.clone(),
            substituted: false,
        });
    };
    if default.has_feature(feature) {
        return Ok(LocatedTool {
            bin: default.clone(),
            substituted: false,
        });
    }

    installations
        .iter()
        .skip(1)
        .find(|bin| bin.has_feature(feature))
        .map(|bin| LocatedTool {
            bin: bin.clone(),
            substituted: true,
        })
        .ok_or_else(|| CoreError::ToolFeatureUnsupported {
            tool: program.to_string(),
            feature: feature.to_string(),
        })
}

/// Features a tool version provides.
#[must_use]
pub fn features_for(program: &str, version: Option<&ToolVersion>) -> Vec<String> {
    let mut features = Vec::new();
    if program == "readcd" && version.is_some_and(|v| *v >= ToolVersion::new(2, 1)) {
        features.push(FEATURE_CLONE.to_string());
    }
    features
}

/// Runs `<path> -version` and extracts a version from its banner.
#[must_use]
pub fn probe_version(path: &Path) -> Option<ToolVersion> {
    let output = Command::new(path)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| debug!("Could not probe {}: {e}", path.display()))
        .ok()?;
    let mut banner = String::from_utf8_lossy(&output.stdout).into_owned();
    banner.push('\n');
    banner.push_str(&String::from_utf8_lossy(&output.stderr));
    let version = ToolVersion::find_in(&banner);
    if version.is_none() {
        warn!("No version found in output of {} -version", path.display());
    }
    version
}

/// In-memory set of tool installations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    programs: BTreeMap<String, ExternalProgram>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an installation. Returns false if its path was known.
    pub fn add(&mut self, bin: ExternalBin) -> bool {
        self.programs
            .entry(bin.name.clone())
            .or_insert_with(|| ExternalProgram::new(bin.name.clone()))
            .add(bin)
    }

    #[must_use]
    pub fn program(&self, name: &str) -> Option<&ExternalProgram> {
        self.programs.get(name)
    }

    pub fn programs(&self) -> impl Iterator<Item = &ExternalProgram> {
        self.programs.values()
    }

    /// Registers the installations listed in `config`, then searches the
    /// configured directories and `PATH` for every known tool.
    pub fn from_config(config: &CoreConfig) -> Self {
        let mut registry = Self::new();
        for tool in &config.tools {
            registry.add(tool.to_bin());
        }
        for name in KNOWN_TOOLS {
            registry.discover(name, &config.search_paths);
        }
        registry
    }

    /// Searches `search_paths` and then `PATH` for `program`, probing each
    /// new installation for its version. Returns how many were added.
    pub fn discover(&mut self, program: &str, search_paths: &[PathBuf]) -> usize {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if !search_paths.is_empty() {
            match std::env::join_paths(search_paths) {
                Ok(joined) => {
                    if let Ok(found) = which::which_in_all(program, Some(joined), ".") {
                        candidates.extend(found);
                    }
                }
                Err(e) => warn!("Ignoring unusable search path: {e}"),
            }
        }
        if let Ok(found) = which::which_all(program) {
            candidates.extend(found);
        }

        let mut added = 0;
        for path in candidates {
            let path = path.canonicalize().unwrap_or(path);
            if self
                .program(program)
                .is_some_and(|p| p.bins().iter().any(|b| b.path == path))
            {
                continue;
            }
            let version = probe_version(&path);
            let mut bin = ExternalBin::new(program, &path);
            bin.features.extend(features_for(program, version.as_ref()));
            bin.version = version;
            info!(
                "Found {program} {} at {}",
                bin.version_string(),
                path.display()
            );
            if self.add(bin) {
                added += 1;
            }
        }
        added
    }
}

impl ToolLocator for ToolRegistry {
    fn installations(&self, program: &str) -> Vec<ExternalBin> {
        self.program(program)
            .map(|p| p.bins().to_vec())
            .unwrap_or_default()
    }
}
