//! Descriptors for installed external tools.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;

use super::version::ToolVersion;

/// Feature tag of `readcd` builds that can read in clone mode.
pub const FEATURE_CLONE: &str = "clone";

/// One installation of an external tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalBin {
    /// Program name, e.g. `readcd`.
    pub name: String,
    pub path: PathBuf,
    pub version: Option<ToolVersion>,
    pub features: BTreeSet<String>,
    /// Extra arguments appended to every command line for this installation.
    pub user_parameters: Vec<String>,
}

impl ExternalBin {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            version: None,
            features: BTreeSet::new(),
            user_parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: ToolVersion) -> Self {
        self.version = Some(version);
        self
    }

    #[must_use]
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.insert(feature.into());
        self
    }

    #[must_use]
    pub fn with_user_parameters<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_parameters.extend(params.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    /// Version for display, `unknown` when it could not be determined.
    #[must_use]
    pub fn version_string(&self) -> String {
        self.version
            .as_ref()
            .map_or_else(|| "unknown".to_string(), ToString::to_string)
    }
}

/// All known installations of one tool. The first one is the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalProgram {
    pub name: String,
    bins: Vec<ExternalBin>,
}

impl ExternalProgram {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bins: Vec::new(),
        }
    }

    /// Adds an installation unless one with the same path is already known.
    pub fn add(&mut self, bin: ExternalBin) -> bool {
        if self.bins.iter().any(|b| b.path == bin.path) {
            return false;
        }
        self.bins.push(bin);
        true
    }

    #[must_use]
    pub fn default_bin(&self) -> Option<&ExternalBin> {
        self.bins.first()
    }

    #[must_use]
    pub fn bins(&self) -> &[ExternalBin] {
        &self.bins
    }

    /// First installation providing `feature`, in registration order.
    #[must_use]
    pub fn bin_with_feature(&self, feature: &str) -> Option<&ExternalBin> {
        self.bins.iter().find(|b| b.has_feature(feature))
    }
}
