//! Tool version numbers such as `2.01`, `2.01a12` or `3.02a09`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{0}' is not a version number")]
pub struct VersionParseError(pub String);

/// `major.minor[.patch][suffix]`.
///
/// Versions order by their numbers; for equal numbers a pre-release suffix
/// (`a12`) sorts before the plain release, and suffixes compare as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
    pub suffix: String,
}

impl ToolVersion {
    #[must_use]
    pub fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            patch: None,
            suffix: String::new(),
        }
    }

    /// Finds the first version-looking token in free-form text, like the
    /// banner a tool prints for `-version`.
    #[must_use]
    pub fn find_in(text: &str) -> Option<Self> {
        text.split(|c: char| c.is_whitespace() || c == ',' || c == '(' || c == ')')
            .filter(|token| token.starts_with(|c: char| c.is_ascii_digit()) && token.contains('.'))
            .find_map(|token| token.parse().ok())
    }
}

impl Ord for ToolVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch.unwrap_or(0))
            .cmp(&(other.major, other.minor, other.patch.unwrap_or(0)))
            .then_with(|| match (self.suffix.is_empty(), other.suffix.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.suffix.cmp(&other.suffix),
            })
    }
}

impl PartialOrd for ToolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)?;
        if let Some(patch) = self.patch {
            write!(f, ".{patch:02}")?;
        }
        f.write_str(&self.suffix)
    }
}

fn split_number(text: &str) -> (&str, &str) {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    text.split_at(end)
}

impl FromStr for ToolVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || VersionParseError(s.to_string());
        let text = s.trim();

        let (major, rest) = split_number(text);
        let major = major.parse().map_err(|_| err())?;
        let rest = rest.strip_prefix('.').ok_or_else(err)?;

        let (minor, mut rest) = split_number(rest);
        let minor = minor.parse().map_err(|_| err())?;

        let mut patch = None;
        if let Some(after_dot) = rest.strip_prefix('.') {
            let (digits, tail) = split_number(after_dot);
            if !digits.is_empty() {
                patch = Some(digits.parse().map_err(|_| err())?);
                rest = tail;
            }
        }

        if rest.contains(char::is_whitespace) {
            return Err(err());
        }

        Ok(Self {
            major,
            minor,
            patch,
            suffix: rest.to_string(),
        })
    }
}

impl Serialize for ToolVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ToolVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
