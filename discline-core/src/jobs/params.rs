//! Parameters of a read job.

use std::fs::File;
use std::path::PathBuf;

use crate::config::{CoreConfig, DEFAULT_RETRIES, DEFAULT_SPEED};
use crate::error::{CoreError, CoreResult};
use crate::msf::MsfTime;

/// Where the read image goes.
#[derive(Debug)]
pub enum ImageDestination {
    /// The tool writes the image file itself.
    Path(PathBuf),
    /// The tool writes to its stdout, which is connected to this file or
    /// pipe.
    Pipe(File),
}

/// Half-open block range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorRange {
    pub start: MsfTime,
    pub end: MsfTime,
}

impl SectorRange {
    /// Creates `[start, end)`; `end` must not precede `start`.
    pub fn new(start: MsfTime, end: MsfTime) -> CoreResult<Self> {
        if end < start {
            return Err(CoreError::InvalidParameters(format!(
                "sector range ends ({end}) before it starts ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Creates the range covering `first` through `last`, both included.
    pub fn inclusive(first: MsfTime, last: MsfTime) -> CoreResult<Self> {
        Self::new(first, last.add_frames(1))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Number of blocks in the range.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end.lba().saturating_sub(self.start.lba())
    }
}

/// Everything a read job needs besides its collaborators.
#[derive(Debug)]
pub struct ReadParams {
    /// Device identifier passed to the tool, e.g. `/dev/sr0`.
    pub device: String,
    pub destination: ImageDestination,
    /// Read speed; 0 leaves the choice to the drive.
    pub speed: u32,
    /// Disable error correction (clone mode only).
    pub no_correction: bool,
    /// Read raw sectors including subchannel data.
    pub clone: bool,
    pub c2_scan: bool,
    /// Keep reading after unrecoverable errors.
    pub no_error: bool,
    pub retries: u32,
    /// Read only this range instead of the whole medium.
    pub sector_range: Option<SectorRange>,
}

impl ReadParams {
    pub fn new(device: impl Into<String>, destination: ImageDestination) -> Self {
        Self {
            device: device.into(),
            destination,
            speed: DEFAULT_SPEED,
            no_correction: false,
            clone: false,
            c2_scan: false,
            no_error: false,
            retries: DEFAULT_RETRIES,
            sector_range: None,
        }
    }

    /// Like [`ReadParams::new`] with speed and retries taken from `config`.
    pub fn from_config(
        config: &CoreConfig,
        device: impl Into<String>,
        destination: ImageDestination,
    ) -> Self {
        Self {
            speed: config.default_speed,
            retries: config.default_retries,
            ..Self::new(device, destination)
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.device.trim().is_empty() {
            return Err(CoreError::InvalidParameters("no device given".to_string()));
        }
        if let ImageDestination::Path(path) = &self.destination {
            if path.as_os_str().is_empty() {
                return Err(CoreError::InvalidParameters(
                    "empty image path".to_string(),
                ));
            }
        }
        if self.retries == 0 {
            return Err(CoreError::InvalidParameters(
                "retry count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// First block of the requested range, 0 for the whole medium.
    #[must_use]
    pub fn block_offset(&self) -> u64 {
        self.sector_range
            .filter(|r| !r.is_empty())
            .map_or(0, |r| r.start.lba())
    }
}
