//! Minute:second:frame media positions.
//!
//! An [`MsfTime`] is a logical block address (LBA) viewed as a media time:
//! 75 frames make a second and 60 seconds make a minute. Values are immutable;
//! arithmetic returns new values and saturates at zero.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frames (sectors) per second of media time.
pub const FRAMES_PER_SECOND: u64 = 75;

/// Seconds per minute of media time.
pub const SECONDS_PER_MINUTE: u64 = 60;

/// Frames per minute of media time.
pub const FRAMES_PER_MINUTE: u64 = FRAMES_PER_SECOND * SECONDS_PER_MINUTE;

/// Error returned when a string is not a valid media position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseMsfError {
    #[error("empty position")]
    Empty,

    #[error("'{0}' is not a number")]
    InvalidNumber(String),

    #[error("seconds value {0} is out of range (0-59)")]
    SecondsOutOfRange(u64),

    #[error("frames value {0} is out of range (0-74)")]
    FramesOutOfRange(u64),

    #[error("'{0}' has too many components")]
    TooManyComponents(String),

    #[error("'{0}' is beyond the largest addressable position")]
    OutOfRange(String),
}

/// A position on the medium, stored as a logical block address.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MsfTime {
    lba: u64,
}

impl MsfTime {
    /// Position zero.
    pub const ZERO: MsfTime = MsfTime { lba: 0 };

    /// Creates a position from a logical block address.
    #[must_use]
    pub const fn from_lba(lba: u64) -> Self {
        Self { lba }
    }

    /// Creates a position from its minute, second and frame components.
    ///
    /// Seconds and frames are not range-checked here, so `from_msf(0, 61, 0)`
    /// is one minute and one second. Use [`str::parse`] for validated input.
    /// Saturates at the largest address; see [`MsfTime::checked_from_msf`].
    #[must_use]
    pub const fn from_msf(minutes: u64, seconds: u64, frames: u64) -> Self {
        Self {
            lba: minutes
                .saturating_mul(FRAMES_PER_MINUTE)
                .saturating_add(seconds.saturating_mul(FRAMES_PER_SECOND))
                .saturating_add(frames),
        }
    }

    /// Like [`MsfTime::from_msf`], but `None` when the address overflows.
    #[must_use]
    pub fn checked_from_msf(minutes: u64, seconds: u64, frames: u64) -> Option<Self> {
        let lba = minutes
            .checked_mul(FRAMES_PER_MINUTE)?
            .checked_add(seconds.checked_mul(FRAMES_PER_SECOND)?)?
            .checked_add(frames)?;
        Some(Self { lba })
    }

    /// The logical block address.
    #[must_use]
    pub const fn lba(self) -> u64 {
        self.lba
    }

    #[must_use]
    pub const fn minutes(self) -> u64 {
        self.lba / FRAMES_PER_MINUTE
    }

    #[must_use]
    pub const fn seconds(self) -> u64 {
        (self.lba % FRAMES_PER_MINUTE) / FRAMES_PER_SECOND
    }

    #[must_use]
    pub const fn frames(self) -> u64 {
        self.lba % FRAMES_PER_SECOND
    }

    /// Total length in whole seconds, frames truncated.
    #[must_use]
    pub const fn total_seconds(self) -> u64 {
        self.lba / FRAMES_PER_SECOND
    }

    /// Adds a number of frames.
    #[must_use]
    pub const fn add_frames(self, frames: u64) -> Self {
        Self {
            lba: self.lba.saturating_add(frames),
        }
    }

    /// Formats as `mm:ss` without the frame part.
    #[must_use]
    pub fn to_short_string(self) -> String {
        format!("{:02}:{:02}", self.minutes(), self.seconds())
    }
}

impl fmt::Display for MsfTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.minutes(),
            self.seconds(),
            self.frames()
        )
    }
}

impl From<u64> for MsfTime {
    fn from(lba: u64) -> Self {
        Self::from_lba(lba)
    }
}

impl Add for MsfTime {
    type Output = MsfTime;

    fn add(self, rhs: MsfTime) -> MsfTime {
        self.add_frames(rhs.lba)
    }
}

impl Sub for MsfTime {
    type Output = MsfTime;

    fn sub(self, rhs: MsfTime) -> MsfTime {
        MsfTime::from_lba(self.lba.saturating_sub(rhs.lba))
    }
}

fn parse_component(text: &str) -> Result<u64, ParseMsfError> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseMsfError::InvalidNumber(text.to_string()));
    }
    text.parse::<u64>()
        .map_err(|_| ParseMsfError::InvalidNumber(text.to_string()))
}

impl FromStr for MsfTime {
    type Err = ParseMsfError;

    /// Accepts `mm:ss:ff`, `mm:ss.ff`, `mm:ss` and a plain frame count.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseMsfError::Empty);
        }

        let Some((minutes, rest)) = s.split_once(':') else {
            return Ok(MsfTime::from_lba(parse_component(s)?));
        };

        let (seconds, frames) = match rest.split_once([':', '.']) {
            Some((seconds, frames)) => {
                if frames.contains([':', '.']) {
                    return Err(ParseMsfError::TooManyComponents(s.to_string()));
                }
                (seconds, Some(frames))
            }
            None => (rest, None),
        };

        let minutes = parse_component(minutes)?;
        let seconds = parse_component(seconds)?;
        if seconds >= SECONDS_PER_MINUTE {
            return Err(ParseMsfError::SecondsOutOfRange(seconds));
        }
        let frames = match frames {
            Some(frames) => parse_component(frames)?,
            None => 0,
        };
        if frames >= FRAMES_PER_SECOND {
            return Err(ParseMsfError::FramesOutOfRange(frames));
        }

        MsfTime::checked_from_msf(minutes, seconds, frames)
            .ok_or_else(|| ParseMsfError::OutOfRange(s.to_string()))
    }
}
