//! Grammar for `readcd` progress and error output.
//!
//! The lines of interest look like:
//!
//! ```text
//! end:    333000
//! addr:     6000 cnt: 64
//! Retrying from sector 1234.
//! Error on sector 1234 not corrected.
//! Cannot read source disk
//! ```

use log::warn;

use super::{OutputEvent, leading_number};

/// Stateful `readcd` line classifier.
#[derive(Debug, Clone, Default)]
pub struct ReadcdGrammar {
    degraded: u64,
}

impl ReadcdGrammar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines so far that matched a known prefix but carried a bad number.
    #[must_use]
    pub fn degraded_lines(&self) -> u64 {
        self.degraded
    }

    pub fn parse_line(&mut self, line: &str) -> OutputEvent {
        if let Some(rest) = line.strip_prefix("end:") {
            return match rest.trim().parse::<u64>() {
                Ok(total) => OutputEvent::TotalBlocksAnnounced(total),
                Err(_) => self.degrade("block total", rest.trim(), line),
            };
        }

        if let Some(rest) = line.strip_prefix("addr:") {
            let field = rest.find("cnt").map_or(rest, |pos| &rest[..pos]).trim();
            return match field.parse::<u64>() {
                Ok(block) => OutputEvent::PositionAdvanced(block),
                Err(_) => self.degrade("current block", field, line),
            };
        }

        if line.contains("Cannot read source disk") {
            return OutputEvent::FatalCondition("Cannot read source disk.".to_string());
        }

        if let Some(pos) = line.find("Retrying from sector") {
            let rest = &line[pos + "Retrying from sector".len()..];
            return match leading_number(rest) {
                Some(sector) => OutputEvent::RetryNotice(sector),
                None => self.degrade("retry sector", rest.trim(), line),
            };
        }

        if let Some(pos) = line.find("Error on sector") {
            let rest = &line[pos + "Error on sector".len()..];
            return match leading_number(rest) {
                Some(sector) => OutputEvent::SectorError {
                    sector,
                    corrected: !line.contains("not corrected"),
                },
                None => self.degrade("error sector", rest.trim(), line),
            };
        }

        OutputEvent::Unrecognized(line.to_string())
    }

    fn degrade(&mut self, field: &str, text: &str, line: &str) -> OutputEvent {
        self.degraded += 1;
        warn!("readcd: could not parse {field} from '{text}'");
        OutputEvent::Unrecognized(line.to_string())
    }
}
