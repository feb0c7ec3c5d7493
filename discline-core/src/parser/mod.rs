// ============================================================================
// discline-core/src/parser/mod.rs
// ============================================================================
//
// OUTPUT PARSING: Tool Output Lines to Typed Events
//
// Each supported tool family has one grammar. The grammar is chosen when a
// job is configured and then fed every output line in production order.
// Parsing never fails: a line that does not fit the grammar, or whose
// numeric fields are malformed, comes back as `OutputEvent::Unrecognized`
// and leaves any progress state untouched.

mod readcd;

pub use readcd::ReadcdGrammar;

use serde::Serialize;

/// A single output line reduced to what it means for the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OutputEvent {
    /// The total number of blocks for the run became known or was revised.
    TotalBlocksAnnounced(u64),
    /// The tool reached this absolute block.
    PositionAdvanced(u64),
    /// The tool is retrying from this sector.
    RetryNotice(u64),
    /// A read error on `sector`, possibly corrected by the tool.
    SectorError { sector: u64, corrected: bool },
    /// The run is unlikely to succeed; the exit code still decides.
    FatalCondition(String),
    /// Anything else, passed through as raw diagnostic text.
    Unrecognized(String),
}

/// Output grammar of one tool family.
#[derive(Debug, Clone)]
pub enum OutputGrammar {
    Readcd(ReadcdGrammar),
    /// Every line is unrecognized; used for tools without a grammar.
    Passthrough,
}

impl OutputGrammar {
    /// Picks the grammar for a tool by its program name.
    #[must_use]
    pub fn for_tool(name: &str) -> Self {
        match name {
            "readcd" => OutputGrammar::Readcd(ReadcdGrammar::new()),
            _ => OutputGrammar::Passthrough,
        }
    }

    /// Classifies one line of output, without its line terminator.
    pub fn parse_line(&mut self, line: &str) -> OutputEvent {
        match self {
            OutputGrammar::Readcd(grammar) => grammar.parse_line(line),
            OutputGrammar::Passthrough => OutputEvent::Unrecognized(line.to_string()),
        }
    }

    /// Number of lines that looked like a known message but had malformed
    /// numeric fields.
    #[must_use]
    pub fn degraded_lines(&self) -> u64 {
        match self {
            OutputGrammar::Readcd(grammar) => grammar.degraded_lines(),
            OutputGrammar::Passthrough => 0,
        }
    }
}

/// Parses the run of ASCII digits at the start of `text`, after leading
/// whitespace. `None` when there are no digits or the value overflows.
pub(crate) fn leading_number(text: &str) -> Option<u64> {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    text[..end].parse().ok()
}
