// ============================================================================
// discline-cli/src/terminal.rs
// ============================================================================
//
// TERMINAL OUTPUT: UI Components and Styling
//
// Sections, status lines and notices for the CLI, plus the event handler
// that renders a running job: a progress bar driven by percent events with
// the processed size as its message, and notices printed above it.
//
// Everything goes through one `console::Term` so that a read writing its
// image to stdout can move the display to stderr.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use console::{Term, style};
use discline_core::events::{JobEvent, JobEventHandler, Severity};
use discline_core::format_kib;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Styling constants for terminal output
pub mod styling {
    pub const SUCCESS_SYMBOL: &str = "✓";
    pub const PROCESSING_SYMBOL: &str = "»";
    pub const WARNING_SYMBOL: &str = "!";
    pub const ERROR_SYMBOL: &str = "✗";

    pub const STATUS_INDENT: &str = "  ";
    pub const LABEL_WIDTH: usize = 18;

    pub const PROGRESS_TEMPLATE: &str =
        "  Reading: {percent:>3}% [{bar:30}] ({elapsed}) {msg}";
    pub const PROGRESS_CHARS: &str = "##.";
}

/// Writes a line, ignoring a closed terminal.
fn write_line(term: &Term, line: &str) {
    let _ = term.write_line(line);
}

/// Print a section header for a major step
pub fn print_section(term: &Term, title: &str) {
    write_line(term, "");
    write_line(
        term,
        &format!("===== {} =====", style(title.to_uppercase()).cyan().bold()),
    );
    write_line(term, "");
}

/// Print a status line (key-value pair)
pub fn print_status(term: &Term, label: &str, value: &str, highlight: bool) {
    let label = format!("{label}:");
    let value = if highlight {
        style(value).bold().to_string()
    } else {
        value.to_string()
    };
    write_line(
        term,
        &format!(
            "{}{label:<width$} {value}",
            styling::STATUS_INDENT,
            width = styling::LABEL_WIDTH
        ),
    );
}

/// Styled one-line rendering of a notice.
pub fn format_notice(text: &str, severity: Severity) -> String {
    let indent = styling::STATUS_INDENT;
    match severity {
        Severity::Info => format!("{indent}{text}"),
        Severity::Success => format!("{indent}{} {text}", style(styling::SUCCESS_SYMBOL).green()),
        Severity::Warning => format!(
            "{indent}{} {}",
            style(styling::WARNING_SYMBOL).yellow().bold(),
            style(text).yellow()
        ),
        Severity::Error => format!(
            "{indent}{} {}",
            style(styling::ERROR_SYMBOL).red().bold(),
            style(text).red()
        ),
    }
}

/// Print a notice with severity styling
pub fn print_notice(term: &Term, text: &str, severity: Severity) {
    write_line(term, &format_notice(text, severity));
}

#[derive(Default)]
struct DisplayState {
    progress_bar: Option<ProgressBar>,
    max_percent: u64,
    size: Option<String>,
}

/// Renders job events on a terminal.
pub struct TerminalEventHandler {
    term: Term,
    verbose: bool,
    state: Mutex<DisplayState>,
}

impl TerminalEventHandler {
    pub fn new(term: Term, verbose: bool) -> Self {
        Self {
            term,
            verbose,
            state: Mutex::new(DisplayState::default()),
        }
    }

    fn progress_bar(&self, state: &mut DisplayState) -> ProgressBar {
        state
            .progress_bar
            .get_or_insert_with(|| {
                let pb = ProgressBar::with_draw_target(
                    Some(100),
                    ProgressDrawTarget::term(self.term.clone(), 10),
                );
                let bar_style = ProgressStyle::default_bar()
                    .template(styling::PROGRESS_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars(styling::PROGRESS_CHARS);
                pb.set_style(bar_style);
                pb.enable_steady_tick(Duration::from_millis(200));
                pb
            })
            .clone()
    }

    /// Prints a line, above the progress bar while one is shown.
    fn println(&self, state: &DisplayState, line: &str) {
        match &state.progress_bar {
            Some(pb) => pb.suspend(|| write_line(&self.term, line)),
            None => write_line(&self.term, line),
        }
    }

    fn finish_progress(&self, state: &mut DisplayState) {
        if let Some(pb) = state.progress_bar.take() {
            pb.finish();
        }
        if let Some(size) = state.size.take() {
            print_status(&self.term, "Processed", &size, false);
        }
    }
}

impl JobEventHandler for TerminalEventHandler {
    fn handle(&self, event: &JobEvent) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        match event {
            JobEvent::Started => {
                *state = DisplayState::default();
                print_section(&self.term, "Read");
            }

            JobEvent::NewTask { description } => {
                let line = format!("{} {}", styling::PROCESSING_SYMBOL, style(description).bold());
                self.println(&state, &line);
            }

            JobEvent::InfoMessage { text, severity } => {
                self.println(&state, &format_notice(text, *severity));
            }

            JobEvent::Percent { value } => {
                let pos = u64::from(*value);
                let pb = self.progress_bar(&mut state);
                // Positions only move forward on screen.
                if pos >= state.max_percent {
                    state.max_percent = pos;
                    pb.set_position(pos);
                }
            }

            JobEvent::ProcessedSize {
                current_kib,
                total_kib,
            } => {
                let size = if *total_kib > 0 {
                    format!("{} / {}", format_kib(*current_kib), format_kib(*total_kib))
                } else {
                    format_kib(*current_kib)
                };
                let pb = self.progress_bar(&mut state);
                pb.set_message(size.clone());
                state.size = Some(size);
            }

            JobEvent::Canceled => {
                self.finish_progress(&mut state);
                print_notice(&self.term, "Read canceled", Severity::Warning);
            }

            JobEvent::Finished { success } => {
                self.finish_progress(&mut state);
                if *success {
                    print_notice(&self.term, "Read finished", Severity::Success);
                } else {
                    print_notice(&self.term, "Read did not complete", Severity::Error);
                }
            }

            JobEvent::DebuggingOutput { tag, line } => {
                if self.verbose {
                    let text = format!("{}{tag} {line}", styling::STATUS_INDENT);
                    self.println(&state, &style(text).dim().to_string());
                }
            }
        }
    }
}
