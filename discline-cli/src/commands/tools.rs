//! Implementation of the 'tools' subcommand.
//!
//! Lists the configured and discovered installations of each supported
//! tool, default first.

use console::Term;
use discline_core::events::Severity;
use discline_core::external::ExternalProgram;
use discline_core::{CoreConfig, ToolRegistry};

use crate::cli::ToolsArgs;
use crate::error::CliResult;
use crate::terminal;

/// One display line per installation.
pub fn describe_program(program: &ExternalProgram) -> Vec<String> {
    program
        .bins()
        .iter()
        .enumerate()
        .map(|(index, bin)| {
            let features = if bin.features.is_empty() {
                "-".to_string()
            } else {
                bin.features.iter().cloned().collect::<Vec<_>>().join(", ")
            };
            let marker = if index == 0 { " (default)" } else { "" };
            format!(
                "{} {}{marker}  features: {features}",
                bin.path.display(),
                bin.version_string()
            )
        })
        .collect()
}

pub fn run_tools(args: ToolsArgs, config: &CoreConfig) -> CliResult<()> {
    let registry = ToolRegistry::from_config(config);
    let term = Term::stdout();

    let programs: Vec<&ExternalProgram> = registry
        .programs()
        .filter(|p| args.name.as_deref().is_none_or(|name| p.name == name))
        .collect();

    if programs.is_empty() {
        let what = args.name.as_deref().unwrap_or("supported tools");
        terminal::print_notice(
            &term,
            &format!("No installations of {what} found."),
            Severity::Warning,
        );
        return Ok(());
    }

    for program in programs {
        terminal::print_section(&term, &program.name);
        for line in describe_program(program) {
            let _ = term.write_line(&format!("  {line}"));
        }
    }
    Ok(())
}
