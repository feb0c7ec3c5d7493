// discline-cli/src/main.rs
//
// Entry point of the `discline` command.
//
// Responsibilities include:
// - Parsing user-provided arguments.
// - Loading the configuration file, if any.
// - Setting up console or file logging.
// - Dispatching to the subcommand and mapping its result to an exit code.

use std::process;

use clap::Parser;
use console::style;
use discline_cli::commands::{msf, read, tools, tree};
use discline_cli::error::{CliErrorContext, CliResult};
use discline_cli::logging;
use discline_cli::{Cli, Commands};
use discline_core::CoreConfig;
use log::{debug, info};

fn load_config(cli: &Cli) -> CliResult<CoreConfig> {
    match &cli.config {
        Some(path) => CoreConfig::load(path)
            .cli_with_context(|| format!("Invalid configuration file '{}'", path.display())),
        None => Ok(CoreConfig::default()),
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let file_logging = match &cli.log_dir {
        Some(log_dir) => {
            let log_file = logging::init_file_logging(log_dir, cli.command.name(), cli.verbose)?;
            info!("Discline {} started at {}", cli.command.name(), logging::get_timestamp());
            debug!("Logging to {}", log_file.display());
            true
        }
        None => {
            logging::init_console_logging(cli.verbose);
            false
        }
    };

    let config = load_config(&cli)?;
    debug!("Configuration: {config:?}");

    match cli.command {
        Commands::Read(args) => read::run_read(args, config, cli.verbose, file_logging),
        Commands::Tree(args) => tree::run_tree(args),
        Commands::Tools(args) => tools::run_tools(args, &config),
        Commands::Msf(args) => msf::run_msf(args),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {e}", style("Error:").for_stderr().red().bold());
        process::exit(1);
    }
}
