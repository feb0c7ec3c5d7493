//! Implementation of the 'read' subcommand.
//!
//! Maps arguments onto read parameters, wires the event handlers and runs
//! the job to completion.

use std::fs::File;
use std::sync::Arc;
use std::time::Instant;

use console::Term;
use discline_core::events::JsonEventHandler;
use discline_core::file_logging::LoggingEventHandler;
use discline_core::utils::format_duration_secs;
use discline_core::{
    CoreConfig, CoreConfigBuilder, CoreError, ImageDestination, JobController, ReadParams,
    SectorRange, ToolRegistry,
};
use log::{debug, info};

use crate::cli::ReadArgs;
use crate::error::{CliErrorContext, CliResult};
use crate::terminal;

/// Applies per-run overrides on top of the loaded configuration.
fn create_core_config(args: &ReadArgs, config: CoreConfig) -> CliResult<CoreConfig> {
    let mut builder = CoreConfigBuilder::from_config(config);
    if args.watchdog.is_some() {
        builder = builder.watchdog_secs(args.watchdog);
    }
    builder.build()
}

/// Duplicates this process's stdout so the tool can write the image to it.
#[cfg(unix)]
fn stdout_file() -> CliResult<File> {
    use std::os::fd::AsFd;
    let fd = std::io::stdout()
        .as_fd()
        .try_clone_to_owned()
        .cli_context("Failed to duplicate standard output")?;
    Ok(File::from(fd))
}

#[cfg(not(unix))]
fn stdout_file() -> CliResult<File> {
    Err(crate::cli_error!("Writing the image to standard output is not supported on this platform"))
}

/// Builds the job parameters from the arguments and configuration defaults.
pub fn create_read_params(args: &ReadArgs, config: &CoreConfig) -> CliResult<ReadParams> {
    let destination = match &args.output {
        Some(path) if !args.stdout => ImageDestination::Path(path.clone()),
        _ => ImageDestination::Pipe(stdout_file()?),
    };

    let mut params = ReadParams::from_config(config, args.device.clone(), destination);
    if let Some(speed) = args.speed {
        params.speed = speed;
    }
    if let Some(retries) = args.retries {
        params.retries = retries;
    }
    params.clone = args.clone;
    params.no_correction = args.no_correction;
    params.c2_scan = args.c2_scan;
    params.no_error = args.no_error;

    if let (Some(first), Some(last)) = (args.first_sector, args.last_sector) {
        let range = SectorRange::inclusive(first, last)
            .cli_with_context(|| format!("Invalid sector range {first} - {last}"))?;
        params.sector_range = Some(range);
    }

    params.validate()?;
    Ok(params)
}

/// Runs a read job and reports its outcome.
pub fn run_read(args: ReadArgs, config: CoreConfig, verbose: bool, file_logging: bool) -> CliResult<()> {
    let start_time = Instant::now();
    let config = create_core_config(&args, config)?;
    let params = create_read_params(&args, &config)?;

    // The image itself may own stdout.
    let term = if args.stdout {
        Term::stderr()
    } else {
        Term::stdout()
    };

    debug!("Run started: {}", crate::logging::get_timestamp());
    let registry = ToolRegistry::from_config(&config);
    let mut job = JobController::new(params, config, Arc::new(registry));

    if args.json {
        job.add_handler(Arc::new(JsonEventHandler::new().include_debug(verbose)));
    } else {
        job.add_handler(Arc::new(terminal::TerminalEventHandler::new(term.clone(), verbose)));
    }
    if file_logging {
        job.add_handler(Arc::new(LoggingEventHandler::new()));
    }

    // Precondition failures have already been reported as events.
    job.start().cli_context("Read failed")?;
    let outcome = job.wait();

    if !args.json {
        terminal::print_status(
            &term,
            "Unreadable blocks",
            &outcome.unreadable_blocks.to_string(),
            outcome.unreadable_blocks > 0,
        );
        terminal::print_status(
            &term,
            "Total time",
            &format_duration_secs(start_time.elapsed().as_secs()),
            false,
        );
    }
    info!("Read {} after {:.1}s", outcome.state, start_time.elapsed().as_secs_f64());

    if outcome.state.is_success() {
        Ok(())
    } else {
        Err(CoreError::OperationFailed(format!("Read {}", outcome.state)))
    }
}
