use log::LevelFilter;
use log4rs::{
    append::{console::ConsoleAppender, file::FileAppender},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};
use std::path::{Path, PathBuf};
use anyhow::Result;
use chrono::Local;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {m}{n}";

/// Builds a log4rs configuration writing everything at `log_level` to
/// `log_file`, and warnings and errors to stderr.
pub fn build_config(log_file: &Path, log_level: LevelFilter) -> Result<Config> {
    // Create log directory if it doesn't exist
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build(log_file)?;

    let console_appender = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("[{l}] {m}{n}")))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Warn)))
                .build("console", Box::new(console_appender)),
        )
        .build(
            Root::builder()
                .appender("file")
                .appender("console")
                .build(log_level),
        )?;

    Ok(config)
}

/// Installs file logging as the global logger.
pub fn setup_file_logging(log_file: &Path, log_level: LevelFilter) -> Result<()> {
    let config = build_config(log_file, log_level)?;
    log4rs::init_config(config)?;
    Ok(())
}

/// Log file path for one command run: `<dir>/discline_<command>_YYYYMMDD_HHMMSS.log`.
pub fn log_file_path(log_dir: &Path, command: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    log_dir.join(format!("discline_{command}_{timestamp}.log"))
}
