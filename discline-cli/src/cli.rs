// discline-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use discline_core::MsfTime;
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Discline: optical media tools",
    long_about = "Reads media into images with readcd and sizes data projects via discline-core."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional: TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE", env = "DISCLINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Optional: Directory for log files; enables file logging
    #[arg(short, long, global = true, value_name = "LOG_DIR", env = "DISCLINE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Show debug logging and raw tool output
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reads a medium into an image file
    Read(ReadArgs),
    /// Builds a content tree from local paths and prints its totals
    Tree(TreeArgs),
    /// Lists installations of the supported tools
    Tools(ToolsArgs),
    /// Converts between sector numbers and mm:ss:ff positions
    Msf(MsfArgs),
}

impl Commands {
    /// Short name used in log file names.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Read(_) => "read",
            Commands::Tree(_) => "tree",
            Commands::Tools(_) => "tools",
            Commands::Msf(_) => "msf",
        }
    }
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Device to read from (e.g. /dev/sr0)
    #[arg(short, long, value_name = "DEVICE", env = "DISCLINE_DEVICE")]
    pub device: String,

    /// Image file to write
    #[arg(
        short,
        long,
        value_name = "IMAGE",
        required_unless_present = "stdout",
        conflicts_with = "stdout"
    )]
    pub output: Option<PathBuf>,

    /// Write the image to standard output
    #[arg(long, conflicts_with = "json")]
    pub stdout: bool,

    /// Optional: Read speed (0 lets the drive choose)
    #[arg(long, value_name = "SPEED")]
    pub speed: Option<u32>,

    /// Optional: Retries per unreadable sector
    #[arg(long, value_name = "COUNT", value_parser = clap::value_parser!(u32).range(1..))]
    pub retries: Option<u32>,

    /// Read raw sectors including subchannel data
    #[arg(long)]
    pub clone: bool,

    /// Disable error correction (clone mode only)
    #[arg(long, requires = "clone")]
    pub no_correction: bool,

    /// Scan for C2 errors
    #[arg(long)]
    pub c2_scan: bool,

    /// Keep reading after unrecoverable errors
    #[arg(long)]
    pub no_error: bool,

    /// Optional: First sector to read (frames or mm:ss:ff)
    #[arg(long, value_name = "MSF", requires = "last_sector")]
    pub first_sector: Option<MsfTime>,

    /// Optional: Last sector to read, inclusive (frames or mm:ss:ff)
    #[arg(long, value_name = "MSF", requires = "first_sector")]
    pub last_sector: Option<MsfTime>,

    /// Optional: Terminate the tool after this many seconds
    #[arg(long, value_name = "SECONDS", env = "DISCLINE_WATCHDOG")]
    pub watchdog: Option<u64>,

    /// Print job events as JSON lines instead of the terminal display
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Files and directories to add to the tree root
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Name of the root directory
    #[arg(long, default_value = "disc", value_name = "NAME")]
    pub name: String,

    /// Print every entry in traversal order
    #[arg(long)]
    pub list: bool,

    /// Print the totals as JSON
    #[arg(long, conflicts_with = "list")]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Only show this tool
    #[arg(value_name = "NAME")]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct MsfArgs {
    /// A frame count (e.g. 4500) or a position (e.g. 01:00:00)
    #[arg(value_name = "VALUE")]
    pub value: String,
}
