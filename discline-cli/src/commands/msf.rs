//! Implementation of the 'msf' subcommand.

use discline_core::MsfTime;
use discline_core::utils::format_block_duration;

use crate::cli::MsfArgs;
use crate::error::{CliErrorContext, CliResult};

/// Converts a position to the other notation: `mm:ss:ff` input yields a
/// frame count and a frame count yields `mm:ss:ff`.
pub fn convert(value: &str) -> CliResult<String> {
    let time: MsfTime = value
        .parse()
        .cli_with_context(|| format!("Cannot convert '{}'", value.trim()))?;
    if value.contains(':') {
        Ok(time.lba().to_string())
    } else {
        Ok(time.to_string())
    }
}

pub fn run_msf(args: MsfArgs) -> CliResult<()> {
    let converted = convert(&args.value)?;
    println!("{converted}");
    if let Ok(time) = args.value.parse::<MsfTime>() {
        log::debug!("Playing time {}", format_block_duration(time.lba()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_both_ways() {
        assert_eq!(convert("4500").unwrap(), "01:00:00");
        assert_eq!(convert("01:00:00").unwrap(), "4500");
        assert_eq!(convert("00:02.10").unwrap(), "160");
        assert_eq!(convert("79:59:74").unwrap(), "359999");
    }

    #[test]
    fn test_convert_rejects_garbage() {
        assert!(convert("1:75:00").is_err());
        assert!(convert("abc").is_err());
        assert!(convert("").is_err());
    }
}
