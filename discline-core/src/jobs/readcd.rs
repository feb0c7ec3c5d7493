//! `readcd` command line assembly.

use super::params::{ImageDestination, ReadParams};
use crate::external::ExternalBin;

/// Program name of the reader tool.
pub const READCD: &str = "readcd";

/// Builds the argument list for one `readcd` run.
///
/// `readcd` stops one sector before the end of its `sectors=` range, so the
/// exclusive end of the job's range is passed as is.
#[must_use]
pub fn readcd_arguments(params: &ReadParams, bin: &ExternalBin, transfer_size: &str) -> Vec<String> {
    let mut args = vec!["-v".to_string(), format!("dev={}", params.device)];

    if params.speed > 0 {
        args.push(format!("speed={}", params.speed));
    }

    match &params.destination {
        ImageDestination::Pipe(_) => args.push("f=-".to_string()),
        ImageDestination::Path(path) => args.push(format!("f={}", path.display())),
    }

    if params.no_error {
        args.push("-noerror".to_string());
    }
    if params.clone {
        args.push("-clone".to_string());
        // Only valid together with clone mode.
        if params.no_correction {
            args.push("-nocorr".to_string());
        }
    }
    if params.c2_scan {
        args.push("-c2scan".to_string());
    }

    args.push(format!("retries={}", params.retries));

    if let Some(range) = params.sector_range.filter(|r| !r.is_empty()) {
        args.push(format!("sectors={}-{}", range.start.lba(), range.end.lba()));
    }

    args.push(format!("ts={transfer_size}"));
    args.extend(bin.user_parameters.iter().cloned());
    args
}
