//! Utility functions for formatting sizes and media lengths.
//!
//! Shared by the CLI's output and by log messages in the core library.

use crate::msf::{FRAMES_PER_SECOND, MsfTime};

/// Formats bytes with appropriate binary units (B, KiB, MiB, GiB).
#[must_use] pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let bytes_f64 = bytes as f64;
    if bytes_f64 >= GIB {
        format!("{:.2} GiB", bytes_f64 / GIB)
    } else if bytes_f64 >= MIB {
        format!("{:.2} MiB", bytes_f64 / MIB)
    } else if bytes_f64 >= KIB {
        format!("{:.2} KiB", bytes_f64 / KIB)
    } else {
        format!("{bytes} B")
    }
}

/// Formats a KiB count the way [`format_bytes`] formats bytes.
#[must_use] pub fn format_kib(kib: u64) -> String {
    format_bytes(kib.saturating_mul(1024))
}

/// Formats seconds as HH:MM:SS (e.g., 3725 -> "01:02:05").
#[must_use] pub fn format_duration_secs(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Playing time of `blocks` sectors, as HH:MM:SS.
#[must_use] pub fn format_block_duration(blocks: u64) -> String {
    format_duration_secs(MsfTime::from_lba(blocks).total_seconds())
}

/// Number of whole sectors needed for `bytes` of data in 2048-byte sectors.
#[must_use] pub fn sectors_for_bytes(bytes: u64) -> u64 {
    bytes.div_ceil(2048)
}

/// Seconds of media time covered by `frames`, with fractional frames.
#[must_use] pub fn frames_to_seconds(frames: u64) -> f64 {
    frames as f64 / FRAMES_PER_SECOND as f64
}
