pub mod bench;
pub mod buffer;
pub mod config;
pub mod distance;
pub mod error;
pub mod geometry;
pub mod init;
pub mod workers;

pub use bench::{AccessMode, Totals, run_bench};
pub use buffer::ThreadBuffer;
pub use config::Config;
pub use distance::DistanceRegistry;
pub use error::DistgenError;
pub use geometry::Geometry;
pub use init::init_buffers;

use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time in seconds, microsecond resolution
pub fn wtime() -> f64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs() as f64 + 1e-6 * f64::from(now.subsec_micros())
}

/// Convert number of bytes to formatted string
pub fn format_size(bytes: u64) -> String {
    const TB: f64 = 1024.0 * 1024.0 * 1024.0 * 1024.0;
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const KB: f64 = 1024.0;

    let b = bytes as f64;
    if b >= TB {
        format!("{:.1} TiB", b / TB)
    } else if b >= GB {
        format!("{:.1} GiB", b / GB)
    } else if b >= MB {
        format!("{:.1} MiB", b / MB)
    } else if b >= KB {
        format!("{:.1} KiB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Parse a byte count with an optional binary `K`, `M` or `G` suffix
pub fn parse_size(s: &str) -> Result<u64, DistgenError> {
    let invalid = || DistgenError::InvalidSize(s.to_string());
    let trimmed = s.trim();
    let (digits, shift) = match trimmed.char_indices().last() {
        Some((i, 'k' | 'K')) => (&trimmed[..i], 10),
        Some((i, 'm' | 'M')) => (&trimmed[..i], 20),
        Some((i, 'g' | 'G')) => (&trimmed[..i], 30),
        _ => (trimmed, 0),
    };
    let value: u64 = digits.parse().map_err(|_| invalid())?;
    value.checked_mul(1u64 << shift).ok_or_else(invalid)
}
