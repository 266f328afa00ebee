//! Formatting and clock helpers shared across modules.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Formats a duration in microseconds as `µs`, `ms` or `s`, whichever reads best.
#[inline]
pub fn format_us(us: u64) -> String {
    if us < 1000 {
        format!("{us} µs")
    } else if us < 1_000_000 {
        format!("{:.1} ms", us as f64 / 1000.0)
    } else {
        format!("{:.3} s", us as f64 / 1_000_000.0)
    }
}

/// Formats a `std::time::Duration` into a human-readable string using `humantime`.
#[inline]
pub fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

/// Seconds since the UNIX epoch; the default seed.
pub fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_us_picks_unit() {
        assert_eq!(format_us(999), "999 µs");
        assert_eq!(format_us(1_500), "1.5 ms");
        assert_eq!(format_us(2_000_000), "2.000 s");
    }
}
