//! Human-readable playback clock formatting
//!
//! Used for log lines and the demo status output. Positions are shown the way
//! a player transport shows them:
//! - `M:SS` below one hour
//! - `H:MM:SS` from one hour up

const SECS_PER_HOUR: u64 = 3600;

/// Format a position or duration in seconds as a transport clock.
///
/// Negative and non-finite input renders as `--:--` (unknown duration).
///
/// # Examples
///
/// ```
/// use chipdeck_common::human_time::format_clock;
///
/// assert_eq!(format_clock(0.0), "0:00");
/// assert_eq!(format_clock(42.7), "0:42");
/// assert_eq!(format_clock(330.0), "5:30");
/// assert_eq!(format_clock(3661.0), "1:01:01");
/// assert_eq!(format_clock(f64::NAN), "--:--");
/// ```
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "--:--".to_string();
    }

    let total = seconds.floor() as u64;
    let hours = total / SECS_PER_HOUR;
    let mins = (total % SECS_PER_HOUR) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Format a `position / duration` pair, e.g. `1:05 / 3:20`.
///
/// A zero duration is treated as unknown.
pub fn format_progress(position: f64, duration: f64) -> String {
    let duration_str = if duration > 0.0 {
        format_clock(duration)
    } else {
        "--:--".to_string()
    };
    format!("{} / {}", format_clock(position), duration_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_format() {
        assert_eq!(format_clock(59.99), "0:59");
        assert_eq!(format_clock(60.0), "1:00");
        assert_eq!(format_clock(3599.0), "59:59");
    }

    #[test]
    fn test_hours_format() {
        assert_eq!(format_clock(3600.0), "1:00:00");
        assert_eq!(format_clock(36_000.0 + 62.0), "10:01:02");
    }

    #[test]
    fn test_unknown_values() {
        assert_eq!(format_clock(-1.0), "--:--");
        assert_eq!(format_clock(f64::INFINITY), "--:--");
    }

    #[test]
    fn test_progress_with_unknown_duration() {
        assert_eq!(format_progress(65.0, 200.0), "1:05 / 3:20");
        assert_eq!(format_progress(12.0, 0.0), "0:12 / --:--");
    }
}
