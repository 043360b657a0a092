//! Human-readable duration formatting
//!
//! Keeps delays, fade lengths and elapsed times consistent across log lines.

use std::time::Duration;

/// Format thresholds (milliseconds)
const MILLIS_FORMAT_MAX: u128 = 1_000; // < 1s → Xms
const SECONDS_FORMAT_MAX: u128 = 100_000; // < 100s → X.XXs
                                          // >= 100s → M:SS.Xs

/// Format a duration for log output.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use attract_common::human_time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(2000)), "2.00s");
/// assert_eq!(format_duration(Duration::from_millis(3500)), "3.50s");
/// assert_eq!(format_duration(Duration::from_secs(330)), "5:30.0s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();

    if millis < MILLIS_FORMAT_MAX {
        format!("{}ms", millis)
    } else if millis < SECONDS_FORMAT_MAX {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let minutes = duration.as_secs() / 60;
        let secs = duration.as_secs_f64() - (minutes * 60) as f64;
        format!("{}:{:04.1}s", minutes, secs)
    }
}
