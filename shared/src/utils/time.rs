//! Time-related utilities

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Current wall-clock time as a UTC timestamp
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Nanoseconds elapsed since `anchor`, saturating at `u64::MAX`
pub fn elapsed_nanos(anchor: Instant) -> u64 {
    duration_nanos(anchor.elapsed())
}

/// Convert a duration to whole nanoseconds, saturating at `u64::MAX`
pub fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_utc_is_recent() {
        assert!(now_utc().timestamp() > 1_600_000_000); // After 2020
    }

    #[test]
    fn test_elapsed_is_monotonic() {
        let anchor = Instant::now();
        let first = elapsed_nanos(anchor);
        let second = elapsed_nanos(anchor);
        assert!(second >= first);
    }

    #[test]
    fn test_duration_nanos() {
        assert_eq!(duration_nanos(Duration::from_millis(3)), 3_000_000);
    }
}
