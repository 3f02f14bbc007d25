// ABOUTME: Utilities for working with times and timestamps.
// ABOUTME: Provides sortable UTC timestamps, epoch millis and monotonic timers.
use ::time::{format_description::BorrowedFormatItem, macros::format_description, OffsetDateTime};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Fixed-width UTC layout; equal-width strings keep lexicographic order equal to time order.
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z");

/// Format a SystemTime as a fixed-width RFC3339 UTC timestamp with microseconds
///
/// # Examples
///
/// ```
/// use fg_core::to_timestamp;
/// use std::time::{Duration, UNIX_EPOCH};
///
/// let time = UNIX_EPOCH + Duration::from_secs(1_609_459_200); // 2021-01-01
/// assert_eq!(to_timestamp(time), "2021-01-01T00:00:00.000000Z");
/// ```
pub fn to_timestamp(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(TIMESTAMP_FORMAT)
        .unwrap_or_default()
}

/// Current time as a sortable timestamp string
///
/// # Examples
///
/// ```
/// use fg_core::now_iso8601;
/// let timestamp = now_iso8601();
/// assert_eq!(timestamp.len(), 27);
/// assert!(timestamp.ends_with('Z'));
/// ```
pub fn now_iso8601() -> String {
    to_timestamp(SystemTime::now())
}

/// Milliseconds since the Unix epoch
pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Create a monotonic duration measurer
///
/// # Examples
///
/// ```
/// use fg_core::MonotonicTimer;
/// use std::thread;
/// use std::time::Duration;
///
/// let timer = MonotonicTimer::new();
/// thread::sleep(Duration::from_millis(1));
/// assert!(timer.elapsed() >= Duration::from_millis(1));
/// ```
pub struct MonotonicTimer {
    start: Instant,
}

impl MonotonicTimer {
    /// Create a new timer starting now
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time since creation
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed time in whole milliseconds, for log fields
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }
}

impl Default for MonotonicTimer {
    fn default() -> Self {
        Self::new()
    }
}
