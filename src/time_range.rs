//! Open-ended time interval checks.

use chrono::{DateTime, Utc};

/// Whether `value` lies strictly between `min` and `max`.
///
/// An unset bound leaves that side of the interval open; with both bounds
/// unset every value is in range. Bounds are exclusive: a value equal to
/// `min` or `max` is out of range.
pub fn is_in_time_range(
    min: Option<DateTime<Utc>>,
    max: Option<DateTime<Utc>>,
    value: DateTime<Utc>,
) -> bool {
    match (min, max) {
        (None, None) => true,
        (None, Some(max)) => value < max,
        (Some(min), None) => value > min,
        (Some(min), Some(max)) => value > min && value < max,
    }
}
