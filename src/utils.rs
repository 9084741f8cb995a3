/// Utility functions for labels and display formatting
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format.
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(format).unwrap_or_else(|_| dt.to_string())
}

/// Chart time label (HH.MM.SS) of an epoch millisecond instant at `offset`.
///
/// Returns None when the instant cannot be represented as a date.
pub fn format_time_label(epoch_ms: i64, offset: UtcOffset) -> Option<String> {
    // Shift into wall-clock time first so no offset conversion can overflow.
    let local_ms = epoch_ms as i128 + offset.whole_seconds() as i128 * 1000;
    let wall_clock = OffsetDateTime::from_unix_timestamp_nanos(local_ms * 1_000_000).ok()?;
    wall_clock
        .format(format_description!("[hour].[minute].[second]"))
        .ok()
}

/// Render an optional summary value with a fixed number of decimals,
/// or `--` when there is no data.
pub fn format_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}", decimals, v),
        _ => "--".to_string(),
    }
}

/// Convert a time::Duration to seconds as u64
pub fn duration_to_seconds(duration: time::Duration) -> u64 {
    duration.whole_seconds().max(0) as u64
}
