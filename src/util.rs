use std::time::Duration;

use crate::segment::Segment;

/// Formats the given time in seconds as "MM:SSs".
///
/// Negative and NaN times are shown as zero. Times too large for a [Duration] saturate.
pub fn format_time(seconds: f64) -> String {
    // `as` saturates at the bounds of u64 and maps NaN to zero.
    let t = Duration::from_secs(seconds.max(0.0) as u64);
    let minutes = t.as_secs() / 60;
    let seconds = t.as_secs() % 60;
    format!("{:02}:{:02}s", minutes, seconds)
}

/// Formats a segment as "MM:SSs-MM:SSs".
pub fn format_segment(segment: &Segment) -> String {
    format!(
        "{}-{}",
        format_time(segment.start),
        format_time(segment.end)
    )
}
