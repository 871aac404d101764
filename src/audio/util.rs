use crate::segment::TimeRange;

/// Number of differing bits between two fingerprint points.
#[inline]
pub fn hamming_distance(a: u32, b: u32) -> u32 {
    u32::count_ones(a ^ b)
}

/// Returns true if two fingerprint points differ by at most `maximum_differences` bits.
#[inline]
pub fn points_match(a: u32, b: u32, maximum_differences: u32) -> bool {
    hamming_distance(a, b) <= maximum_differences
}

/// Finds the longest run of `times` in which consecutive entries are at most `maximum_skip`
/// seconds apart.
///
/// The last run is only closed once a gap larger than `maximum_skip` follows it, so callers
/// that want it considered must terminate `times` with `f64::INFINITY`. Ties go to the earliest
/// run. Returns `None` if no run was closed.
pub fn find_contiguous(times: &[f64], maximum_skip: f64) -> Option<TimeRange> {
    let mut times = times.to_vec();
    times.sort_by(f64::total_cmp);

    let first = *times.first()?;
    let mut current = TimeRange::new(first, first);
    let mut best: Option<TimeRange> = None;

    for pair in times.windows(2) {
        let (time, next) = (pair[0], pair[1]);
        if next - time <= maximum_skip {
            current.end = next;
            continue;
        }

        if best.map_or(true, |b| current.duration() > b.duration()) {
            best = Some(current);
        }
        current = TimeRange::new(next, next);
    }

    best
}
