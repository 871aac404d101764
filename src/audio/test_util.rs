// Synthetic fingerprints for tests.
//
// Population markers live in the top 12 bits and are 8 bits apart from each other, so points
// from different populations never match under a small tolerance.

pub(crate) const MARKER_A: u32 = 0x000 << 20;
pub(crate) const MARKER_B: u32 = 0xFF0 << 20;
pub(crate) const MARKER_C: u32 = 0xF0F << 20;
pub(crate) const INTRO: u32 = 0x0FF << 20;

fn xorshift(state: &mut u32) -> u32 {
    *state ^= *state << 13;
    *state ^= *state >> 17;
    *state ^= *state << 5;
    *state
}

/// Returns `count` pseudo-random points carrying `marker`. `seed` must be non-zero.
pub(crate) fn points(marker: u32, count: usize, seed: u32) -> Vec<u32> {
    let mut state = seed;
    (0..count)
        .map(|_| marker | (xorshift(&mut state) & 0x000F_FFFF))
        .collect()
}

/// Concatenates `parts` into a single fingerprint.
pub(crate) fn concat(parts: &[&[u32]]) -> super::Fingerprint {
    parts.concat().into()
}

pub(crate) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {}, got {}",
        expected,
        actual
    );
}
