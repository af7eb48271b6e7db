//! Average rating computation.

/// Arithmetic mean of the given scores, or `0.0` for an empty set.
pub fn average_rating(scores: &[u8]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let sum: u64 = scores.iter().map(|&s| u64::from(s)).sum();
    sum as f64 / scores.len() as f64
}
