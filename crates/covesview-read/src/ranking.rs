//! Pure scoring functions for feed and comment ordering. Kept free of any
//! store access so they're trivial to test in isolation.

use chrono::{DateTime, Utc};

/// Epoch (in seconds) used as the zero point for the decay term, chosen so
/// scores stay in a comfortable `f64` range for posts made after this
/// service existed. Matches no particular external convention; it only
/// needs to be a fixed point every computation shares.
const EPOCH_SECS: f64 = 1_700_000_000.0;

/// A log-scaled score with a linear time decay, in the shape of the classic
/// "hot" ranking formula: order of magnitude of the score dominates, with
/// recency breaking ties among posts of similar magnitude.
pub fn hot_score(score: i64, created_at: DateTime<Utc>) -> f64 {
    let sign = match score.cmp(&0) {
        std::cmp::Ordering::Less => -1.0,
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Greater => 1.0,
    };
    let magnitude = (score.unsigned_abs() as f64).max(1.0).log10();
    let seconds = created_at.timestamp() as f64 - EPOCH_SECS;
    sign * magnitude + seconds / 45_000.0
}

/// Sort items by descending hot score, breaking ties by URI so ordering is
/// stable across repeated calls with identical inputs.
pub fn sort_by_hot<T>(items: &mut [T], score_and_uri: impl Fn(&T) -> (f64, &str)) {
    items.sort_by(|a, b| {
        let (score_a, uri_a) = score_and_uri(a);
        let (score_b, uri_b) = score_and_uri(b);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| uri_a.cmp(uri_b))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn higher_score_ranks_above_lower_score_at_same_time() {
        let now = Utc.timestamp_opt(1_700_100_000, 0).unwrap();
        assert!(hot_score(100, now) > hot_score(10, now));
    }

    #[test]
    fn more_recent_post_ranks_above_older_post_at_same_score() {
        let older = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let newer = Utc.timestamp_opt(1_700_100_000, 0).unwrap();
        assert!(hot_score(50, newer) > hot_score(50, older));
    }

    #[test]
    fn negative_score_ranks_below_zero_score() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert!(hot_score(-5, now) < hot_score(0, now));
    }

    #[test]
    fn sort_by_hot_breaks_ties_by_uri() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut items = vec![("at://b", 10, now), ("at://a", 10, now)];
        sort_by_hot(&mut items, |(uri, score, created_at)| {
            (hot_score(*score, *created_at), *uri)
        });
        assert_eq!(items[0].0, "at://a");
    }
}
