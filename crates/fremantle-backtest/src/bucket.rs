//! Rank-based bucketing of a scored universe.

use fremantle_data::Symbol;
use fremantle_factors::Direction;
use std::cmp::Ordering;

/// Split scored instruments into `n` equal-count buckets.
///
/// Bucket 0 holds the least favoured scores and bucket `n - 1` the most
/// favoured, according to `direction`. When the universe does not divide
/// evenly the extra members go to the lowest-index buckets. Equal scores are
/// ordered by symbol so the assignment is deterministic. Scores must be
/// finite; callers drop NaN scores beforehand.
pub fn assign_buckets(scored: &[(Symbol, f64)], n: usize, direction: Direction) -> Vec<Vec<Symbol>> {
    if n == 0 {
        return Vec::new();
    }
    let mut ordered: Vec<&(Symbol, f64)> = scored.iter().collect();
    ordered.sort_by(|a, b| {
        let by_score = match direction {
            Direction::Ascending => a.1.total_cmp(&b.1),
            Direction::Descending => b.1.total_cmp(&a.1),
        };
        match by_score {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        }
    });

    let base = ordered.len() / n;
    let extra = ordered.len() % n;
    let mut buckets = Vec::with_capacity(n);
    let mut rest = ordered.as_slice();
    for index in 0..n {
        let size = base + usize::from(index < extra);
        let (head, tail) = rest.split_at(size);
        buckets.push(head.iter().map(|(s, _)| s.clone()).collect());
        rest = tail;
    }
    buckets
}
