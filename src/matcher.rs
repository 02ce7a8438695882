use serde::Serialize;

use crate::error::{Error, Result};
use crate::store::EncodingRecord;

/// Result of one matching attempt. `identity` is `None` when the nearest
/// stored encoding was not under the threshold; `distance` always carries the
/// minimum observed distance for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub identity: Option<String>,
    pub distance: f32,
    pub threshold: f32,
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        self.identity.is_some()
    }
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Nearest stored record to the probe. Linear scan; on an exact distance tie
/// the earlier record wins, so callers get a deterministic answer as long as
/// they pass records in a stable order (the store sorts by identity).
pub fn nearest<'a>(records: &'a [EncodingRecord], probe: &[f32]) -> Option<(&'a EncodingRecord, f32)> {
    let mut best: Option<(&EncodingRecord, f32)> = None;
    for record in records {
        let dist = euclidean_distance(&record.vector, probe);
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((record, dist)),
        }
    }
    best
}

/// Match a probe vector against the stored records. A match requires the
/// minimum distance to be strictly below the threshold.
pub fn match_probe(
    records: &[EncodingRecord],
    probe: &[f32],
    threshold: f32,
) -> Result<MatchOutcome> {
    let (record, distance) = nearest(records, probe).ok_or(Error::NoEncodingsAvailable)?;
    let identity = (distance < threshold).then(|| record.identity.clone());
    Ok(MatchOutcome {
        identity,
        distance,
        threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(identity: &str, vector: Vec<f32>) -> EncodingRecord {
        EncodingRecord::new(identity, vector, 1)
    }

    #[test]
    fn identical_vector_matches_at_zero_distance() {
        let records = vec![record("a", vec![0.3, 0.4]), record("b", vec![1.0, 1.0])];
        let outcome = match_probe(&records, &[0.3, 0.4], 0.48).unwrap();
        assert_eq!(outcome.identity.as_deref(), Some("a"));
        assert_eq!(outcome.distance, 0.0);
    }

    #[test]
    fn distance_at_threshold_is_not_a_match() {
        let records = vec![record("a", vec![0.0, 0.0])];
        // distance exactly 0.5 against threshold 0.5: strict less-than
        let outcome = match_probe(&records, &[0.5, 0.0], 0.5).unwrap();
        assert!(!outcome.is_match());
        assert!((outcome.distance - 0.5).abs() < 1e-6);
    }

    #[test]
    fn no_match_reports_minimum_distance() {
        let records = vec![record("far", vec![10.0, 0.0]), record("near", vec![2.0, 0.0])];
        let outcome = match_probe(&records, &[0.0, 0.0], 0.48).unwrap();
        assert!(outcome.identity.is_none());
        assert!((outcome.distance - 2.0).abs() < 1e-6);
    }

    #[test]
    fn exact_tie_goes_to_first_record() {
        let records = vec![record("alice", vec![0.1, 0.0]), record("bob", vec![-0.1, 0.0])];
        let outcome = match_probe(&records, &[0.0, 0.0], 0.48).unwrap();
        assert_eq!(outcome.identity.as_deref(), Some("alice"));
    }

    #[test]
    fn empty_store_is_no_encodings_available() {
        let err = match_probe(&[], &[0.0], 0.48).unwrap_err();
        assert!(matches!(err, Error::NoEncodingsAvailable));
    }

    #[test]
    fn matching_is_idempotent() {
        let records = vec![record("a", vec![0.2, 0.1]), record("b", vec![0.9, 0.9])];
        let probe = [0.25, 0.1];
        let first = match_probe(&records, &probe, 0.48).unwrap();
        let second = match_probe(&records, &probe, 0.48).unwrap();
        assert_eq!(first.identity, second.identity);
        assert_eq!(first.distance, second.distance);
    }
}
