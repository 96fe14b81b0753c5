//! Sub-score functions and the deterministic ranking order.
//!
//! Every function returns a value in `[0, 1]`; inputs outside the expected
//! domain (future timestamps, negative salience) are clamped.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use strata_core::{RankingWeights, ScoreBreakdown};

const MS_PER_DAY: f64 = 86_400_000.0;

/// Age in fractional days, zero for timestamps after `now`.
#[allow(clippy::cast_precision_loss)]
pub fn age_days(at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let ms = (now - at).num_milliseconds().max(0);
    ms as f64 / MS_PER_DAY
}

/// Linear decay from 1 (just updated) to 0 at `window_days`.
pub fn recency(updated: DateTime<Utc>, now: DateTime<Utc>, window_days: f64) -> f64 {
    if window_days <= 0.0 {
        return 0.0;
    }
    (1.0 - age_days(updated, now) / window_days).clamp(0.0, 1.0)
}

/// Exponential decay `0.5^(age / half_life)`.
pub fn time_decay(last_touch: DateTime<Utc>, now: DateTime<Utc>, half_life_days: f64) -> f64 {
    if half_life_days <= 0.0 {
        return 0.0;
    }
    0.5_f64
        .powf(age_days(last_touch, now) / half_life_days)
        .clamp(0.0, 1.0)
}

/// Log-scaled access count relative to the busiest candidate.
#[allow(clippy::cast_precision_loss)]
pub fn frequency(count: u64, max_count: u64) -> f64 {
    if max_count == 0 {
        return 0.0;
    }
    ((count as f64).ln_1p() / (max_count as f64).ln_1p()).clamp(0.0, 1.0)
}

/// Stored salience, or `neutral` when absent or not a number.
pub fn salience(value: Option<f64>, neutral: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => neutral.clamp(0.0, 1.0),
    }
}

/// Similarity mapped into `[0, 1]`; negative cosine counts as unrelated.
pub fn semantic(similarity: f64) -> f64 {
    if similarity.is_finite() {
        similarity.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Weighted sum of sub-scores. `weights` must already be normalized.
pub fn combine(weights: &RankingWeights, parts: &ScoreBreakdown) -> f64 {
    let sum = weights.semantic * parts.semantic
        + weights.recency * parts.recency
        + weights.frequency * parts.frequency
        + weights.salience * parts.salience
        + weights.time_decay * parts.time_decay;
    sum.clamp(0.0, 1.0)
}

/// Sort key shared by every ranked list: combined score descending, then
/// most recent update, then name ascending.
#[derive(Clone, Copy, Debug)]
pub struct RankKey<'a> {
    /// Combined score.
    pub combined: f64,
    /// Last update of the underlying content.
    pub updated: DateTime<Utc>,
    /// File name or summary id.
    pub name: &'a str,
}

impl RankKey<'_> {
    /// Total order placing better candidates first.
    pub fn cmp_rank(&self, other: &RankKey<'_>) -> Ordering {
        other
            .combined
            .total_cmp(&self.combined)
            .then_with(|| other.updated.cmp(&self.updated))
            .then_with(|| self.name.cmp(other.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn recency_is_linear_and_clamped() {
        assert!((recency(now(), now(), 90.0) - 1.0).abs() < 1e-9);
        assert!((recency(now() - Duration::days(45), now(), 90.0) - 0.5).abs() < 1e-9);
        assert!(recency(now() - Duration::days(400), now(), 90.0).abs() < 1e-9);
        assert!((recency(now() + Duration::days(3), now(), 90.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn time_decay_halves_per_half_life() {
        assert!((time_decay(now() - Duration::days(30), now(), 30.0) - 0.5).abs() < 1e-9);
        assert!((time_decay(now() - Duration::days(60), now(), 30.0) - 0.25).abs() < 1e-9);
        assert!((time_decay(now(), now(), 30.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn frequency_is_log_normalized() {
        assert!(frequency(0, 0).abs() < 1e-9);
        assert!((frequency(10, 10) - 1.0).abs() < 1e-9);
        let mid = frequency(3, 15);
        assert!(mid > 3.0 / 15.0 && mid < 1.0);
    }

    #[test]
    fn salience_defaults_and_clamps() {
        assert!((salience(None, 0.5) - 0.5).abs() < 1e-9);
        assert!((salience(Some(2.0), 0.5) - 1.0).abs() < 1e-9);
        assert!(salience(Some(-1.0), 0.5).abs() < 1e-9);
        assert!((salience(Some(f64::NAN), 0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn combine_uses_weights() {
        let weights = RankingWeights {
            semantic: 1.0,
            recency: 0.0,
            frequency: 0.0,
            salience: 0.0,
            time_decay: 0.0,
        };
        let parts = ScoreBreakdown {
            semantic: 0.8,
            recency: 1.0,
            frequency: 1.0,
            salience: 1.0,
            time_decay: 1.0,
            combined: 0.0,
        };
        assert!((combine(&weights, &parts) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn rank_key_tie_breaks() {
        let older = now() - Duration::days(1);
        let a = RankKey { combined: 0.5, updated: now(), name: "b.md" };
        let b = RankKey { combined: 0.5, updated: older, name: "a.md" };
        let c = RankKey { combined: 0.5, updated: now(), name: "a.md" };
        let d = RankKey { combined: 0.9, updated: older, name: "z.md" };
        let mut keys = vec![a, b, c, d];
        keys.sort_by(|x, y| x.cmp_rank(y));
        let names: Vec<_> = keys.iter().map(|k| k.name).collect();
        assert_eq!(names, vec!["z.md", "a.md", "b.md", "a.md"]);
        assert_eq!(keys[3].updated, older);
    }
}
