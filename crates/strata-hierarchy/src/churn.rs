//! Content churn between two versions of a set of summaries.

use std::collections::BTreeSet;

fn word_set(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// `1 - |A ∩ B| / |A ∪ B|` over lowercase word sets. Two empty texts have
/// zero distance.
#[allow(clippy::cast_precision_loss)]
pub fn jaccard_distance(a: &str, b: &str) -> f64 {
    let a = word_set(a);
    let b = word_set(b);
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    let shared = a.intersection(&b).count();
    1.0 - shared as f64 / union as f64
}

/// Token-weighted mean distance between old and new contents.
///
/// Each entry is `(previous content, new content, weight)`; an entry with no
/// previous content counts as fully changed.
#[allow(clippy::cast_precision_loss)]
pub fn weighted_churn(entries: &[(Option<&str>, &str, usize)]) -> f64 {
    let total: usize = entries.iter().map(|(_, _, w)| (*w).max(1)).sum();
    if total == 0 {
        return 0.0;
    }
    let changed: f64 = entries
        .iter()
        .map(|(old, new, w)| {
            let distance = old.map_or(1.0, |old| jaccard_distance(old, new));
            distance * (*w).max(1) as f64
        })
        .sum();
    (changed / total as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_and_disjoint() {
        assert!(jaccard_distance("a b c", "c b a").abs() < 1e-9);
        assert!((jaccard_distance("a b", "c d") - 1.0).abs() < 1e-9);
        assert!(jaccard_distance("", "").abs() < 1e-9);
    }

    #[test]
    fn partial_overlap() {
        assert!((jaccard_distance("a b c d", "a b c e") - 0.4).abs() < 1e-9);
    }

    #[test]
    fn weighted_by_tokens() {
        let small_edit = weighted_churn(&[
            (Some("a b c d e f g h i j"), "a b c d e f g h i k", 100),
            (Some("x y"), "x y", 100),
        ]);
        assert!(small_edit < 0.2);

        let rewrite = weighted_churn(&[(Some("a b"), "c d", 10), (None, "e f", 10)]);
        assert!((rewrite - 1.0).abs() < 1e-9);
        assert!(weighted_churn(&[]).abs() < 1e-9);
    }
}
