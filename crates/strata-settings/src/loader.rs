//! Settings loading with file layering and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`StrataSettings::default()`]
//! 2. If `~/.strata/settings.json` exists, merge its values over the defaults
//!    (nested objects merge per key, arrays and primitives replace)
//! 3. Apply `STRATA_*` environment variable overrides (highest priority)
//! 4. Validate ranges

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use figment::Figment;
use figment::providers::{Format, Json, Serialized};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::StrataSettings;

/// `~/.strata/settings.json`, rooted at `/tmp` when `HOME` is unset.
pub fn settings_path() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
        .join(".strata")
        .join("settings.json")
}

/// Settings from [`settings_path`], with `STRATA_*` overrides applied.
pub fn load_settings() -> Result<StrataSettings> {
    load_settings_from_path(&settings_path())
}

/// Settings from `path`, with `STRATA_*` overrides applied and validated.
///
/// A missing file means defaults. Malformed JSON, a mistyped value, or an
/// out-of-range result is an error.
pub fn load_settings_from_path(path: &Path) -> Result<StrataSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Defaults merged with the settings file, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<StrataSettings> {
    let mut figment = Figment::from(Serialized::defaults(StrataSettings::default()));
    if path.exists() {
        debug!(path = %path.display(), "merging settings file");
        figment = figment.merge(Json::file(path));
    } else {
        debug!(path = %path.display(), "no settings file, using defaults");
    }
    let settings: StrataSettings = figment.extract().map_err(Box::new)?;
    Ok(settings)
}

/// Apply `STRATA_*` overrides to loaded settings.
///
/// Numbers outside their accepted range and unparsable values are ignored
/// with a warning, leaving the file or default value in place.
pub fn apply_env_overrides(settings: &mut StrataSettings) {
    let ranking = &mut settings.ranking;
    if let Some(v) = env_in_range("STRATA_TIME_DECAY_DAYS", 0.01..=36_500.0) {
        ranking.time_decay_days = v;
    }
    if let Some(v) = env_in_range("STRATA_RECENCY_WINDOW_DAYS", 0.01..=36_500.0) {
        ranking.recency_window_days = v;
    }

    let hierarchy = &mut settings.hierarchy;
    if let Some(v) = env_in_range("STRATA_MAX_TOKENS_PER_SUMMARY", 1..=1_000_000) {
        hierarchy.max_tokens_per_summary = v;
    }
    if let Some(v) = env_in_range("STRATA_CHURN_THRESHOLD", 0.0..=1.0) {
        hierarchy.churn_threshold = v;
    }

    let context = &mut settings.context;
    if let Some(v) = env_in_range("STRATA_MIN_CHUNK_TOKENS", 1..=100_000) {
        context.min_chunk_tokens = v;
    }
    if let Some(v) = env_in_range("STRATA_COMPRESSION_TOLERANCE", 0.0..=1.0) {
        context.compression_tolerance = v;
    }
    if let Some(v) = env_in_range("STRATA_MIN_COMPRESSION_FRACTION", 0.0..=1.0) {
        context.min_compression_fraction = v;
    }

    let upstream = &mut settings.upstream;
    if let Some(v) = env_in_range("STRATA_CALL_TIMEOUT_MS", 1..=3_600_000) {
        upstream.call_timeout_ms = v;
    }
    if let Some(v) = env_in_range("STRATA_CONCURRENCY_LIMIT", 1..=1024) {
        upstream.concurrency_limit = v;
    }

    if let Some(v) = env_value("STRATA_LOG_LEVEL", |v| Some(v.to_string())) {
        settings.logging.level = v;
    }
    if let Some(v) = env_value("STRATA_LOG_JSON", parse_bool) {
        settings.logging.json = v;
    }
}

/// `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`, case-insensitive.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse `val` and keep it only when it lies in `range`.
///
/// NaN and infinities never fall inside a finite range, so float settings
/// reject them too.
pub fn parse_in_range<T>(val: &str, range: RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    let n: T = val.trim().parse().ok()?;
    range.contains(&n).then_some(n)
}

fn env_in_range<T>(name: &str, range: RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    env_value(name, |v| parse_in_range(v, range))
}

/// Read `name` and parse it; empty variables count as unset.
fn env_value<T>(name: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let raw = std::env::var(name).ok().filter(|v| !v.trim().is_empty())?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        warn!(key = name, value = %raw, "ignoring invalid settings override");
    }
    parsed
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use crate::types::ClusteringStrategy;
    use assert_matches::assert_matches;
    use strata_core::CompressionMethod;

    fn write_settings(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    // ── file layer ──────────────────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = load_file_layer(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings, StrataSettings::default());
    }

    #[test]
    fn empty_json_returns_defaults() {
        let (_dir, path) = write_settings("{}");
        let settings = load_file_layer(&path).unwrap();
        assert_eq!(settings, StrataSettings::default());
    }

    #[test]
    fn partial_json_merges_nested() {
        let (_dir, path) = write_settings(
            r#"{
                "ranking": {"weights": {"semantic": 0.6}, "timeDecayDays": 7},
                "hierarchy": {"clustering": "directory"},
                "context": {"compressionMethod": "aggressive"}
            }"#,
        );
        let settings = load_file_layer(&path).unwrap();
        assert!((settings.ranking.weights.semantic - 0.6).abs() < f64::EPSILON);
        assert!((settings.ranking.weights.time_decay - 0.20).abs() < f64::EPSILON);
        assert!((settings.ranking.time_decay_days - 7.0).abs() < f64::EPSILON);
        assert!((settings.ranking.recency_window_days - 90.0).abs() < f64::EPSILON);
        assert_eq!(settings.hierarchy.clustering, ClusteringStrategy::Directory);
        assert_eq!(settings.hierarchy.max_tokens_per_summary, 500);
        assert_eq!(settings.context.compression_method, CompressionMethod::Aggressive);
    }

    #[test]
    fn invalid_json_returns_error() {
        let (_dir, path) = write_settings("not valid json");
        assert_matches!(load_file_layer(&path), Err(SettingsError::Load(_)));
    }

    #[test]
    fn wrong_type_returns_error() {
        let (_dir, path) = write_settings(r#"{"upstream": {"concurrencyLimit": "many"}}"#);
        assert_matches!(load_file_layer(&path), Err(SettingsError::Load(_)));
    }

    #[test]
    fn out_of_range_file_value_fails_validation() {
        let (_dir, path) = write_settings(r#"{"hierarchy": {"churnThreshold": 3.0}}"#);
        assert_matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidValue(_))
        );
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_values() {
        for v in ["true", "1", "YES", "On", " true "] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["false", "0", "no", "OFF"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn integer_overrides_respect_their_range() {
        assert_eq!(parse_in_range::<u64>("5000", 1..=10_000), Some(5000));
        assert_eq!(parse_in_range::<u64>("0", 1..=10_000), None);
        assert_eq!(parse_in_range::<u64>("-3", 1..=10_000), None);
        assert_eq!(parse_in_range::<usize>(" 4 ", 1..=16), Some(4));
        assert_eq!(parse_in_range::<usize>("17", 1..=16), None);
        assert_eq!(parse_in_range::<usize>("four", 1..=16), None);
    }

    #[test]
    fn float_overrides_reject_non_finite() {
        assert_eq!(parse_in_range("0.25", 0.0..=1.0), Some(0.25));
        assert_eq!(parse_in_range("1.5", 0.0..=1.0), None);
        assert_eq!(parse_in_range("NaN", 0.0..=1.0), None);
        assert_eq!(parse_in_range("inf", 0.0..=f64::MAX), None);
    }

    #[test]
    fn settings_path_ends_with_strata_dir() {
        let path = settings_path();
        assert!(path.ends_with(".strata/settings.json"));
    }
}
