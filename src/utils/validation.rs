use crate::error::{LedgerError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::path::Path;

/// Rejects empty payloads and payloads above `max_size`.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<()> {
    if size == 0 {
        return Err(LedgerError::DataQualityViolation(
            "file is empty or could not be read".to_string(),
        ));
    }
    if size > max_size {
        return Err(LedgerError::DataQualityViolation(format!(
            "file size {} bytes exceeds maximum allowed {} bytes ({} MB)",
            size,
            max_size,
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

/// Keeps only the final path component and strips characters that would
/// break stage keys or CSV exports.
pub fn sanitize_filename(filename: &str) -> Result<String> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\'' => '_',
            other => other,
        })
        .collect();
    let cleaned = cleaned.trim().to_string();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(LedgerError::DataQualityViolation(format!(
            "invalid filename '{}'",
            filename
        )));
    }
    Ok(cleaned)
}

/// `YYYYMMDD_HHMMSS_<tag>_<original>`, the stored name of an upload.
///
/// `tag` keeps two uploads of the same photograph within one second apart.
pub fn stored_filename(at: DateTime<Utc>, tag: &str, original_name: &str) -> String {
    format!("{}_{}_{}", at.format("%Y%m%d_%H%M%S"), tag, original_name)
}

/// Longest look-back accepted for metrics windows and retention ages.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// `now` minus `days`, for a day count in `[0, MAX_WINDOW_DAYS]`.
pub fn window_start(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    if !(0..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(LedgerError::DataQualityViolation(format!(
            "window of {} days is outside [0, {}]",
            days, MAX_WINDOW_DAYS
        )));
    }
    TimeDelta::try_days(days)
        .and_then(|delta| now.checked_sub_signed(delta))
        .ok_or_else(|| {
            LedgerError::DataQualityViolation(format!("window of {} days reaches before the calendar", days))
        })
}

/// Confidence must be a finite score in [0, 1].
pub fn validate_confidence(score: f64) -> Result<()> {
    if !score.is_finite() || !(0.0..=1.0).contains(&score) {
        return Err(LedgerError::DataQualityViolation(format!(
            "confidence score {} is outside [0, 1]",
            score
        )));
    }
    Ok(())
}
