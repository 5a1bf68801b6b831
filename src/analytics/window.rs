use crate::config::{MAX_REPORT_YEARS, MIN_REPORT_YEAR};
use crate::error::{AppError, Result};

/// `count` consecutive calendar years ending at `reference_year`, oldest first.
///
/// Only `count > 0` is checked here and the result holds `count` entries.
/// Callers taking a count from outside go through `validate_year_count` first.
pub fn window_years(reference_year: i32, count: i32) -> Result<Vec<i32>> {
    if count <= 0 {
        return Err(AppError::InvalidRange(format!(
            "year count must be positive, got {count}"
        )));
    }
    let first = reference_year
        .checked_sub(count - 1)
        .ok_or_else(|| AppError::InvalidRange(format!("{count} years before {reference_year}")))?;
    Ok((first..=reference_year).collect())
}

/// Caller-supplied year count for a multi-year report.
pub fn validate_year_count(count: i32) -> Result<()> {
    if (1..=MAX_REPORT_YEARS).contains(&count) {
        Ok(())
    } else {
        Err(AppError::InvalidRange(format!(
            "years must be between 1 and {MAX_REPORT_YEARS}, got {count}"
        )))
    }
}

/// Single-year reports cover `MIN_REPORT_YEAR..=current_year + 1`.
pub fn validate_report_year(year: i32, current_year: i32) -> Result<()> {
    if year < MIN_REPORT_YEAR || year > current_year.saturating_add(1) {
        return Err(AppError::InvalidYear(year));
    }
    Ok(())
}
