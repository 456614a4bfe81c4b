//! Reporting period boundaries.

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::Serialize;

use crate::error::{AppError, Result};

/// Date label format used for period columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Report cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Monthly,
    Weekly,
}

/// A pair of period end dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub kind: PeriodKind,
    pub previous_end: NaiveDate,
    pub current_end: NaiveDate,
}

impl Period {
    /// Month-over-month period ending at `date` (today when absent).
    ///
    /// The previous end is the last calendar day of the month before
    /// `date`'s month.
    pub fn monthly(date: Option<&str>) -> Result<Self> {
        let current_end = resolve_date(date)?;
        Ok(Self {
            kind: PeriodKind::Monthly,
            previous_end: last_day_of_previous_month(current_end),
            current_end,
        })
    }

    /// Week-over-week period ending at `date` (today when absent).
    pub fn weekly(date: Option<&str>) -> Result<Self> {
        let current_end = resolve_date(date)?;
        Ok(Self {
            kind: PeriodKind::Weekly,
            previous_end: current_end - Duration::days(7),
            current_end,
        })
    }

    /// First day of the previous end's month.
    pub fn previous_start(&self) -> NaiveDate {
        first_of_month(self.previous_end)
    }

    /// First day of the current end's month.
    pub fn current_start(&self) -> NaiveDate {
        first_of_month(self.current_end)
    }

    pub fn previous_label(&self) -> String {
        label(self.previous_end)
    }

    pub fn current_label(&self) -> String {
        label(self.current_end)
    }

    /// Sheet title suffix, e.g. `Dec - Jan`.
    pub fn month_names(&self) -> (String, String) {
        (
            self.previous_end.format("%b").to_string(),
            self.current_end.format("%b").to_string(),
        )
    }
}

/// Parse an ISO date, defaulting to today.
pub fn resolve_date(date: Option<&str>) -> Result<NaiveDate> {
    match date.map(str::trim).filter(|d| !d.is_empty()) {
        None => Ok(Local::now().date_naive()),
        Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map_err(|_| AppError::InvalidDate(raw.to_string())),
    }
}

/// Format a date as a period label.
pub fn label(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Monday and Sunday of the ISO week containing `date`.
pub fn week_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    (start, start + Duration::days(6))
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_day_of_previous_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date) - Duration::days(1)
}
