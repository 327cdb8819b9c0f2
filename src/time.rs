//! Date range handling for report requests.

use crate::error::{Result, SyncError};
use chrono::NaiveDate;
use std::fmt;
use tracing::warn;

/// Ranges wider than this still run, with a warning.
pub const LONG_RANGE_DAYS: i64 = 90;

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Validate a request range against `today`: start not after end, end not
    /// in the future.
    pub fn new(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(SyncError::InvalidDateRange(format!(
                "start date {} must be before or equal to end date {}",
                start, end
            )));
        }
        if end > today {
            return Err(SyncError::InvalidDateRange(format!(
                "end date {} cannot be in the future",
                end
            )));
        }

        let range = Self { start, end };
        if range.days() > LONG_RANGE_DAYS {
            warn!(
                "Date range spans {} days; large ranges take a while to download",
                range.days()
            );
        }
        Ok(range)
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn start_iso(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_iso(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start_iso(), self.end_iso())
    }
}
