// src/report_date.rs

use chrono::{Duration, Local, NaiveDate};
use std::fmt;

/// How far the published report lags behind the day the job runs.
const REPORT_LAG_DAYS: i64 = 2;

/// The "as of" date a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReportDate(NaiveDate);

impl ReportDate {
    /// Report date for a run happening on `run_date`.
    pub fn for_run(run_date: NaiveDate) -> Self {
        Self(run_date - Duration::days(REPORT_LAG_DAYS))
    }

    /// Report date for a run happening now, in local time.
    pub fn today() -> Self {
        Self::for_run(Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// `YYYY-MM-DD`, used in the source URL and on every record.
    pub fn iso(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// `YYYYMMDD`, used in local filenames.
    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }
}

impl fmt::Display for ReportDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iso())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_days_before_run() {
        let run = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let d = ReportDate::for_run(run);
        assert_eq!(d.iso(), "2024-03-13");
        assert_eq!(d.compact(), "20240313");
    }

    #[test]
    fn test_crosses_month_and_year() {
        let run = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(ReportDate::for_run(run).iso(), "2024-12-30");

        let leap = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(ReportDate::for_run(leap).compact(), "20240228");
    }
}
