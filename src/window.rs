use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::{Result, RunCostError};

const DATE_FORMAT: &str = "%Y-%m-%d";
const API_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Half-open UTC interval `[since, until)` that run creation times must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    since: DateTime<Utc>,
    until: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Self> {
        if since >= until {
            return Err(RunCostError::Window(format!(
                "start {since} must be before end {until}"
            )));
        }
        Ok(Self { since, until })
    }

    /// The whole UTC day `date`.
    pub fn for_day(date: NaiveDate) -> Self {
        let since = date.and_time(chrono::NaiveTime::MIN).and_utc();
        Self {
            since,
            until: since + Duration::days(1),
        }
    }

    /// Every UTC day from `from` through `to`, both inclusive.
    pub fn for_range(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(RunCostError::Window(format!(
                "--from {from} is after --to {to}"
            )));
        }
        let since = from.and_time(chrono::NaiveTime::MIN).and_utc();
        let until = to.and_time(chrono::NaiveTime::MIN).and_utc() + Duration::days(1);
        Self::new(since, until)
    }

    /// Resolves `--date` or `--from/--to` into a window.
    ///
    /// The two forms are mutually exclusive and one of them is required.
    pub fn resolve(date: Option<&str>, from: Option<&str>, to: Option<&str>) -> Result<Self> {
        match (date, from, to) {
            (Some(date), None, None) => Ok(Self::for_day(parse_date(date)?)),
            (None, Some(from), Some(to)) => Self::for_range(parse_date(from)?, parse_date(to)?),
            (Some(_), _, _) => Err(RunCostError::Window(
                "--date cannot be combined with --from/--to".into(),
            )),
            (None, Some(_), None) | (None, None, Some(_)) => Err(RunCostError::Window(
                "--from and --to must be given together".into(),
            )),
            (None, None, None) => Err(RunCostError::Window(
                "either --date or --from/--to is required".into(),
            )),
        }
    }

    pub fn since(&self) -> DateTime<Utc> {
        self.since
    }

    pub fn until(&self) -> DateTime<Utc> {
        self.until
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.since <= timestamp && timestamp < self.until
    }

    /// Value for the runs endpoint `created` qualifier.
    ///
    /// The API range is inclusive on both ends, so the upper bound is pulled in
    /// by one second.
    pub fn created_filter(&self) -> String {
        let last = self.until - Duration::seconds(1);
        format!(
            "{}..{}",
            self.since.format(API_TIMESTAMP_FORMAT),
            last.format(API_TIMESTAMP_FORMAT)
        )
    }

    /// Directory-safe name for this window, e.g. `2025-01-06` or `2025-01-01_2025-01-07`.
    pub fn label(&self) -> String {
        let first = self.since.date_naive();
        let last = (self.until - Duration::seconds(1)).date_naive();
        if first == last {
            first.format(DATE_FORMAT).to_string()
        } else {
            format!("{}_{}", first.format(DATE_FORMAT), last.format(DATE_FORMAT))
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| RunCostError::Window(format!("invalid date '{value}' (expected YYYY-MM-DD): {e}")))
}
