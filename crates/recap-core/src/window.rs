use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Date format used for draft filenames and window markers.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Opening of the HTML comment that records a draft's window.
const MARKER_OPEN: &str = "<!-- recap:window ";
const MARKER_CLOSE: &str = " -->";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("window start {from} is after window end {to}")]
    Inverted { from: NaiveDate, to: NaiveDate },
    #[error("invalid date `{0}` (expected YYYY-MM-DD)")]
    BadDate(String),
}

/// Closed calendar-day interval `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ActivityWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, WindowError> {
        if from > to {
            return Err(WindowError::Inverted { from, to });
        }
        Ok(Self { from, to })
    }

    /// Parse two `YYYY-MM-DD` strings.
    pub fn parse(from: &str, to: &str) -> Result<Self, WindowError> {
        Self::new(parse_date(from)?, parse_date(to)?)
    }

    /// Monday through Friday of the week containing `today`.
    pub fn this_week(today: NaiveDate) -> Self {
        let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        Self {
            from: monday,
            to: monday + Duration::days(4),
        }
    }

    /// Monday through Friday of the week before the one containing `today`.
    pub fn last_week(today: NaiveDate) -> Self {
        Self::this_week(today - Duration::days(7))
    }

    /// `from` at 00:00:00 UTC.
    pub fn start_utc(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.from.and_time(NaiveTime::MIN))
    }

    /// `to` at 23:59:59 UTC.
    pub fn end_utc(&self) -> DateTime<Utc> {
        let end = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        Utc.from_utc_datetime(&self.to.and_time(end))
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start_utc() && ts <= self.end_utc()
    }

    /// `2026.02.16-2026.02.20`, the subject-line form.
    pub fn dotted(&self) -> String {
        format!(
            "{}-{}",
            self.from.format("%Y.%m.%d"),
            self.to.format("%Y.%m.%d")
        )
    }

    /// `2026-02-16..2026-02-20`, the form stored in draft markers.
    pub fn marker(&self) -> String {
        format!(
            "{}..{}",
            self.from.format(DATE_FORMAT),
            self.to.format(DATE_FORMAT)
        )
    }

    /// Invisible HTML comment carrying the window inside a Markdown draft.
    pub fn marker_comment(&self) -> String {
        format!("{MARKER_OPEN}{}{MARKER_CLOSE}", self.marker())
    }

    /// First window marker comment in `text`, if any.
    pub fn find_marker_comment(text: &str) -> Option<Self> {
        text.lines().find_map(|line| {
            let rest = line.trim().strip_prefix(MARKER_OPEN)?;
            let inner = rest.strip_suffix(MARKER_CLOSE)?;
            Self::parse_marker(inner).ok()
        })
    }

    /// Inverse of [`ActivityWindow::marker`].
    pub fn parse_marker(s: &str) -> Result<Self, WindowError> {
        let (from, to) = s
            .trim()
            .split_once("..")
            .ok_or_else(|| WindowError::BadDate(s.to_string()))?;
        Self::parse(from, to)
    }
}

pub fn parse_date(s: &str) -> Result<NaiveDate, WindowError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| WindowError::BadDate(s.to_string()))
}
