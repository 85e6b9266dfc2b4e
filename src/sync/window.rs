use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowAnchor {
    Month,
    Week,
}

/// A window that starts at the beginning of the current month or week and
/// covers `span` such units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub anchor: WindowAnchor,
    pub span: u32,
}

impl WindowSpec {
    pub fn months(span: u32) -> Self {
        Self { anchor: WindowAnchor::Month, span }
    }

    pub fn weeks(span: u32) -> Self {
        Self { anchor: WindowAnchor::Week, span }
    }

    pub fn resolve(&self, now: DateTime<Utc>, utc_offset_hours: i32) -> SyncWindow {
        let today = (now + Duration::hours(utc_offset_hours as i64)).date_naive();
        let span = self.span.max(1);

        let (start, end_exclusive) = match self.anchor {
            WindowAnchor::Month => {
                let start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
                    .unwrap_or(today);
                let end = start.checked_add_months(Months::new(span)).unwrap_or(start);
                (start, end)
            }
            WindowAnchor::Week => {
                let back = today.weekday().num_days_from_monday() as i64;
                let start = today - Duration::days(back);
                (start, start + Duration::weeks(span as i64))
            }
        };

        SyncWindow {
            start: start.and_time(chrono::NaiveTime::MIN).and_utc(),
            end: end_exclusive.and_time(chrono::NaiveTime::MIN).and_utc() - Duration::seconds(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn start_param(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn end_param(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}
