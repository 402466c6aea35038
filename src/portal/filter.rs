//! Age cutoff for listed statements.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};

use super::StatementRef;

/// Which statements are recent enough to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AgePolicy {
    max_age: Option<Duration>,
}

/// Decision for a single statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Download,
    /// Older than the configured maximum age.
    Stale { age: Duration },
    /// The date token is not a valid `YYYYMMDD` date.
    Unparseable { reason: String },
}

impl AgePolicy {
    /// No cutoff: every statement with a readable date is downloaded.
    pub fn unlimited() -> Self {
        Self { max_age: None }
    }

    /// Cutoff in whole days. Zero means unlimited.
    pub fn max_days(days: u32) -> Self {
        if days == 0 {
            Self::unlimited()
        } else {
            Self {
                max_age: Some(Duration::days(i64::from(days))),
            }
        }
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Classify one statement relative to `now`.
    ///
    /// Statements dated in the future are never stale.
    pub fn select(&self, statement: &StatementRef, now: DateTime<Local>) -> Selection {
        let issued = match parse_statement_date(&statement.date_token) {
            Ok(issued) => issued,
            Err(reason) => return Selection::Unparseable { reason },
        };

        let age = now.signed_duration_since(issued);
        match self.max_age {
            Some(max_age) if age > max_age => Selection::Stale { age },
            _ => Selection::Download,
        }
    }
}

/// Local midnight of an eight-digit `YYYYMMDD` token.
pub fn parse_statement_date(token: &str) -> Result<DateTime<Local>, String> {
    if token.len() != 8 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("expected 8 digits, got {token:?}"));
    }

    let date = NaiveDate::parse_from_str(token, "%Y%m%d")
        .map_err(|e| format!("invalid date {token:?}: {e}"))?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or("no midnight")?;

    Local
        .from_local_datetime(&midnight)
        .earliest()
        .ok_or_else(|| format!("{token} has no local midnight"))
}
