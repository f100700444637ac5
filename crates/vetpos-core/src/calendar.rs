//! # Business Day
//!
//! Drawers are opened per day; "today" is the half-open UTC window
//! `[start_of_day, start_of_next_day)` around the checkout timestamp.

use chrono::{DateTime, Duration, NaiveTime, Utc};

/// One calendar day in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessDay {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusinessDay {
    /// The day containing `at`.
    pub fn containing(at: DateTime<Utc>) -> BusinessDay {
        let start = at.date_naive().and_time(NaiveTime::MIN).and_utc();
        BusinessDay {
            start,
            end: start + Duration::days(1),
        }
    }

    /// `start <= at < end`.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}
