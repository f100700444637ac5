//! # Sale Numbers
//!
//! Human-readable sale identifiers derived from the checkout timestamp:
//!
//! ```text
//!   2026-10-19 14:03:27.481 UTC  →  20261019-140327481
//!   same millisecond, retry 1    →  20261019-140327481-1
//! ```
//!
//! Uniqueness is not assumed: the `sales` table has a
//! `UNIQUE(tenant_id, sale_number)` index and the sale service retries the
//! whole transaction with the next attempt number when it trips.

use chrono::{DateTime, Utc};

/// Formats the sale number for a checkout at `at`.
///
/// `attempt` is 0 for the first try; later attempts get a `-N` suffix so a
/// retry inside the same millisecond cannot collide again.
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use vetpos_core::format_sale_number;
///
/// let at = Utc.with_ymd_and_hms(2026, 10, 19, 14, 3, 27).unwrap();
/// assert_eq!(format_sale_number(at, 0), "20261019-140327000");
/// assert_eq!(format_sale_number(at, 2), "20261019-140327000-2");
/// ```
pub fn format_sale_number(at: DateTime<Utc>, attempt: u32) -> String {
    let base = at.format("%Y%m%d-%H%M%S%3f").to_string();
    if attempt == 0 {
        base
    } else {
        format!("{}-{}", base, attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_millisecond_precision() {
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 9, 7, 3).unwrap() + Duration::milliseconds(42);
        assert_eq!(format_sale_number(at, 0), "20260105-090703042");
    }

    #[test]
    fn test_numbers_sort_chronologically() {
        let first = Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).unwrap();
        let second = first + Duration::milliseconds(1);
        assert!(format_sale_number(first, 0) < format_sale_number(second, 0));
    }

    #[test]
    fn test_retry_suffix_differs() {
        let at = Utc::now();
        assert_ne!(format_sale_number(at, 0), format_sale_number(at, 1));
        assert_ne!(format_sale_number(at, 1), format_sale_number(at, 2));
    }
}
