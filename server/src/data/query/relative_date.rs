//! Relative date expressions
//!
//! Resolves strings like `last 7 days` or `next 2 weeks` into an inclusive
//! `[start, end]` pair of local-midnight boundaries.
//!
//! A month is a fixed 30 days, not a calendar month. Callers depend on the
//! exact boundaries, so keep it that way.

use std::sync::LazyLock;

use chrono::{DateTime, Days, Local, NaiveDate, TimeZone, Utc};
use regex::Regex;

static RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(last|next)\s+(\d+)\s+(day|week|month)s?\s*$").expect("Invalid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Last,
    Next,
}

/// Parsed relative span, not yet anchored to a date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeSpan {
    pub direction: Direction,
    pub days: u64,
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Boundaries as UTC instants of local midnight
    pub fn to_utc(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((local_midnight(self.start)?, local_midnight(self.end)?))
    }
}

impl RelativeSpan {
    pub fn parse(expr: &str) -> Option<Self> {
        let caps = RELATIVE.captures(expr)?;
        let direction = if caps[1].eq_ignore_ascii_case("last") {
            Direction::Last
        } else {
            Direction::Next
        };
        let n: u64 = caps[2].parse().ok()?;
        let unit_days = match caps[3].to_ascii_lowercase().as_str() {
            "day" => 1,
            "week" => 7,
            _ => 30,
        };
        Some(Self {
            direction,
            days: n.checked_mul(unit_days)?,
        })
    }

    /// Anchor the span on `today`; `None` when the range leaves chrono's date range
    pub fn resolve(&self, today: NaiveDate) -> Option<DateRange> {
        let offset = Days::new(self.days);
        match self.direction {
            Direction::Last => Some(DateRange {
                start: today.checked_sub_days(offset)?,
                end: today,
            }),
            Direction::Next => Some(DateRange {
                start: today,
                end: today.checked_add_days(offset)?,
            }),
        }
    }
}

/// Parse and resolve against the local calendar date
pub fn resolve_relative_date(expr: &str) -> Option<DateRange> {
    RelativeSpan::parse(expr)?.resolve(Local::now().date_naive())
}

fn local_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    start_of_day(&Local, date)
}

/// First instant of `date` in `tz`. A midnight inside a DST gap moves to the
/// first valid local minute of that day.
fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    (0..24 * 60)
        .map(|minute| midnight + chrono::Duration::minutes(minute))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, LocalResult, NaiveDateTime, Timelike};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_last_seven_days() {
        let today = day(2024, 3, 10);
        let range = RelativeSpan::parse("last 7 days")
            .unwrap()
            .resolve(today)
            .unwrap();
        assert_eq!(range.start, day(2024, 3, 3));
        assert_eq!(range.end, today);
    }

    #[test]
    fn test_next_thirty_days() {
        let today = day(2024, 3, 10);
        let range = RelativeSpan::parse("next 30 days")
            .unwrap()
            .resolve(today)
            .unwrap();
        assert_eq!(range.start, today);
        assert_eq!(range.end, day(2024, 4, 9));
    }

    #[test]
    fn test_months_are_thirty_days() {
        let today = day(2024, 5, 31);
        let range = RelativeSpan::parse("last 2 months")
            .unwrap()
            .resolve(today)
            .unwrap();
        // 60 days back, where calendar months would give 2024-03-31
        assert_eq!(range.start, day(2024, 4, 1));
        assert_eq!(range.end, today);
    }

    #[test]
    fn test_weeks_and_singular_units() {
        let span = RelativeSpan::parse("next 1 week").unwrap();
        assert_eq!(span.direction, Direction::Next);
        assert_eq!(span.days, 7);
        assert_eq!(RelativeSpan::parse("last 1 month").unwrap().days, 30);
        assert_eq!(RelativeSpan::parse("last 3 day").unwrap().days, 3);
    }

    #[test]
    fn test_case_insensitive() {
        let span = RelativeSpan::parse("LAST 7 Days").unwrap();
        assert_eq!(span.direction, Direction::Last);
        assert_eq!(span.days, 7);
    }

    #[test]
    fn test_rejects_unparseable() {
        assert!(RelativeSpan::parse("yesterday").is_none());
        assert!(RelativeSpan::parse("last seven days").is_none());
        assert!(RelativeSpan::parse("last 7 years").is_none());
        assert!(RelativeSpan::parse("previous 7 days").is_none());
        assert!(RelativeSpan::parse("last -7 days").is_none());
        assert!(RelativeSpan::parse("").is_none());
    }

    #[test]
    fn test_overflow_is_rejected() {
        assert!(RelativeSpan::parse("last 99999999999999999999 days").is_none());
        let huge = RelativeSpan::parse("next 999999999 months").unwrap();
        assert!(huge.resolve(day(2024, 1, 1)).is_none());
    }

    #[test]
    fn test_resolve_against_local_today() {
        let range = resolve_relative_date("last 0 days").unwrap();
        assert_eq!(range.start, range.end);
        let (start, end) = range.to_utc().unwrap();
        assert_eq!(start, end);
    }

    /// UTC-2 with clocks jumping from 00:00 to 01:00 on 2024-03-31
    #[derive(Clone)]
    struct GapZone;

    impl GapZone {
        fn offset() -> FixedOffset {
            FixedOffset::west_opt(2 * 3600).unwrap()
        }
    }

    impl TimeZone for GapZone {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            GapZone
        }

        fn offset_from_local_date(&self, _: &NaiveDate) -> LocalResult<FixedOffset> {
            LocalResult::Single(Self::offset())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            if local.date() == day(2024, 3, 31) && local.hour() == 0 {
                return LocalResult::None;
            }
            LocalResult::Single(Self::offset())
        }

        fn offset_from_utc_date(&self, _: &NaiveDate) -> FixedOffset {
            Self::offset()
        }

        fn offset_from_utc_datetime(&self, _: &NaiveDateTime) -> FixedOffset {
            Self::offset()
        }
    }

    #[test]
    fn test_start_of_day_skips_dst_gap() {
        assert_eq!(
            start_of_day(&GapZone, day(2024, 3, 31)).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 31, 3, 0, 0).unwrap()
        );

        assert_eq!(
            start_of_day(&GapZone, day(2024, 3, 30)).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 30, 2, 0, 0).unwrap()
        );
    }
}
