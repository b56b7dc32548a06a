//! Closed date windows used to scope temporal queries.
//!
//! Every factory takes the current instant explicitly so the resulting
//! windows are deterministic under test.

use std::fmt;

use chrono::{Datelike, Duration, Month, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::{Result, WorklogError};

/// Lowercase month names in calendar order.
pub const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

/// Resolve a full English month name (case-insensitive) to a [`Month`].
pub fn month_from_name(name: &str) -> Result<Month> {
    let lower = name.trim().to_lowercase();
    MONTH_NAMES
        .iter()
        .position(|m| *m == lower)
        .map(|idx| MONTHS[idx])
        .ok_or_else(|| WorklogError::InvalidMonthName(name.to_string()))
}

/// A third of a calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthThird {
    /// Days 1 to 10.
    Early,
    /// Days 11 to 20.
    Mid,
    /// Day 21 through the last day of the month.
    Late,
}

impl MonthThird {
    /// Parse `early`, `mid` or `late` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "early" => Some(Self::Early),
            "mid" => Some(Self::Mid),
            "late" => Some(Self::Late),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Early => "early",
            Self::Mid => "mid",
            Self::Late => "late",
        }
    }
}

/// An immutable closed interval `[start, end]` of local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl DateRange {
    /// Build a range from explicit bounds, rejecting `start > end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start > end {
            return Err(WorklogError::InvalidDateRange(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    fn bounded(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        debug_assert!(start <= end, "factory produced an inverted range");
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Length of the window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether `instant` lies within the window, bounds inclusive.
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Whether the calendar date, taken at midnight, lies within the window.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.contains(start_of_day(date))
    }

    // -----------------------------------------------------------------
    // Named factories
    // -----------------------------------------------------------------

    /// The whole calendar day of `now`.
    pub fn today(now: NaiveDateTime) -> Self {
        Self::whole_day(now.date())
    }

    /// The whole calendar day before `now`.
    pub fn yesterday(now: NaiveDateTime) -> Self {
        let day = now.date().pred_opt().unwrap_or(NaiveDate::MIN);
        Self::whole_day(day)
    }

    /// From the most recent Sunday (same time of day as `now`) up to `now`.
    pub fn this_week(now: NaiveDateTime) -> Self {
        let back = i64::from(now.weekday().num_days_from_sunday());
        Self::bounded(now - Duration::days(back), now)
    }

    /// The seven days ending at `now`.
    pub fn last_week(now: NaiveDateTime) -> Self {
        Self::bounded(now - Duration::days(7), now)
    }

    /// One calendar month back from `now` (day-of-month clamped) up to `now`.
    pub fn last_month(now: NaiveDateTime) -> Self {
        let start = now
            .checked_sub_months(Months::new(1))
            .unwrap_or(NaiveDateTime::MIN);
        Self::bounded(start, now)
    }

    /// The five days ending at `now`.
    pub fn recent(now: NaiveDateTime) -> Self {
        Self::bounded(now - Duration::days(5), now)
    }

    /// A third of the named month in `year`.
    pub fn month_third(third: MonthThird, month_name: &str, year: i32) -> Result<Self> {
        Self::month_third_of(third, month_from_name(month_name)?, year)
    }

    /// A third of `month` in `year`. The late third ends on the month's
    /// actual last day.
    pub fn month_third_of(third: MonthThird, month: Month, year: i32) -> Result<Self> {
        let last = last_day_of_month(year, month)?;
        let (first_day, last_day) = match third {
            MonthThird::Early => (1, 10),
            MonthThird::Mid => (11, 20),
            MonthThird::Late => (21, last.day()),
        };
        let start = calendar_date(year, month, first_day)?;
        let end = calendar_date(year, month, last_day)?;
        Ok(Self::bounded(start_of_day(start), end_of_day(end)))
    }

    /// The whole named month in `year`.
    pub fn full_month(month_name: &str, year: i32) -> Result<Self> {
        Self::full_month_of(month_from_name(month_name)?, year)
    }

    /// The whole of `month` in `year`.
    pub fn full_month_of(month: Month, year: i32) -> Result<Self> {
        let first = calendar_date(year, month, 1)?;
        let last = last_day_of_month(year, month)?;
        Ok(Self::bounded(start_of_day(first), end_of_day(last)))
    }

    fn whole_day(day: NaiveDate) -> Self {
        Self::bounded(start_of_day(day), end_of_day(day))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// 23:59:59.999 on `date`.
fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::milliseconds(86_399_999)
}

fn calendar_date(year: i32, month: Month, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month.number_from_month(), day).ok_or_else(|| {
        WorklogError::InvalidDateRange(format!(
            "{}-{:02}-{:02} is not a calendar date",
            year,
            month.number_from_month(),
            day
        ))
    })
}

fn last_day_of_month(year: i32, month: Month) -> Result<NaiveDate> {
    let (next_year, next_month) = match month {
        Month::December => (year + 1, 1),
        other => (year, other.number_from_month() + 1),
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| WorklogError::InvalidDateRange(format!("year {} is out of range", year)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, mi, s).unwrap()
    }

    // ---- Construction ----

    #[test]
    fn test_new_accepts_ordered_bounds() {
        let r = DateRange::new(at(2024, 1, 1, 0, 0, 0), at(2024, 1, 2, 0, 0, 0)).unwrap();
        assert_eq!(r.start(), at(2024, 1, 1, 0, 0, 0));
        assert_eq!(r.end(), at(2024, 1, 2, 0, 0, 0));
    }

    #[test]
    fn test_new_accepts_zero_length() {
        let t = at(2024, 1, 1, 12, 0, 0);
        let r = DateRange::new(t, t).unwrap();
        assert!(r.contains(t));
    }

    #[test]
    fn test_new_rejects_inverted_bounds() {
        let err = DateRange::new(at(2024, 1, 2, 0, 0, 0), at(2024, 1, 1, 0, 0, 0)).unwrap_err();
        assert!(matches!(err, WorklogError::InvalidDateRange(_)));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let r = DateRange::new(at(2024, 1, 1, 0, 0, 0), at(2024, 1, 3, 0, 0, 0)).unwrap();
        assert!(r.contains(at(2024, 1, 1, 0, 0, 0)));
        assert!(r.contains(at(2024, 1, 3, 0, 0, 0)));
        assert!(!r.contains(at(2024, 1, 3, 0, 0, 1)));
        assert!(!r.contains(at(2023, 12, 31, 23, 59, 59)));
    }

    #[test]
    fn test_contains_date_uses_midnight() {
        let r = DateRange::new(at(2024, 1, 1, 9, 0, 0), at(2024, 1, 3, 9, 0, 0)).unwrap();
        assert!(!r.contains_date(date(2024, 1, 1)));
        assert!(r.contains_date(date(2024, 1, 2)));
        assert!(r.contains_date(date(2024, 1, 3)));
    }

    // ---- Month names ----

    #[test]
    fn test_month_from_name_case_insensitive() {
        assert_eq!(month_from_name("August").unwrap(), Month::August);
        assert_eq!(month_from_name("DECEMBER").unwrap(), Month::December);
        assert_eq!(month_from_name(" may ").unwrap(), Month::May);
    }

    #[test]
    fn test_month_from_name_rejects_unknown() {
        let err = month_from_name("smarch").unwrap_err();
        assert!(matches!(err, WorklogError::InvalidMonthName(ref m) if m == "smarch"));
        assert!(month_from_name("aug").is_err());
    }

    #[test]
    fn test_month_third_from_name() {
        assert_eq!(MonthThird::from_name("Early"), Some(MonthThird::Early));
        assert_eq!(MonthThird::from_name("mid"), Some(MonthThird::Mid));
        assert_eq!(MonthThird::from_name("LATE"), Some(MonthThird::Late));
        assert_eq!(MonthThird::from_name("middle"), None);
    }

    // ---- Day factories ----

    #[test]
    fn test_today_covers_whole_day() {
        let r = DateRange::today(at(2024, 9, 11, 15, 30, 0));
        assert_eq!(r.start(), at(2024, 9, 11, 0, 0, 0));
        assert_eq!(r.end(), at(2024, 9, 11, 0, 0, 0) + Duration::milliseconds(86_399_999));
        assert_eq!(r.end().date(), date(2024, 9, 11));
    }

    #[test]
    fn test_yesterday_crosses_month_boundary() {
        let r = DateRange::yesterday(at(2024, 3, 1, 8, 0, 0));
        assert_eq!(r.start(), at(2024, 2, 29, 0, 0, 0));
        assert_eq!(r.end().date(), date(2024, 2, 29));
    }

    // ---- Relative factories ----

    #[test]
    fn test_last_week_spans_seven_days_ending_now() {
        let now = at(2024, 9, 11, 15, 30, 0);
        let r = DateRange::last_week(now);
        assert_eq!(r.end(), now);
        assert_eq!(r.duration(), Duration::days(7));
    }

    #[test]
    fn test_this_week_starts_on_sunday() {
        // 2024-09-11 is a Wednesday.
        let now = at(2024, 9, 11, 15, 30, 0);
        let r = DateRange::this_week(now);
        assert_eq!(r.start(), at(2024, 9, 8, 15, 30, 0));
        assert_eq!(r.end(), now);
    }

    #[test]
    fn test_this_week_on_sunday_is_zero_length() {
        let now = at(2024, 9, 8, 10, 0, 0);
        let r = DateRange::this_week(now);
        assert_eq!(r.start(), now);
        assert_eq!(r.end(), now);
    }

    #[test]
    fn test_last_month_same_day_of_month() {
        let now = at(2024, 9, 11, 15, 30, 0);
        let r = DateRange::last_month(now);
        assert_eq!(r.start(), at(2024, 8, 11, 15, 30, 0));
        assert_eq!(r.end(), now);
    }

    #[test]
    fn test_last_month_clamps_day_of_month() {
        let r = DateRange::last_month(at(2024, 3, 31, 12, 0, 0));
        assert_eq!(r.start(), at(2024, 2, 29, 12, 0, 0));

        let r = DateRange::last_month(at(2023, 3, 31, 12, 0, 0));
        assert_eq!(r.start(), at(2023, 2, 28, 12, 0, 0));
    }

    #[test]
    fn test_recent_spans_five_days() {
        let now = at(2024, 9, 11, 15, 30, 0);
        let r = DateRange::recent(now);
        assert_eq!(r.duration(), Duration::days(5));
        assert_eq!(r.end(), now);
    }

    // ---- Month factories ----

    #[test]
    fn test_month_third_early_september() {
        let r = DateRange::month_third(MonthThird::Early, "september", 2024).unwrap();
        assert_eq!(r.start(), at(2024, 9, 1, 0, 0, 0));
        assert_eq!(r.end().date(), date(2024, 9, 10));
        assert!(r.contains_date(date(2024, 9, 10)));
        assert!(!r.contains_date(date(2024, 9, 11)));
    }

    #[test]
    fn test_month_third_mid() {
        let r = DateRange::month_third(MonthThird::Mid, "June", 2024).unwrap();
        assert_eq!(r.start(), at(2024, 6, 11, 0, 0, 0));
        assert_eq!(r.end().date(), date(2024, 6, 20));
    }

    #[test]
    fn test_month_third_late_february_leap_year() {
        let r = DateRange::month_third(MonthThird::Late, "february", 2024).unwrap();
        assert_eq!(r.start(), at(2024, 2, 21, 0, 0, 0));
        assert_eq!(r.end().date(), date(2024, 2, 29));
    }

    #[test]
    fn test_month_third_late_february_common_year() {
        let r = DateRange::month_third(MonthThird::Late, "february", 2023).unwrap();
        assert_eq!(r.end().date(), date(2023, 2, 28));
    }

    #[test]
    fn test_month_third_late_thirty_and_thirty_one_day_months() {
        let april = DateRange::month_third(MonthThird::Late, "april", 2024).unwrap();
        assert_eq!(april.end().date(), date(2024, 4, 30));
        let december = DateRange::month_third(MonthThird::Late, "december", 2024).unwrap();
        assert_eq!(december.end().date(), date(2024, 12, 31));
    }

    #[test]
    fn test_month_third_invalid_month() {
        let err = DateRange::month_third(MonthThird::Late, "augustus", 2024).unwrap_err();
        assert!(matches!(err, WorklogError::InvalidMonthName(_)));
    }

    #[test]
    fn test_full_month() {
        let r = DateRange::full_month("august", 2024).unwrap();
        assert_eq!(r.start(), at(2024, 8, 1, 0, 0, 0));
        assert_eq!(r.end().date(), date(2024, 8, 31));
        assert!(r.contains_date(date(2024, 8, 31)));
        assert!(!r.contains_date(date(2024, 9, 1)));
    }

    #[test]
    fn test_full_month_february() {
        let leap = DateRange::full_month("February", 2024).unwrap();
        assert_eq!(leap.end().date(), date(2024, 2, 29));
        let common = DateRange::full_month("February", 2100).unwrap();
        assert_eq!(common.end().date(), date(2100, 2, 28));
    }

    #[test]
    fn test_full_month_invalid_month() {
        assert!(matches!(
            DateRange::full_month("", 2024),
            Err(WorklogError::InvalidMonthName(_))
        ));
    }

    #[test]
    fn test_display() {
        let r = DateRange::today(at(2024, 9, 11, 15, 30, 0));
        assert_eq!(r.to_string(), "2024-09-11 00:00:00 .. 2024-09-11 23:59:59");
    }
}
