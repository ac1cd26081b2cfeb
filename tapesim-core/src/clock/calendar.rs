//! Trading-day oracle.
//!
//! The kernel never does timezone arithmetic itself. It asks a
//! [`TradingCalendar`] which trading date a timestamp belongs to and where
//! that trading day's reference time (its "midnight") sits. Real venue
//! calendars (DST-aware cutovers, holidays) live outside the kernel; the
//! impls here are deliberately simple fixed-rule stand-ins.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Pure-function contract mapping wall-clock time onto trading days.
///
/// Required coherence: `reference_time_of(t) <= t`, and `trading_date_of`
/// is constant over `[reference_time_of(t), next reference time)`.
pub trait TradingCalendar {
    /// The trading date `t` falls in.
    fn trading_date_of(&self, t: DateTime<Utc>) -> NaiveDate;

    /// Start-of-trading-day timestamp for the trading day containing `t`.
    fn reference_time_of(&self, t: DateTime<Utc>) -> DateTime<Utc>;
}

/// Calendar days bounded at midnight UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtcCalendar;

impl TradingCalendar for UtcCalendar {
    fn trading_date_of(&self, t: DateTime<Utc>) -> NaiveDate {
        t.date_naive()
    }

    fn reference_time_of(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        Utc.from_utc_datetime(&t.date_naive().and_time(NaiveTime::MIN))
    }
}

/// Trading day that cuts over at a fixed UTC wall time instead of midnight:
/// everything at or after the cutover belongs to the *next* calendar date.
///
/// This is the shape of the classic "6PM EST yesterday to 4PM EST today is
/// today" equity rule, minus the DST handling a production calendar needs.
#[derive(Debug, Clone, Copy)]
pub struct CutoverCalendar {
    cutover: NaiveTime,
}

impl CutoverCalendar {
    pub fn new(cutover: NaiveTime) -> Self {
        Self { cutover }
    }
}

impl TradingCalendar for CutoverCalendar {
    fn trading_date_of(&self, t: DateTime<Utc>) -> NaiveDate {
        let date = t.date_naive();
        if t.time() >= self.cutover {
            date + Duration::days(1)
        } else {
            date
        }
    }

    fn reference_time_of(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let start = self.trading_date_of(t) - Duration::days(1);
        Utc.from_utc_datetime(&start.and_time(self.cutover))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn utc_calendar_maps_to_calendar_day() {
        let cal = UtcCalendar;
        let t = ts(2024, 3, 5, 23, 59);
        assert_eq!(cal.trading_date_of(t), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(cal.reference_time_of(t), ts(2024, 3, 5, 0, 0));
    }

    #[test]
    fn cutover_rolls_evening_into_next_date() {
        // 22:30 UTC cutover, roughly the 17:30 EST overnight session start.
        let cal = CutoverCalendar::new(NaiveTime::from_hms_opt(22, 30, 0).unwrap());

        // Before the cutover: same calendar date, reference on the prior evening.
        let morning = ts(2024, 1, 2, 14, 30);
        assert_eq!(cal.trading_date_of(morning), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(cal.reference_time_of(morning), ts(2024, 1, 1, 22, 30));

        // At/after the cutover: next trading date begins.
        let evening = ts(2024, 1, 2, 22, 30);
        assert_eq!(cal.trading_date_of(evening), NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(cal.reference_time_of(evening), ts(2024, 1, 2, 22, 30));
    }

    #[test]
    fn reference_never_exceeds_timestamp() {
        let cal = CutoverCalendar::new(NaiveTime::from_hms_opt(22, 30, 0).unwrap());
        for hour in 0..24 {
            let t = ts(2024, 6, 15, hour, 0);
            assert!(cal.reference_time_of(t) <= t, "hour {hour}");
        }
    }
}
