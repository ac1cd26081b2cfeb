//! Logical trading clock.
//!
//! The clock owns simulated time and everything scheduled against it:
//! fixed daily offsets, short/long periodic ticks, and date/year-change
//! notifications. It advances only through [`Clock::on_new_event_time`],
//! called once per externally observed event in non-decreasing order — the
//! dispatcher merge is what makes that precondition hold.
//!
//! Daily callbacks fire exactly once per trading day, in ascending offset
//! order, even when the observed event stream jumps a whole day (or several
//! offsets) at once: the catch-up pass replays them with synthesized
//! timestamps before real time is committed.

pub mod calendar;

pub use calendar::{CutoverCalendar, TradingCalendar, UtcCalendar};

use crate::error::KernelError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Fired at a fixed offset into each trading day; receives the (possibly
/// synthesized) timestamp of the offset.
pub type DailyCallback = Box<dyn FnMut(DateTime<Utc>)>;

/// Fired on recurring short/long ticks; receives the current event time.
pub type PeriodicCallback = Box<dyn FnMut(DateTime<Utc>)>;

/// Fired when the trading date changes; receives the new date.
pub type DateChangeCallback = Box<dyn FnMut(NaiveDate)>;

/// Fired when the trading date crosses a year boundary; receives the new year.
pub type YearChangeCallback = Box<dyn FnMut(i32)>;

/// Which recurring timer a periodic callback attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    Short,
    Long,
}

struct DailyEntry {
    offset_secs: i64,
    callback: DailyCallback,
}

struct PeriodicTimer {
    period_secs: i64,
    last_fired_secs: i64,
    callbacks: Vec<PeriodicCallback>,
}

impl PeriodicTimer {
    fn new(period_secs: i64) -> Self {
        Self { period_secs, last_fired_secs: 0, callbacks: Vec::new() }
    }

    fn is_due(&self, secs_since_midnight: i64) -> bool {
        secs_since_midnight >= self.last_fired_secs + self.period_secs
    }

    /// The last-fired mark jumps to the observed offset rather than
    /// accumulating whole periods, so an event gap spanning several periods
    /// collapses into a single fire.
    fn fire(&mut self, secs_since_midnight: i64, now: DateTime<Utc>) {
        self.last_fired_secs = secs_since_midnight;
        for cb in &mut self.callbacks {
            cb(now);
        }
    }
}

/// Sentinel trading date held until the first event arrives.
fn sentinel_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).expect("static date")
}

pub struct Clock {
    calendar: Box<dyn TradingCalendar>,
    current_time: DateTime<Utc>,
    reference_time: DateTime<Utc>,
    current_date: NaiveDate,
    secs_since_midnight: i64,
    daily: Vec<DailyEntry>,
    /// Entries below the cursor have fired for the current trading day.
    /// Resets to zero only on a trading-date change.
    daily_cursor: usize,
    short: PeriodicTimer,
    long: PeriodicTimer,
    date_change: Vec<DateChangeCallback>,
    year_change: Vec<YearChangeCallback>,
}

impl Clock {
    pub fn new(calendar: Box<dyn TradingCalendar>, short_period_secs: i64, long_period_secs: i64) -> Self {
        Self {
            calendar,
            current_time: DateTime::UNIX_EPOCH,
            reference_time: DateTime::UNIX_EPOCH,
            current_date: sentinel_date(),
            secs_since_midnight: 0,
            daily: Vec::new(),
            daily_cursor: 0,
            short: PeriodicTimer::new(short_period_secs),
            long: PeriodicTimer::new(long_period_secs),
            date_change: Vec::new(),
            year_change: Vec::new(),
        }
    }

    pub fn current_time(&self) -> DateTime<Utc> {
        self.current_time
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn reference_time(&self) -> DateTime<Utc> {
        self.reference_time
    }

    pub fn secs_since_midnight(&self) -> i64 {
        self.secs_since_midnight
    }

    /// Register a callback for a fixed offset (seconds past the trading-day
    /// reference time) on every trading day.
    ///
    /// Insertion keeps the schedule sorted ascending by offset. At equal
    /// offsets the newest registration is placed ahead of older ones, so
    /// later registrations fire first among ties; downstream schedules may
    /// rely on that order, so it is pinned by a test.
    ///
    /// The cursor advances with each registration: entries registered before
    /// the first event are treated as already fired for the sentinel day and
    /// start firing from the first real trading date.
    pub fn register_daily(&mut self, offset_secs: i64, callback: DailyCallback) {
        let idx = self
            .daily
            .iter()
            .position(|e| e.offset_secs >= offset_secs)
            .unwrap_or(self.daily.len());
        self.daily.insert(idx, DailyEntry { offset_secs, callback });
        self.daily_cursor += 1;
    }

    pub fn register_periodic(&mut self, kind: PeriodKind, callback: PeriodicCallback) {
        match kind {
            PeriodKind::Short => self.short.callbacks.push(callback),
            PeriodKind::Long => self.long.callbacks.push(callback),
        }
    }

    pub fn register_date_change(&mut self, callback: DateChangeCallback) {
        self.date_change.push(callback);
    }

    pub fn register_year_change(&mut self, callback: YearChangeCallback) {
        self.year_change.push(callback);
    }

    /// Sole time-advancing entry point. Called once per observed event, in
    /// non-decreasing time order; fires all callbacks that became due before
    /// committing `t` as the current time.
    ///
    /// Returns the new trading date when the call crossed a date boundary,
    /// so the owner can refresh per-day state it holds outside the clock.
    pub fn on_new_event_time(&mut self, t: DateTime<Utc>) -> Result<Option<NaiveDate>, KernelError> {
        if t < self.current_time {
            return Err(KernelError::TimeReversal { current: self.current_time, observed: t });
        }

        let new_date = self.calendar.trading_date_of(t);
        let date_changed = new_date != self.current_date;
        let new_reference = if date_changed {
            self.calendar.reference_time_of(t)
        } else {
            self.reference_time
        };
        let new_secs = (t - new_reference).num_seconds();

        if date_changed {
            // Yesterday's remaining schedule fires against the old reference
            // time before the new date is visible anywhere.
            self.replay_pending_daily();
            self.daily_cursor = 0;

            let year_changed = self.current_date.year() != new_date.year();
            self.current_date = new_date;
            self.reference_time = new_reference;
            self.current_time = new_reference;
            self.secs_since_midnight = 0;
            self.short.last_fired_secs = 0;
            self.long.last_fired_secs = 0;

            for cb in &mut self.date_change {
                cb(new_date);
            }
            if year_changed {
                let year = new_date.year();
                for cb in &mut self.year_change {
                    cb(year);
                }
            }
        }

        // Catch up on offsets the observed gap jumped past.
        self.fire_daily_before(new_secs);

        self.secs_since_midnight = new_secs;
        self.current_time = t;

        if self.short.is_due(new_secs) {
            self.short.fire(new_secs, t);
        }
        if self.long.is_due(new_secs) {
            self.long.fire(new_secs, t);
        }
        Ok(if date_changed { Some(new_date) } else { None })
    }

    /// Fire any daily callbacks never reached because no further events
    /// arrived. Call once when the simulation ends.
    pub fn flush_pending_daily(&mut self) {
        self.replay_pending_daily();
    }

    /// Fire scheduled entries with offsets strictly below `limit_secs`,
    /// synthesizing their timestamps off the current reference time.
    fn fire_daily_before(&mut self, limit_secs: i64) {
        while self.daily_cursor < self.daily.len() {
            let offset = self.daily[self.daily_cursor].offset_secs;
            if offset >= limit_secs {
                break;
            }
            let synthesized = self.reference_time + Duration::seconds(offset);
            self.secs_since_midnight = offset;
            self.current_time = synthesized;
            (self.daily[self.daily_cursor].callback)(synthesized);
            self.daily_cursor += 1;
        }
    }

    /// Drain every not-yet-fired entry regardless of offset. The timestamps
    /// are synthesized, not observed from market data.
    fn replay_pending_daily(&mut self) {
        while self.daily_cursor < self.daily.len() {
            let offset = self.daily[self.daily_cursor].offset_secs;
            let synthesized = self.reference_time + Duration::seconds(offset);
            self.secs_since_midnight = offset;
            self.current_time = synthesized;
            (self.daily[self.daily_cursor].callback)(synthesized);
            self.daily_cursor += 1;
        }
    }
}
