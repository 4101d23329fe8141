//! Next firing time of a schedule, relative to a caller-supplied `now`.
//!
//! Everything is computed in `now`'s time zone. A local time that falls in
//! a DST gap moves forward to the first valid local time after it.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

use crate::schedule::{Schedule, ScheduleToken};

/// Gaps are probed in these steps, for at most `GAP_PROBES` steps.
const GAP_STEP_MINUTES: i64 = 15;
const GAP_PROBES: i64 = 4 * 24;

impl ScheduleToken {
    pub fn next_occurrence<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        self.schedule.next_occurrence(now)
    }
}

impl Schedule {
    /// The first time at or after which this schedule fires.
    ///
    /// Recurring schedules and bare times return a time strictly after
    /// `now`. Dates (relative, weekday, absolute) return local midnight of
    /// that date, which may lie in the past. Falls back to `now` if no
    /// valid local time can be found.
    pub fn next_occurrence<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        self.try_next(now).unwrap_or_else(|| now.clone())
    }

    fn try_next<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = now.timezone();
        let today = now.date_naive();

        match self {
            Schedule::Relative { day } => {
                let date = today.checked_add_signed(Duration::try_days(day.offset_days())?)?;
                resolve(&tz, date.and_time(NaiveTime::MIN))
            }
            Schedule::Weekday { day } => {
                let ahead = (7 + day.num_days_from_monday() as i64
                    - today.weekday().num_days_from_monday() as i64)
                    % 7;
                let ahead = if ahead == 0 { 7 } else { ahead };
                let date = today.checked_add_days(Days::new(ahead as u64))?;
                resolve(&tz, date.and_time(NaiveTime::MIN))
            }
            Schedule::Date { date } => resolve(&tz, date.and_time(NaiveTime::MIN)),
            Schedule::Offset { minutes } => {
                now.clone().checked_add_signed(Duration::try_minutes(*minutes)?)
            }
            Schedule::Time { time } => next_daily(now, *time),
            Schedule::Daily { time } => next_daily(now, time.unwrap_or(NaiveTime::MIN)),
            Schedule::Weekly { days, time } => {
                let time = time.unwrap_or(NaiveTime::MIN);
                (0..=7)
                    .filter_map(|ahead| today.checked_add_days(Days::new(ahead)))
                    .filter(|date| days.contains(&date.weekday()))
                    .filter_map(|date| resolve(&tz, date.and_time(time)))
                    .find(|candidate| candidate > now)
            }
            Schedule::Monthly { day, time } => {
                let time = time.unwrap_or(NaiveTime::MIN);
                let (year, month) = (today.year(), today.month());
                let this = resolve(&tz, clamped_date(year, month, *day)?.and_time(time))?;
                if this > *now {
                    return Some(this);
                }
                let (year, month) = if month == 12 {
                    (year + 1, 1)
                } else {
                    (year, month + 1)
                };
                resolve(&tz, clamped_date(year, month, *day)?.and_time(time))
            }
            Schedule::Yearly { month, day, time } => {
                let time = time.unwrap_or(NaiveTime::MIN);
                let year = today.year();
                let this = resolve(&tz, clamped_date(year, *month, *day)?.and_time(time))?;
                if this > *now {
                    return Some(this);
                }
                resolve(&tz, clamped_date(year + 1, *month, *day)?.and_time(time))
            }
        }
    }
}

/// Today at `time` if still ahead of `now`, else tomorrow.
fn next_daily<Tz: TimeZone>(now: &DateTime<Tz>, time: NaiveTime) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let today = now.date_naive();
    let candidate = resolve(&tz, today.and_time(time))?;
    if candidate > *now {
        return Some(candidate);
    }
    resolve(&tz, today.checked_add_days(Days::new(1))?.and_time(time))
}

/// `day` of the month, or the month's last day when it is shorter.
fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let day = day.min(days_in_month(year, month)?);
    NaiveDate::from_ymd_opt(year, month, day)
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.signed_duration_since(first).num_days() as u32)
}

/// Map a local wall-clock time into `tz`.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times inside a
/// gap (DST spring-forward) move to the first valid time after the gap.
fn resolve<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    (0..=GAP_PROBES).find_map(|step| {
        let probe = local.checked_add_signed(Duration::try_minutes(step * GAP_STEP_MINUTES)?)?;
        tz.from_local_datetime(&probe).earliest()
    })
}
