//! `@token` schedule annotations and the imperative sentences that use them.
//!
//! Tokens are recognized in prose only. The scanner in [`scan`] takes the
//! classifier's code ranges and never looks inside them.

pub mod imperative;
pub mod occurrence;
pub mod scan;

use std::fmt;

use chrono::{NaiveDate, NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

pub use imperative::{Imperative, ImperativeAction, ImperativeKind};
pub use scan::{ScanOutput, scan};

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());
static TIME_12H: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})(?::(\d{2}))?(am|pm)$").unwrap());
static TIME_24H: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap());
static OFFSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)(minutes?|mins?|m|hours?|hrs?|h|days?|d|weeks?|w)$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelativeDay {
    Yesterday,
    Today,
    Tomorrow,
}

impl RelativeDay {
    pub fn offset_days(&self) -> i64 {
        match self {
            RelativeDay::Yesterday => -1,
            RelativeDay::Today => 0,
            RelativeDay::Tomorrow => 1,
        }
    }
}

/// When a token fires. Times are local wall-clock times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Schedule {
    /// Every day, at midnight when no time is given.
    Daily { time: Option<NaiveTime> },
    Weekly {
        days: Vec<Weekday>,
        time: Option<NaiveTime>,
    },
    /// `day` is 1..=31 and clamps to the last day of shorter months.
    Monthly { day: u32, time: Option<NaiveTime> },
    Yearly {
        month: u32,
        day: u32,
        time: Option<NaiveTime>,
    },
    Relative { day: RelativeDay },
    Weekday { day: Weekday },
    Date { date: NaiveDate },
    Time { time: NaiveTime },
    Offset { minutes: i64 },
}

/// The fieldless kind of a [`Schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Relative,
    Weekday,
    AbsoluteDate,
    TimeOnly,
    Offset,
}

impl Schedule {
    pub fn kind(&self) -> TokenKind {
        match self {
            Schedule::Daily { .. } => TokenKind::Daily,
            Schedule::Weekly { .. } => TokenKind::Weekly,
            Schedule::Monthly { .. } => TokenKind::Monthly,
            Schedule::Yearly { .. } => TokenKind::Yearly,
            Schedule::Relative { .. } => TokenKind::Relative,
            Schedule::Weekday { .. } => TokenKind::Weekday,
            Schedule::Date { .. } => TokenKind::AbsoluteDate,
            Schedule::Time { .. } => TokenKind::TimeOnly,
            Schedule::Offset { .. } => TokenKind::Offset,
        }
    }

    /// Whether the schedule repeats.
    pub fn is_recurring(&self) -> bool {
        matches!(
            self,
            Schedule::Daily { .. }
                | Schedule::Weekly { .. }
                | Schedule::Monthly { .. }
                | Schedule::Yearly { .. }
        )
    }
}

/// A recognized `@token` in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleToken {
    /// Token text as written, `@` included.
    pub raw: String,
    /// 1-indexed file line.
    pub line: usize,
    /// 1-indexed byte column of the `@`.
    pub column: usize,
    pub schedule: Schedule,
}

impl ScheduleToken {
    pub fn kind(&self) -> TokenKind {
        self.schedule.kind()
    }
}

/// A non-fatal problem found while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleWarning {
    pub raw: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for ScheduleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}:{}: {}", self.line, self.column, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("schedule token must start with `@`")]
    MissingAt,
    #[error("empty schedule token")]
    Empty,
    #[error("unrecognized schedule token `{0}`")]
    Unrecognized(String),
    #[error("invalid {what} in schedule token `{token}`")]
    Invalid { token: String, what: &'static str },
}

/// Parse one token, `@` included. Keywords are case-insensitive.
pub fn parse_token(raw: &str) -> Result<Schedule, TokenError> {
    let body = raw.strip_prefix('@').ok_or(TokenError::MissingAt)?;
    if body.is_empty() {
        return Err(TokenError::Empty);
    }
    let lower = body.to_ascii_lowercase();
    let invalid = |what| TokenError::Invalid {
        token: raw.to_string(),
        what,
    };

    if let Some(day) = relative_day(&lower) {
        return Ok(Schedule::Relative { day });
    }
    if let Some(day) = weekday(&lower) {
        return Ok(Schedule::Weekday { day });
    }
    if let Some(caps) = ISO_DATE.captures(&lower) {
        let date = caps[1]
            .parse()
            .ok()
            .zip(caps[2].parse().ok())
            .zip(caps[3].parse().ok())
            .and_then(|((y, m), d)| NaiveDate::from_ymd_opt(y, m, d))
            .ok_or_else(|| invalid("date"))?;
        return Ok(Schedule::Date { date });
    }
    if let Some(time) = time_of_day(&lower) {
        return Ok(Schedule::Time { time });
    }
    if lower == "daily" {
        return Ok(Schedule::Daily { time: None });
    }

    let Some((prefix, args)) = lower.split_once(':') else {
        return Err(TokenError::Unrecognized(raw.to_string()));
    };

    match prefix {
        "daily" => {
            let time = time_of_day(args).ok_or_else(|| invalid("time"))?;
            Ok(Schedule::Daily { time: Some(time) })
        }
        "weekly" => {
            let (days, time) = split_time(args).ok_or_else(|| invalid("time"))?;
            let days = days
                .split(',')
                .map(|name| weekday(name.trim()))
                .collect::<Option<Vec<_>>>()
                .filter(|days| !days.is_empty())
                .ok_or_else(|| invalid("weekday list"))?;
            Ok(Schedule::Weekly { days, time })
        }
        "monthly" => {
            let (day, time) = split_time(args).ok_or_else(|| invalid("time"))?;
            let day = day_of_month(day).ok_or_else(|| invalid("day of month"))?;
            Ok(Schedule::Monthly { day, time })
        }
        "yearly" => {
            let (date, time) = split_time(args).ok_or_else(|| invalid("time"))?;
            let (month, day) = date
                .split_once('-')
                .and_then(|(m, d)| Some((month(m)?, d.parse::<u32>().ok()?)))
                .filter(|(_, d)| (1..=31).contains(d))
                .ok_or_else(|| invalid("month-day"))?;
            Ok(Schedule::Yearly { month, day, time })
        }
        "in" => {
            let minutes = offset_minutes(args).ok_or_else(|| invalid("offset"))?;
            Ok(Schedule::Offset { minutes })
        }
        _ => Err(TokenError::Unrecognized(raw.to_string())),
    }
}

fn relative_day(s: &str) -> Option<RelativeDay> {
    match s {
        "today" => Some(RelativeDay::Today),
        "tomorrow" => Some(RelativeDay::Tomorrow),
        "yesterday" => Some(RelativeDay::Yesterday),
        _ => None,
    }
}

fn weekday(s: &str) -> Option<Weekday> {
    let day = match s {
        "mon" | "monday" => Weekday::Mon,
        "tue" | "tuesday" => Weekday::Tue,
        "wed" | "wednesday" => Weekday::Wed,
        "thu" | "thursday" => Weekday::Thu,
        "fri" | "friday" => Weekday::Fri,
        "sat" | "saturday" => Weekday::Sat,
        "sun" | "sunday" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

fn month(s: &str) -> Option<u32> {
    const NAMES: [&str; 12] = [
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
    if let Ok(number) = s.parse::<u32>() {
        return (1..=12).contains(&number).then_some(number);
    }
    NAMES
        .iter()
        .position(|name| s == *name || (s.len() == 3 && name.starts_with(s)))
        .map(|index| index as u32 + 1)
}

/// `9am`, `9:30pm`, `12am` (midnight), `14:00`.
fn time_of_day(s: &str) -> Option<NaiveTime> {
    if let Some(caps) = TIME_12H.captures(s) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        if !(1..=12).contains(&hour) {
            return None;
        }
        let hour = match (&caps[3], hour) {
            ("am", 12) => 0,
            ("am", h) => h,
            ("pm", 12) => 12,
            (_, h) => h + 12,
        };
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }
    let caps = TIME_24H.captures(s)?;
    NaiveTime::from_hms_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, 0)
}

/// Split `args[:time]`. `None` only when a time part is present and invalid.
fn split_time(args: &str) -> Option<(&str, Option<NaiveTime>)> {
    match args.split_once(':') {
        Some((head, time)) => Some((head, Some(time_of_day(time)?))),
        None => Some((args, None)),
    }
}

/// `1`, `1st`, `22nd`, `23rd`, `15th`.
fn day_of_month(s: &str) -> Option<u32> {
    let digits = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| s.strip_suffix(suffix))
        .unwrap_or(s);
    let day: u32 = digits.parse().ok()?;
    (1..=31).contains(&day).then_some(day)
}

fn offset_minutes(s: &str) -> Option<i64> {
    let caps = OFFSET.captures(s)?;
    let value: i64 = caps[1].parse().ok()?;
    let per_unit = match caps[2].chars().next()? {
        'm' => 1,
        'h' => 60,
        'd' => 60 * 24,
        'w' => 60 * 24 * 7,
        _ => return None,
    };
    value.checked_mul(per_unit)
}
