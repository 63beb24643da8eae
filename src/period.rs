//! Calendar-aligned periods.
//!
//! Every habit repeats over one [`PeriodType`]. Periods of a type tile the
//! timeline: each one is a half-open `[start, end)` interval and the next
//! period always starts exactly where the previous one ends.
//!
//! - **Daily**: midnight to midnight.
//! - **Weekly**: Monday 00:00 to the following Monday 00:00.
//! - **Monthly**: the first instant of a month to the first instant of the next.
//! - **Quarterly**: quarters start in January, April, July and October.
//! - **Annually**: January 1st to January 1st.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{HabitError, Result};

/// How often a habit has to be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

/// A half-open interval `[start, end)` of local instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Period {
    /// Whether `t` falls inside this period (start inclusive, end exclusive).
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t < self.end
    }
}

impl PeriodType {
    pub const ALL: [PeriodType; 5] = [
        PeriodType::Daily,
        PeriodType::Weekly,
        PeriodType::Monthly,
        PeriodType::Quarterly,
        PeriodType::Annually,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annually => "annually",
        }
    }

    /// Returns the period of this type that contains `at`.
    pub fn bounds(self, at: NaiveDateTime) -> Result<Period> {
        let date = at.date();
        let start = match self {
            Self::Daily => date.and_time(NaiveTime::MIN),
            Self::Weekly => {
                let back = Duration::days(i64::from(date.weekday().num_days_from_monday()));
                date.checked_sub_signed(back)
                    .ok_or(HabitError::PeriodOutOfRange(at))?
                    .and_time(NaiveTime::MIN)
            }
            Self::Monthly => month_start(date.year(), date.month(), at)?,
            Self::Quarterly => month_start(date.year(), quarter_start_month(date.month()), at)?,
            Self::Annually => month_start(date.year(), 1, at)?,
        };
        Ok(Period { start, end: self.end_of_period_starting(start)? })
    }

    /// Returns the period immediately following the one that ends at `period_end`.
    ///
    /// The next period starts at `period_end` itself; its end is computed from
    /// that boundary rather than by re-deriving bounds from a shifted instant.
    pub fn advance(self, period_end: NaiveDateTime) -> Result<Period> {
        Ok(Period {
            start: period_end,
            end: self.end_of_period_starting(period_end)?,
        })
    }

    /// All periods from the one containing `start` up to the one containing `now`.
    ///
    /// The period containing `start` is always included when `start <= now`;
    /// later periods follow in chronological order while their start is
    /// strictly before `now`.
    pub fn periods_since(self, start: NaiveDateTime, now: NaiveDateTime) -> Result<Vec<Period>> {
        if start > now {
            return Ok(Vec::new());
        }
        let mut current = self.bounds(start)?;
        let mut periods = vec![current];
        loop {
            current = self.advance(current.end)?;
            if current.start >= now {
                break;
            }
            periods.push(current);
        }
        Ok(periods)
    }

    fn end_of_period_starting(self, start: NaiveDateTime) -> Result<NaiveDateTime> {
        let (year, month) = (start.year(), start.month());
        match self {
            Self::Daily => add_days(start, 1),
            Self::Weekly => add_days(start, 7),
            Self::Monthly if month == 12 => month_start(year + 1, 1, start),
            Self::Monthly => month_start(year, month + 1, start),
            Self::Quarterly => match quarter_start_month(month) {
                10 => month_start(year + 1, 1, start),
                q => month_start(year, q + 3, start),
            },
            Self::Annually => month_start(year + 1, 1, start),
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "annually" => Ok(Self::Annually),
            _ => Err(HabitError::InvalidPeriodType(s.to_string())),
        }
    }
}

fn quarter_start_month(month: u32) -> u32 {
    ((month - 1) / 3) * 3 + 1
}

fn month_start(year: i32, month: u32, origin: NaiveDateTime) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.and_time(NaiveTime::MIN))
        .ok_or(HabitError::PeriodOutOfRange(origin))
}

fn add_days(t: NaiveDateTime, days: i64) -> Result<NaiveDateTime> {
    t.checked_add_signed(Duration::days(days))
        .ok_or(HabitError::PeriodOutOfRange(t))
}
