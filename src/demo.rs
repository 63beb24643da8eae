//! Demo data: a user tracking every catalog habit with a randomised past.

use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use tracing::info;

use crate::error::{HabitError, Result};
use crate::models::{Habit, User};
use crate::period::PeriodType;
use crate::storage::Storage;

/// Habits created when the catalog is empty, one per period type.
pub const DEFAULT_CATALOG: [(&str, &str, PeriodType); 5] = [
    ("Drink water", "Drink at least two litres of water", PeriodType::Daily),
    ("Exercise", "Work out for at least 30 minutes", PeriodType::Weekly),
    ("Budget review", "Go through last month's spending", PeriodType::Monthly),
    ("Declutter", "Clear out one room completely", PeriodType::Quarterly),
    ("Health check", "Book and attend a general check-up", PeriodType::Annually),
];

/// What [`seed`] changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DemoSummary {
    pub habits_created: usize,
    pub habits_tracked: usize,
    pub completions: usize,
}

/// Seeds `username` with `days` days of history.
///
/// Every catalog habit the user does not track yet is tracked from `days`
/// days before `now`; each elapsed period gets one completion with
/// probability `rate`, at a random instant inside the tracked part of it.
pub fn seed<S: Storage, R: Rng>(
    storage: &mut S,
    username: &str,
    days: i64,
    rate: f64,
    now: NaiveDateTime,
    rng: &mut R,
) -> Result<DemoSummary> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(HabitError::InvalidRate(rate));
    }
    let start = Duration::try_days(days.max(0))
        .and_then(|offset| now.checked_sub_signed(offset))
        .ok_or(HabitError::PeriodOutOfRange(now))?;

    let mut summary = DemoSummary::default();

    let mut user = match storage.get_user(username)? {
        Some(user) => user,
        None => {
            let user = User::new(username);
            storage.insert_user(&user)?;
            user
        }
    };

    let mut catalog = storage.get_all_habits()?;
    if catalog.is_empty() {
        for (name, description, period_type) in DEFAULT_CATALOG {
            let habit = Habit::with_period(name, description, period_type, now);
            storage.insert_habit(&habit)?;
            catalog.push(habit);
            summary.habits_created += 1;
        }
    }

    for habit in catalog {
        if user.tracked(&habit.name).is_some() {
            continue;
        }
        let tracked = user.add_habit(habit, start)?;
        for period in tracked.habit.period_type.periods_since(start, now)? {
            if !rng.gen_bool(rate) {
                continue;
            }
            let from = period.start.max(start);
            let span = (period.end.min(now) - from).num_seconds();
            if span <= 0 {
                continue;
            }
            let at = from + Duration::seconds(rng.gen_range(0..span));
            if tracked.record_completion(at)? {
                summary.completions += 1;
            }
        }
        storage.insert_tracked_habit(tracked)?;
        summary.habits_tracked += 1;
    }
    storage.update_user(&user)?;

    info!(
        user = %username,
        created = summary.habits_created,
        tracked = summary.habits_tracked,
        completions = summary.completions,
        "demo data seeded"
    );
    Ok(summary)
}
