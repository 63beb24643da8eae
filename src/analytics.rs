use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::Result;
use crate::models::{Habit, HistoryEntry, TrackedHabit, User};
use crate::period::PeriodType;

/// Length of the longest run of consecutive completed periods.
pub fn longest_streak(history: &[HistoryEntry]) -> u32 {
    let mut longest = 0;
    let mut running = 0;
    for entry in history {
        if entry.completed {
            running += 1;
        } else {
            longest = longest.max(running);
            running = 0;
        }
    }
    longest.max(running)
}

/// Number of consecutive completed periods ending at the latest settled period.
///
/// An incomplete final entry is the still-open current period and does not
/// break the streak.
pub fn current_streak(history: &[HistoryEntry]) -> u32 {
    let settled = match history.split_last() {
        Some((last, rest)) if !last.completed => rest,
        _ => history,
    };
    settled
        .iter()
        .rev()
        .take_while(|entry| entry.completed)
        .count() as u32
}

/// How far along a streak is, for highlighting in tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakLevel {
    Broken,
    Building,
    Strong,
}

impl StreakLevel {
    pub fn of(streak: u32) -> Self {
        match streak {
            0 => Self::Broken,
            1..=2 => Self::Building,
            _ => Self::Strong,
        }
    }
}

/// Current streak of a single tracked habit as of `now`.
pub fn current_streak_for(tracked: &TrackedHabit, now: NaiveDateTime) -> Result<u32> {
    Ok(current_streak(&tracked.completion_history(now)?))
}

/// Longest streak of a single tracked habit as of `now`.
pub fn longest_streak_for(tracked: &TrackedHabit, now: NaiveDateTime) -> Result<u32> {
    Ok(longest_streak(&tracked.completion_history(now)?))
}

/// Every tracked habit with its current streak, in tracking order.
pub fn all_tracked_with_streak(user: &User, now: NaiveDateTime) -> Result<Vec<(&Habit, u32)>> {
    streaks_where(user, now, |_| true)
}

/// Like [`all_tracked_with_streak`], restricted to habits of one period type.
pub fn all_tracked_with_streak_for_period_type(
    user: &User,
    period_type: PeriodType,
    now: NaiveDateTime,
) -> Result<Vec<(&Habit, u32)>> {
    streaks_where(user, now, |h| h.period_type == period_type)
}

/// The habit with the longest streak ever, or `(None, 0)` when nothing qualifies.
///
/// The first habit reaching the maximum wins ties.
pub fn longest_overall(user: &User, now: NaiveDateTime) -> Result<(Option<&Habit>, u32)> {
    best_by(user, now, longest_streak)
}

/// The habit with the longest current streak, or `(None, 0)` when nothing qualifies.
pub fn longest_current(user: &User, now: NaiveDateTime) -> Result<(Option<&Habit>, u32)> {
    best_by(user, now, current_streak)
}

fn streaks_where<'a>(
    user: &'a User,
    now: NaiveDateTime,
    keep: impl Fn(&Habit) -> bool,
) -> Result<Vec<(&'a Habit, u32)>> {
    user.habits
        .iter()
        .filter(|tracked| keep(&tracked.habit))
        .map(|tracked| Ok((&tracked.habit, current_streak_for(tracked, now)?)))
        .collect()
}

fn best_by(
    user: &User,
    now: NaiveDateTime,
    measure: fn(&[HistoryEntry]) -> u32,
) -> Result<(Option<&Habit>, u32)> {
    let mut best: (Option<&Habit>, u32) = (None, 0);
    for tracked in &user.habits {
        let streak = measure(&tracked.completion_history(now)?);
        if streak > best.1 {
            best = (Some(&tracked.habit), streak);
        }
    }
    debug!(user = %user.username, habit = ?best.0.map(|h| &h.name), streak = best.1, "best streak");
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Period;
    use chrono::{Duration, NaiveDate};

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn history(flags: &[bool]) -> Vec<HistoryEntry> {
        flags
            .iter()
            .enumerate()
            .map(|(i, &completed)| {
                let start = day(1) + Duration::days(i as i64);
                HistoryEntry {
                    period: Period { start, end: start + Duration::days(1) },
                    completed,
                }
            })
            .collect()
    }

    fn tracked(name: &str, period: &str, start: NaiveDateTime, done: &[u32]) -> TrackedHabit {
        let habit = Habit::new(name, "", period, start).unwrap();
        let mut t = TrackedHabit::new(habit, start);
        for d in done {
            assert!(t.record_completion(day(*d) + Duration::hours(9)).unwrap());
        }
        t
    }

    #[test]
    fn streak_levels() {
        assert_eq!(StreakLevel::of(0), StreakLevel::Broken);
        assert_eq!(StreakLevel::of(2), StreakLevel::Building);
        assert_eq!(StreakLevel::of(3), StreakLevel::Strong);
    }

    #[test]
    fn streaks_over_mixed_history() {
        let h = history(&[true, true, true, false, true, true]);
        assert_eq!(longest_streak(&h), 3);
        assert_eq!(current_streak(&h), 2);
    }

    #[test]
    fn open_period_does_not_break_current_streak() {
        let h = history(&[false, true, true, false]);
        assert_eq!(current_streak(&h), 2);
        // a settled gap does
        let h = history(&[true, true, false, false]);
        assert_eq!(current_streak(&h), 0);
    }

    #[test]
    fn completed_open_period_counts() {
        let h = history(&[false, true, true]);
        assert_eq!(current_streak(&h), 2);
        assert_eq!(longest_streak(&h), 2);
    }

    #[test]
    fn empty_and_all_false_histories() {
        assert_eq!(current_streak(&[]), 0);
        assert_eq!(longest_streak(&[]), 0);
        let h = history(&[false, false, false]);
        assert_eq!(current_streak(&h), 0);
        assert_eq!(longest_streak(&h), 0);
    }

    #[test]
    fn fresh_habit_has_no_streak() {
        let now = day(10) + Duration::hours(12);
        let t = tracked("Run", "daily", now, &[]);
        assert_eq!(current_streak_for(&t, now).unwrap(), 0);
        assert_eq!(longest_streak_for(&t, now).unwrap(), 0);
    }

    #[test]
    fn user_without_habits() {
        let user = User::new("nobody");
        let now = day(10);
        assert_eq!(longest_overall(&user, now).unwrap(), (None, 0));
        assert_eq!(longest_current(&user, now).unwrap(), (None, 0));
        assert!(all_tracked_with_streak(&user, now).unwrap().is_empty());
    }

    #[test]
    fn cross_habit_analytics() {
        let now = day(10) + Duration::hours(12);
        let mut user = User::new("alice");
        // longest 4 (1-4), current 2 (8-9)
        user.habits.push(tracked("Run", "daily", day(1), &[1, 2, 3, 4, 8, 9]));
        // longest 4 (7-10), today already done so current is 4 too
        user.habits.push(tracked("Read", "daily", day(1), &[7, 8, 9, 10]));
        // weekly, never done
        user.habits.push(tracked("Clean", "weekly", day(1), &[]));

        let all = all_tracked_with_streak(&user, now).unwrap();
        let names: Vec<(&str, u32)> = all.iter().map(|(h, s)| (h.name.as_str(), *s)).collect();
        assert_eq!(names, vec![("Run", 2), ("Read", 4), ("Clean", 0)]);

        let weekly = all_tracked_with_streak_for_period_type(&user, PeriodType::Weekly, now).unwrap();
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].0.name, "Clean");

        let (habit, streak) = longest_overall(&user, now).unwrap();
        assert_eq!((habit.map(|h| h.name.as_str()), streak), (Some("Run"), 4));

        let (habit, streak) = longest_current(&user, now).unwrap();
        assert_eq!((habit.map(|h| h.name.as_str()), streak), (Some("Read"), 4));
    }

    #[test]
    fn ties_go_to_first_habit() {
        let now = day(5) + Duration::hours(12);
        let mut user = User::new("alice");
        user.habits.push(tracked("A", "daily", day(1), &[1, 2]));
        user.habits.push(tracked("B", "daily", day(1), &[3, 4]));
        let (habit, streak) = longest_overall(&user, now).unwrap();
        assert_eq!(habit.unwrap().name, "A");
        assert_eq!(streak, 2);
    }
}
