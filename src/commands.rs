use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use tracing::info;

use crate::analytics::{
    all_tracked_with_streak, all_tracked_with_streak_for_period_type, current_streak,
    current_streak_for, longest_current, longest_overall, longest_streak, longest_streak_for,
    StreakLevel,
};
use crate::error::{HabitError, Result};
use crate::models::{Habit, TrackedHabit, User};
use crate::period::{Period, PeriodType};
use crate::storage::Storage;

/// Loads `username` or fails with a not-found error.
pub fn load_user<S: Storage>(storage: &S, username: &str) -> Result<User> {
    storage
        .get_user(username)?
        .ok_or_else(|| HabitError::not_found("User", username))
}

fn tracked_or_err<'a>(user: &'a User, habit_name: &str) -> Result<&'a TrackedHabit> {
    user.tracked(habit_name).ok_or_else(|| HabitError::NotTracked {
        habit: habit_name.to_string(),
        user: user.username.clone(),
    })
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| HabitError::InvalidDate(input.to_string()))
}

/// The instant to record for a completion entered for `date`, or `now` if no date was given.
///
/// Future dates and dates before tracking started are rejected. A date on the
/// day tracking started resolves to the tracking start itself.
pub fn completion_time_for(
    date: Option<NaiveDate>,
    tracked: &TrackedHabit,
    now: NaiveDateTime,
) -> Result<NaiveDateTime> {
    let Some(date) = date else {
        return Ok(now);
    };
    if date > now.date() {
        return Err(HabitError::CompletionInFuture(date));
    }
    if date < tracked.creation_time.date() {
        return Err(HabitError::CompletionBeforeStart {
            date,
            start: tracked.creation_time,
        });
    }
    Ok(date.and_time(NaiveTime::MIN).max(tracked.creation_time))
}

/// Short human label for a period, e.g. `2024-W37` or `2024-Q3`.
pub fn period_label(period_type: PeriodType, period: &Period) -> String {
    let start = period.start;
    match period_type {
        PeriodType::Daily => start.format("%Y-%m-%d").to_string(),
        PeriodType::Weekly => {
            let iso = start.iso_week();
            format!("{}-W{:02}", iso.year(), iso.week())
        }
        PeriodType::Monthly => start.format("%Y-%m").to_string(),
        PeriodType::Quarterly => format!("{}-Q{}", start.year(), (start.month() - 1) / 3 + 1),
        PeriodType::Annually => start.year().to_string(),
    }
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).add_attribute(Attribute::Bold))
        .collect()
}

fn new_table(titles: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(titles));
    table
}

fn streak_color(streak: u32) -> Color {
    match StreakLevel::of(streak) {
        StreakLevel::Broken => Color::Grey,
        StreakLevel::Building => Color::Yellow,
        StreakLevel::Strong => Color::Green,
    }
}

/// Creates a new user account.
pub fn cmd_user_add<S: Storage>(storage: &mut S, username: &str) -> Result<()> {
    if !storage.insert_user(&User::new(username))? {
        return Err(HabitError::already_exists("User", username));
    }
    println!("User '{}' created.", username);
    Ok(())
}

/// Deletes a user account together with all of its tracking records.
pub fn cmd_user_remove<S: Storage>(storage: &mut S, username: &str) -> Result<()> {
    let user = load_user(storage, username)?;
    for tracked in &user.habits {
        if !storage.delete_tracked_habit(tracked)? {
            return Err(HabitError::not_found("Tracked habit", &tracked.tracking_id));
        }
    }
    if !storage.delete_user(&user)? {
        return Err(HabitError::not_found("User", username));
    }
    println!("User '{}' removed.", username);
    Ok(())
}

/// Creates a habit definition and stores it in the catalog.
pub fn create_habit<S: Storage>(
    storage: &mut S,
    name: &str,
    description: &str,
    period: &str,
    now: NaiveDateTime,
) -> Result<Habit> {
    let habit = Habit::new(name, description, period, now)?;
    if !storage.insert_habit(&habit)? {
        return Err(HabitError::already_exists("Habit", name));
    }
    Ok(habit)
}

/// Changes the task description of a habit definition.
pub fn edit_habit_description<S: Storage>(
    storage: &mut S,
    name: &str,
    description: &str,
) -> Result<()> {
    let mut habit = storage
        .get_habit(name)?
        .ok_or_else(|| HabitError::not_found("Habit", name))?;
    habit.task_description = description.to_string();
    if !storage.update_habit(&habit)? {
        return Err(HabitError::not_found("Habit", name));
    }
    Ok(())
}

/// Deletes a habit definition, unless some user still tracks it.
pub fn delete_habit<S: Storage>(storage: &mut S, name: &str) -> Result<()> {
    let habit = storage
        .get_habit(name)?
        .ok_or_else(|| HabitError::not_found("Habit", name))?;
    let in_use = storage
        .get_all_tracked_habits()?
        .iter()
        .any(|t| t.habit.name == habit.name);
    if in_use {
        return Err(HabitError::HabitInUse(habit.name));
    }
    if !storage.delete_habit(&habit)? {
        return Err(HabitError::not_found("Habit", name));
    }
    Ok(())
}

/// Starts tracking the catalog habit `habit_name` for `user` at `now`.
pub fn track_habit<S: Storage>(
    storage: &mut S,
    user: &mut User,
    habit_name: &str,
    now: NaiveDateTime,
) -> Result<()> {
    let habit = storage
        .get_habit(habit_name)?
        .ok_or_else(|| HabitError::not_found("Habit", habit_name))?;
    let tracked = user.add_habit(habit, now)?.clone();
    if !storage.insert_tracked_habit(&tracked)? {
        return Err(HabitError::already_exists("Tracked habit", &tracked.tracking_id));
    }
    if !storage.update_user(user)? {
        // the user is gone, so the new record would be orphaned
        storage.delete_tracked_habit(&tracked)?;
        return Err(HabitError::not_found("User", &user.username));
    }
    Ok(())
}

/// Stops tracking `habit_name` for `user`, dropping its completions.
pub fn untrack_habit<S: Storage>(storage: &mut S, user: &mut User, habit_name: &str) -> Result<()> {
    let removed = user.remove_habit(habit_name)?;
    if !storage.delete_tracked_habit(&removed)? {
        return Err(HabitError::not_found("Tracked habit", habit_name));
    }
    if !storage.update_user(user)? {
        return Err(HabitError::not_found("User", &user.username));
    }
    Ok(())
}

/// Records a completion of `habit_name`, at `now` or on `date`, and persists it.
///
/// Returns `Ok(false)` if the period was already completed.
pub fn complete_habit<S: Storage>(
    storage: &mut S,
    user: &mut User,
    habit_name: &str,
    date: Option<NaiveDate>,
    now: NaiveDateTime,
) -> Result<bool> {
    let username = user.username.clone();
    let tracked = user
        .tracked_mut(habit_name)
        .ok_or_else(|| HabitError::NotTracked {
            habit: habit_name.to_string(),
            user: username,
        })?;
    let at = completion_time_for(date, tracked, now)?;
    if !tracked.record_completion(at)? {
        return Ok(false);
    }
    if !storage.update_tracked_habit(tracked)? {
        return Err(HabitError::not_found("Tracked habit", habit_name));
    }
    info!(habit = %habit_name, at = %at, "completion recorded");
    Ok(true)
}

/// Adds a new habit definition to the catalog.
pub fn cmd_habit_add<S: Storage>(
    storage: &mut S,
    name: &str,
    description: &str,
    period: &str,
    now: NaiveDateTime,
) -> Result<()> {
    let habit = create_habit(storage, name, description, period, now)?;
    println!("Habit '{}' ({}) created.", habit.name, habit.period_type);
    Ok(())
}

/// Changes the task description of a habit definition.
pub fn cmd_habit_edit<S: Storage>(storage: &mut S, name: &str, description: &str) -> Result<()> {
    edit_habit_description(storage, name, description)?;
    println!("Habit '{}' updated.", name);
    Ok(())
}

/// Deletes a habit definition nobody tracks anymore.
pub fn cmd_habit_remove<S: Storage>(storage: &mut S, name: &str) -> Result<()> {
    delete_habit(storage, name)?;
    println!("Habit '{}' removed.", name);
    Ok(())
}

/// Lists the habit catalog.
pub fn cmd_habit_list<S: Storage>(storage: &S) -> Result<()> {
    let habits = storage.get_all_habits()?;
    if habits.is_empty() {
        println!("No habits found.");
        return Ok(());
    }
    let mut table = new_table(&["Name", "Period", "Description", "Created"]);
    for h in habits {
        table.add_row(vec![
            Cell::new(&h.name),
            Cell::new(h.period_type),
            Cell::new(&h.task_description),
            Cell::new(h.creation_time.format("%Y-%m-%d")),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Starts tracking a catalog habit for `username`.
pub fn cmd_track<S: Storage>(
    storage: &mut S,
    username: &str,
    habit_name: &str,
    now: NaiveDateTime,
) -> Result<()> {
    let mut user = load_user(storage, username)?;
    track_habit(storage, &mut user, habit_name, now)?;
    println!("{} added to tracking.", habit_name);
    Ok(())
}

/// Stops tracking a habit for `username`.
pub fn cmd_untrack<S: Storage>(storage: &mut S, username: &str, habit_name: &str) -> Result<()> {
    let mut user = load_user(storage, username)?;
    untrack_habit(storage, &mut user, habit_name)?;
    println!("{} removed from tracking.", habit_name);
    Ok(())
}

/// Marks a tracked habit as completed, today or on `date` (YYYY-MM-DD).
///
/// Returns `Ok(false)` if the period was already completed.
pub fn cmd_complete<S: Storage>(
    storage: &mut S,
    username: &str,
    habit_name: &str,
    date: Option<&str>,
    now: NaiveDateTime,
) -> Result<bool> {
    let mut user = load_user(storage, username)?;
    let date = date.map(parse_date).transpose()?;
    if !complete_habit(storage, &mut user, habit_name, date, now)? {
        println!("{} was already completed for this period.", habit_name);
        return Ok(false);
    }
    match date {
        Some(d) => println!("{} marked as completed for {}.", habit_name, d),
        None => println!("{} marked as completed for today.", habit_name),
    }
    Ok(true)
}

/// Lists tracked habits with their current streak, optionally for one period type.
pub fn cmd_streaks<S: Storage>(
    storage: &S,
    username: &str,
    period: Option<&str>,
    now: NaiveDateTime,
) -> Result<()> {
    let user = load_user(storage, username)?;
    let streaks = match period {
        Some(p) => all_tracked_with_streak_for_period_type(&user, p.parse()?, now)?,
        None => all_tracked_with_streak(&user, now)?,
    };
    if streaks.is_empty() {
        match period {
            Some(p) => println!("No {} habits found for user.", p),
            None => println!("No habits found for user."),
        }
        return Ok(());
    }
    let mut table = new_table(&["Habit", "Period", "Current Streak"]);
    for (habit, streak) in streaks {
        table.add_row(vec![
            Cell::new(&habit.name),
            Cell::new(habit.period_type),
            Cell::new(streak).fg(streak_color(streak)),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn print_best(best: (Option<&Habit>, u32)) {
    match best {
        (Some(habit), streak) => println!("{} ({}): {}", habit.name, habit.period_type, streak),
        (None, _) => println!("No habits with a streak found for user."),
    }
}

/// Shows the habit with the longest streak ever.
pub fn cmd_longest<S: Storage>(storage: &S, username: &str, now: NaiveDateTime) -> Result<()> {
    let user = load_user(storage, username)?;
    print_best(longest_overall(&user, now)?);
    Ok(())
}

/// Shows the habit with the longest current streak.
pub fn cmd_longest_current<S: Storage>(
    storage: &S,
    username: &str,
    now: NaiveDateTime,
) -> Result<()> {
    let user = load_user(storage, username)?;
    print_best(longest_current(&user, now)?);
    Ok(())
}

/// Shows current and longest streak of one tracked habit.
pub fn cmd_streak<S: Storage>(
    storage: &S,
    username: &str,
    habit_name: &str,
    now: NaiveDateTime,
) -> Result<()> {
    let user = load_user(storage, username)?;
    let tracked = tracked_or_err(&user, habit_name)?;
    println!("{} ({})", habit_name, tracked.habit.period_type);
    println!("  current streak: {}", current_streak_for(tracked, now)?);
    println!("  longest streak: {}", longest_streak_for(tracked, now)?);
    Ok(())
}

/// Prints the per-period completion history of one tracked habit.
pub fn cmd_history<S: Storage>(
    storage: &S,
    username: &str,
    habit_name: &str,
    now: NaiveDateTime,
) -> Result<()> {
    let user = load_user(storage, username)?;
    let tracked = tracked_or_err(&user, habit_name)?;
    let period_type = tracked.habit.period_type;
    let history = tracked.completion_history(now)?;

    let mut table = new_table(&["Period", "Start", "End", "Status"]);
    let last = history.len().saturating_sub(1);
    for (i, entry) in history.iter().enumerate() {
        let (status, color) = match (entry.completed, i == last) {
            (true, _) => ("Done", Color::Green),
            (false, true) => ("Open", Color::Yellow),
            (false, false) => ("Missed", Color::Red),
        };
        table.add_row(vec![
            Cell::new(period_label(period_type, &entry.period)),
            Cell::new(entry.period.start.format("%Y-%m-%d %H:%M")),
            Cell::new(entry.period.end.format("%Y-%m-%d %H:%M")),
            Cell::new(status).fg(color),
        ]);
    }
    println!("{table}");
    println!(
        "current streak: {} | longest streak: {}",
        current_streak(&history),
        longest_streak(&history)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn tracked_since(start: NaiveDateTime) -> TrackedHabit {
        let habit = Habit::new("Read", "", "daily", start).unwrap();
        TrackedHabit::new(habit, start)
    }

    #[test]
    fn completion_time_defaults_to_now() {
        let now = at(2024, 9, 10, 12);
        let t = tracked_since(at(2024, 9, 1, 8));
        assert_eq!(completion_time_for(None, &t, now).unwrap(), now);
    }

    #[test]
    fn completion_date_checks() {
        let now = at(2024, 9, 10, 12);
        let t = tracked_since(at(2024, 9, 1, 8));

        let future = NaiveDate::from_ymd_opt(2024, 9, 11).unwrap();
        assert!(matches!(
            completion_time_for(Some(future), &t, now),
            Err(HabitError::CompletionInFuture(_))
        ));

        let before = NaiveDate::from_ymd_opt(2024, 8, 31).unwrap();
        assert!(matches!(
            completion_time_for(Some(before), &t, now),
            Err(HabitError::CompletionBeforeStart { .. })
        ));

        let first_day = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        assert_eq!(completion_time_for(Some(first_day), &t, now).unwrap(), at(2024, 9, 1, 8));

        let today = NaiveDate::from_ymd_opt(2024, 9, 10).unwrap();
        assert_eq!(completion_time_for(Some(today), &t, now).unwrap(), at(2024, 9, 10, 0));
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date("2024-09-10").is_ok());
        assert!(matches!(parse_date("10/09/2024"), Err(HabitError::InvalidDate(_))));
    }

    #[test]
    fn period_labels() {
        let t = at(2024, 9, 10, 12);
        let label = |p: PeriodType| period_label(p, &p.bounds(t).unwrap());
        assert_eq!(label(PeriodType::Daily), "2024-09-10");
        assert_eq!(label(PeriodType::Weekly), "2024-W37");
        assert_eq!(label(PeriodType::Monthly), "2024-09");
        assert_eq!(label(PeriodType::Quarterly), "2024-Q3");
        assert_eq!(label(PeriodType::Annually), "2024");
    }
}
