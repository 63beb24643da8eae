use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{HabitError, Result};
use crate::period::{Period, PeriodType};

/// A reusable habit definition, shared by every user who tracks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Habit {
    /// Unique name of the habit.
    pub name: String,
    /// What has to be done to complete the habit.
    pub task_description: String,
    /// How often the habit repeats.
    pub period_type: PeriodType,
    /// When the definition was created.
    pub creation_time: NaiveDateTime,
}

impl Habit {
    /// Creates a habit from a textual period tag.
    ///
    /// Fails with [`HabitError::InvalidPeriodType`] unless `period` is one of
    /// `daily`, `weekly`, `monthly`, `quarterly` or `annually`.
    pub fn new(
        name: impl Into<String>,
        task_description: impl Into<String>,
        period: &str,
        creation_time: NaiveDateTime,
    ) -> Result<Self> {
        Ok(Self::with_period(name, task_description, period.parse()?, creation_time))
    }

    pub fn with_period(
        name: impl Into<String>,
        task_description: impl Into<String>,
        period_type: PeriodType,
        creation_time: NaiveDateTime,
    ) -> Self {
        Self {
            name: name.into(),
            task_description: task_description.into(),
            period_type,
            creation_time,
        }
    }
}

/// One period of a habit's history and whether it was completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub period: Period,
    pub completed: bool,
}

/// A user's adoption of a [`Habit`], with every recorded completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedHabit {
    /// Opaque unique id of this tracking record.
    pub tracking_id: String,
    /// The definition being tracked.
    pub habit: Habit,
    /// When the user started tracking the habit.
    pub creation_time: NaiveDateTime,
    completion_times: Vec<NaiveDateTime>,
}

impl TrackedHabit {
    /// Starts tracking `habit` at `creation_time` under a fresh tracking id.
    pub fn new(habit: Habit, creation_time: NaiveDateTime) -> Self {
        Self::restore(Uuid::new_v4().simple().to_string(), habit, creation_time, Vec::new())
    }

    /// Rebuilds a tracking record from stored parts.
    pub fn restore(
        tracking_id: String,
        habit: Habit,
        creation_time: NaiveDateTime,
        completion_times: Vec<NaiveDateTime>,
    ) -> Self {
        Self {
            tracking_id,
            habit,
            creation_time,
            completion_times,
        }
    }

    pub fn completion_times(&self) -> &[NaiveDateTime] {
        &self.completion_times
    }

    /// Whether any completion falls within `[period_start, period_end)`.
    pub fn is_period_completed(&self, period_start: NaiveDateTime, period_end: NaiveDateTime) -> bool {
        self.completion_times
            .iter()
            .any(|t| period_start <= *t && *t < period_end)
    }

    /// Records a completion at `completion_time`.
    ///
    /// Returns `Ok(false)` without changing anything when the period containing
    /// `completion_time` already has a completion.
    pub fn record_completion(&mut self, completion_time: NaiveDateTime) -> Result<bool> {
        let period = self.habit.period_type.bounds(completion_time)?;
        if self.is_period_completed(period.start, period.end) {
            return Ok(false);
        }
        self.completion_times.push(completion_time);
        Ok(true)
    }

    /// One entry per period since tracking started, oldest first.
    ///
    /// The last entry is the period containing `now`, which may still be open.
    pub fn completion_history(&self, now: NaiveDateTime) -> Result<Vec<HistoryEntry>> {
        let periods = self.habit.period_type.periods_since(self.creation_time, now)?;
        Ok(periods
            .into_iter()
            .map(|period| HistoryEntry {
                period,
                completed: self.is_period_completed(period.start, period.end),
            })
            .collect())
    }
}

/// A user account and the habits it tracks, in tracking order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub habits: Vec<TrackedHabit>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            habits: Vec::new(),
        }
    }

    /// The tracking record for the habit named `habit_name`, if tracked.
    pub fn tracked(&self, habit_name: &str) -> Option<&TrackedHabit> {
        self.habits.iter().find(|h| h.habit.name == habit_name)
    }

    pub fn tracked_mut(&mut self, habit_name: &str) -> Option<&mut TrackedHabit> {
        self.habits.iter_mut().find(|h| h.habit.name == habit_name)
    }

    /// Starts tracking `habit` at `now`. A habit can be tracked only once.
    pub fn add_habit(&mut self, habit: Habit, now: NaiveDateTime) -> Result<&mut TrackedHabit> {
        if self.tracked(&habit.name).is_some() {
            return Err(HabitError::AlreadyTracked {
                habit: habit.name,
                user: self.username.clone(),
            });
        }
        self.habits.push(TrackedHabit::new(habit, now));
        let idx = self.habits.len() - 1;
        Ok(&mut self.habits[idx])
    }

    /// Stops tracking the habit named `habit_name` and returns its record.
    pub fn remove_habit(&mut self, habit_name: &str) -> Result<TrackedHabit> {
        match self.habits.iter().position(|h| h.habit.name == habit_name) {
            Some(idx) => Ok(self.habits.remove(idx)),
            None => Err(HabitError::NotTracked {
                habit: habit_name.to_string(),
                user: self.username.clone(),
            }),
        }
    }
}
