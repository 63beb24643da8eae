use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{Habit, TrackedHabit, User};

/// Persistence for users, habit definitions and tracking records.
///
/// Mutations return `Ok(false)` when the key already exists (insert) or is
/// missing (update, delete). Lookups return `Ok(None)` for unknown keys.
pub trait Storage {
    fn insert_user(&mut self, user: &User) -> Result<bool>;
    fn update_user(&mut self, user: &User) -> Result<bool>;
    fn delete_user(&mut self, user: &User) -> Result<bool>;
    fn get_user(&self, username: &str) -> Result<Option<User>>;

    fn insert_habit(&mut self, habit: &Habit) -> Result<bool>;
    fn update_habit(&mut self, habit: &Habit) -> Result<bool>;
    fn delete_habit(&mut self, habit: &Habit) -> Result<bool>;
    fn get_habit(&self, name: &str) -> Result<Option<Habit>>;
    fn get_all_habits(&self) -> Result<Vec<Habit>>;

    fn insert_tracked_habit(&mut self, tracked: &TrackedHabit) -> Result<bool>;
    fn update_tracked_habit(&mut self, tracked: &TrackedHabit) -> Result<bool>;
    fn delete_tracked_habit(&mut self, tracked: &TrackedHabit) -> Result<bool>;
    fn get_tracked_habit(&self, tracking_id: &str) -> Result<Option<TrackedHabit>>;
    fn get_all_tracked_habits(&self) -> Result<Vec<TrackedHabit>>;
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct UserRecord {
    username: String,
    /// Tracking ids, in the order the user started tracking them.
    #[serde(default)]
    tracked: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct HabitRecord {
    name: String,
    #[serde(default)]
    task_description: String,
    period: String,
    creation_time: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct TrackedHabitRecord {
    tracking_id: String,
    /// Name of the tracked habit definition.
    habit: String,
    creation_time: NaiveDateTime,
    #[serde(default)]
    completion_times: Vec<NaiveDateTime>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
struct Database {
    #[serde(default)]
    users: BTreeMap<String, UserRecord>,
    #[serde(default)]
    habits: BTreeMap<String, HabitRecord>,
    #[serde(default)]
    user_habits: BTreeMap<String, TrackedHabitRecord>,
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            tracked: user.habits.iter().map(|h| h.tracking_id.clone()).collect(),
        }
    }
}

impl From<&Habit> for HabitRecord {
    fn from(habit: &Habit) -> Self {
        Self {
            name: habit.name.clone(),
            task_description: habit.task_description.clone(),
            period: habit.period_type.to_string(),
            creation_time: habit.creation_time,
        }
    }
}

impl From<&TrackedHabit> for TrackedHabitRecord {
    fn from(tracked: &TrackedHabit) -> Self {
        Self {
            tracking_id: tracked.tracking_id.clone(),
            habit: tracked.habit.name.clone(),
            creation_time: tracked.creation_time,
            completion_times: tracked.completion_times().to_vec(),
        }
    }
}

impl HabitRecord {
    fn to_habit(&self) -> Result<Habit> {
        Habit::new(&self.name, &self.task_description, &self.period, self.creation_time)
    }
}

/// A [`Storage`] kept in a single JSON file.
///
/// The whole file is loaded on open and rewritten after every successful
/// mutation.
pub struct JsonStorage {
    path: PathBuf,
    db: Database,
}

impl JsonStorage {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let db = if path.exists() {
            let s = fs::read_to_string(&path)?;
            serde_json::from_str(&s)?
        } else {
            Database::default()
        };
        debug!(
            path = %path.display(),
            users = db.users.len(),
            habits = db.habits.len(),
            tracked = db.user_habits.len(),
            "habits file loaded"
        );
        Ok(Self { path, db })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, db: &Database) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let s = serde_json::to_string_pretty(db)?;
        fs::write(&self.path, s)?;
        Ok(())
    }

    /// Applies `change` to a copy of the database and keeps it only once it is on disk.
    ///
    /// `change` returns `false` when there is nothing to do; the file is then left alone.
    fn commit(&mut self, change: impl FnOnce(&mut Database) -> bool) -> Result<bool> {
        let mut next = self.db.clone();
        if !change(&mut next) {
            return Ok(false);
        }
        self.save(&next)?;
        self.db = next;
        Ok(true)
    }

    /// Joins a tracking record with its definition.
    ///
    /// Records whose definition no longer exists are skipped.
    fn materialize(&self, record: &TrackedHabitRecord) -> Result<Option<TrackedHabit>> {
        let Some(habit) = self.get_habit(&record.habit)? else {
            warn!(
                tracking_id = %record.tracking_id,
                habit = %record.habit,
                "tracked habit references a missing definition, skipping"
            );
            return Ok(None);
        };
        Ok(Some(TrackedHabit::restore(
            record.tracking_id.clone(),
            habit,
            record.creation_time,
            record.completion_times.clone(),
        )))
    }
}

impl Storage for JsonStorage {
    fn insert_user(&mut self, user: &User) -> Result<bool> {
        let inserted = self.commit(|db| {
            if db.users.contains_key(&user.username) {
                return false;
            }
            db.users.insert(user.username.clone(), user.into());
            true
        })?;
        if inserted {
            info!(user = %user.username, "user inserted");
        }
        Ok(inserted)
    }

    fn update_user(&mut self, user: &User) -> Result<bool> {
        let updated = self.commit(|db| match db.users.get_mut(&user.username) {
            Some(record) => {
                *record = user.into();
                true
            }
            None => false,
        })?;
        if updated {
            info!(user = %user.username, tracked = user.habits.len(), "user updated");
        }
        Ok(updated)
    }

    fn delete_user(&mut self, user: &User) -> Result<bool> {
        let deleted = self.commit(|db| db.users.remove(&user.username).is_some())?;
        if deleted {
            info!(user = %user.username, "user deleted");
        }
        Ok(deleted)
    }

    fn get_user(&self, username: &str) -> Result<Option<User>> {
        let Some(record) = self.db.users.get(username) else {
            return Ok(None);
        };
        let mut habits = Vec::with_capacity(record.tracked.len());
        for id in &record.tracked {
            match self.db.user_habits.get(id) {
                Some(tracked) => habits.extend(self.materialize(tracked)?),
                None => warn!(user = %username, tracking_id = %id, "unknown tracking id, skipping"),
            }
        }
        Ok(Some(User {
            username: record.username.clone(),
            habits,
        }))
    }

    fn insert_habit(&mut self, habit: &Habit) -> Result<bool> {
        let inserted = self.commit(|db| {
            if db.habits.contains_key(&habit.name) {
                return false;
            }
            db.habits.insert(habit.name.clone(), habit.into());
            true
        })?;
        if inserted {
            info!(habit = %habit.name, period = %habit.period_type, "habit inserted");
        }
        Ok(inserted)
    }

    fn update_habit(&mut self, habit: &Habit) -> Result<bool> {
        let updated = self.commit(|db| match db.habits.get_mut(&habit.name) {
            Some(record) => {
                *record = habit.into();
                true
            }
            None => false,
        })?;
        if updated {
            info!(habit = %habit.name, "habit updated");
        }
        Ok(updated)
    }

    fn delete_habit(&mut self, habit: &Habit) -> Result<bool> {
        let deleted = self.commit(|db| db.habits.remove(&habit.name).is_some())?;
        if deleted {
            info!(habit = %habit.name, "habit deleted");
        }
        Ok(deleted)
    }

    fn get_habit(&self, name: &str) -> Result<Option<Habit>> {
        self.db.habits.get(name).map(HabitRecord::to_habit).transpose()
    }

    fn get_all_habits(&self) -> Result<Vec<Habit>> {
        self.db.habits.values().map(HabitRecord::to_habit).collect()
    }

    fn insert_tracked_habit(&mut self, tracked: &TrackedHabit) -> Result<bool> {
        let inserted = self.commit(|db| {
            if db.user_habits.contains_key(&tracked.tracking_id) {
                return false;
            }
            db.user_habits.insert(tracked.tracking_id.clone(), tracked.into());
            true
        })?;
        if inserted {
            info!(
                tracking_id = %tracked.tracking_id,
                habit = %tracked.habit.name,
                "tracked habit inserted"
            );
        }
        Ok(inserted)
    }

    fn update_tracked_habit(&mut self, tracked: &TrackedHabit) -> Result<bool> {
        let updated = self.commit(|db| match db.user_habits.get_mut(&tracked.tracking_id) {
            Some(record) => {
                *record = tracked.into();
                true
            }
            None => false,
        })?;
        if updated {
            info!(
                tracking_id = %tracked.tracking_id,
                completions = tracked.completion_times().len(),
                "tracked habit updated"
            );
        }
        Ok(updated)
    }

    fn delete_tracked_habit(&mut self, tracked: &TrackedHabit) -> Result<bool> {
        let deleted = self.commit(|db| db.user_habits.remove(&tracked.tracking_id).is_some())?;
        if deleted {
            info!(tracking_id = %tracked.tracking_id, "tracked habit deleted");
        }
        Ok(deleted)
    }

    fn get_tracked_habit(&self, tracking_id: &str) -> Result<Option<TrackedHabit>> {
        match self.db.user_habits.get(tracking_id) {
            Some(record) => self.materialize(record),
            None => Ok(None),
        }
    }

    fn get_all_tracked_habits(&self) -> Result<Vec<TrackedHabit>> {
        let mut all = Vec::with_capacity(self.db.user_habits.len());
        for record in self.db.user_habits.values() {
            all.extend(self.materialize(record)?);
        }
        Ok(all)
    }
}
