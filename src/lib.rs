pub mod analytics;
pub mod commands;
pub mod config;
pub mod demo;
pub mod error;
pub mod logging;
pub mod models;
pub mod period;
pub mod storage;
pub mod tui;

pub use error::{HabitError, Result};
pub use models::{Habit, HistoryEntry, TrackedHabit, User};
pub use period::{Period, PeriodType};
pub use storage::{JsonStorage, Storage};
