use chrono::{NaiveDate, NaiveDateTime};
use habitust::models::{Habit, TrackedHabit, User};
use habitust::storage::{JsonStorage, Storage};
use habitust::{HabitError, PeriodType};
use std::fs;
use tempfile::TempDir;

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn habit(name: &str, period_type: PeriodType) -> Habit {
    Habit::with_period(name, format!("do {}", name), period_type, at(2024, 1, 1, 0))
}

#[test]
fn test_missing_file_is_empty_store() {
    let dir = TempDir::new().unwrap();
    let storage = JsonStorage::open(dir.path().join("nested").join("habits.json")).unwrap();
    assert!(storage.get_all_habits().unwrap().is_empty());
    assert!(storage.get_user("alice").unwrap().is_none());
    assert!(!storage.path().exists());
}

#[test]
fn test_save_creates_parent_dirs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("habits.json");
    let mut storage = JsonStorage::open(&path).unwrap();
    assert!(storage.insert_user(&User::new("alice")).unwrap());
    assert!(path.exists());
}

#[test]
fn test_mutations_report_missing_and_existing_keys() {
    let dir = TempDir::new().unwrap();
    let mut storage = JsonStorage::open(dir.path().join("habits.json")).unwrap();
    let alice = User::new("alice");
    let read = habit("Read", PeriodType::Daily);
    let tracked = TrackedHabit::new(read.clone(), at(2024, 2, 1, 9));

    assert!(!storage.update_user(&alice).unwrap());
    assert!(!storage.delete_user(&alice).unwrap());
    assert!(!storage.update_habit(&read).unwrap());
    assert!(!storage.delete_habit(&read).unwrap());
    assert!(!storage.update_tracked_habit(&tracked).unwrap());
    assert!(!storage.delete_tracked_habit(&tracked).unwrap());

    assert!(storage.insert_user(&alice).unwrap());
    assert!(!storage.insert_user(&alice).unwrap());
    assert!(storage.insert_habit(&read).unwrap());
    assert!(!storage.insert_habit(&read).unwrap());
    assert!(storage.insert_tracked_habit(&tracked).unwrap());
    assert!(!storage.insert_tracked_habit(&tracked).unwrap());

    assert!(storage.delete_tracked_habit(&tracked).unwrap());
    assert!(storage.get_tracked_habit(&tracked.tracking_id).unwrap().is_none());
}

#[test]
fn test_user_materializes_tracked_habits_in_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("habits.json");
    let mut storage = JsonStorage::open(&path).unwrap();

    let mut alice = User::new("alice");
    storage.insert_user(&alice).unwrap();
    // Inserted out of alphabetical order on purpose
    for (name, period_type) in [("Yoga", PeriodType::Weekly), ("Budget", PeriodType::Monthly)] {
        let h = habit(name, period_type);
        storage.insert_habit(&h).unwrap();
        let tracked = alice.add_habit(h, at(2024, 2, 1, 9)).unwrap();
        tracked.record_completion(at(2024, 2, 1, 10)).unwrap();
        let tracked = tracked.clone();
        storage.insert_tracked_habit(&tracked).unwrap();
    }
    storage.update_user(&alice).unwrap();

    let reopened = JsonStorage::open(&path).unwrap();
    let loaded = reopened.get_user("alice").unwrap().unwrap();
    assert_eq!(loaded, alice);
    let names: Vec<_> = loaded.habits.iter().map(|t| t.habit.name.as_str()).collect();
    assert_eq!(names, ["Yoga", "Budget"]);

    // The catalog itself is listed by name
    let catalog: Vec<_> = reopened
        .get_all_habits()
        .unwrap()
        .into_iter()
        .map(|h| h.name)
        .collect();
    assert_eq!(catalog, ["Budget", "Yoga"]);
}

#[test]
fn test_tracked_habit_sees_updated_definition() {
    let dir = TempDir::new().unwrap();
    let mut storage = JsonStorage::open(dir.path().join("habits.json")).unwrap();
    let mut read = habit("Read", PeriodType::Daily);
    storage.insert_habit(&read).unwrap();
    let tracked = TrackedHabit::new(read.clone(), at(2024, 2, 1, 9));
    storage.insert_tracked_habit(&tracked).unwrap();

    read.task_description = "Read 50 pages".into();
    storage.update_habit(&read).unwrap();

    let loaded = storage.get_tracked_habit(&tracked.tracking_id).unwrap().unwrap();
    assert_eq!(loaded.habit.task_description, "Read 50 pages");
}

#[test]
fn test_orphaned_tracking_record_is_skipped() {
    habitust::logging::init_test();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("habits.json");
    fs::write(
        &path,
        r#"{
            "users": {
                "alice": { "username": "alice", "tracked": ["t1", "t2", "gone"] }
            },
            "habits": {
                "Read": {
                    "name": "Read",
                    "task_description": "Read 20 pages",
                    "period": "daily",
                    "creation_time": "2024-01-01T00:00:00"
                }
            },
            "user_habits": {
                "t1": { "tracking_id": "t1", "habit": "Read", "creation_time": "2024-02-01T09:00:00" },
                "t2": { "tracking_id": "t2", "habit": "Deleted", "creation_time": "2024-02-01T09:00:00" }
            }
        }"#,
    )
    .unwrap();

    let storage = JsonStorage::open(&path).unwrap();
    let alice = storage.get_user("alice").unwrap().unwrap();
    assert_eq!(alice.habits.len(), 1);
    assert_eq!(alice.habits[0].tracking_id, "t1");
    assert!(alice.habits[0].completion_times().is_empty());
    assert!(storage.get_tracked_habit("t2").unwrap().is_none());
    assert_eq!(storage.get_all_tracked_habits().unwrap().len(), 1);
}

#[test]
fn test_unknown_period_tag_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("habits.json");
    fs::write(
        &path,
        r#"{
            "habits": {
                "Nap": { "name": "Nap", "period": "hourly", "creation_time": "2024-01-01T00:00:00" }
            }
        }"#,
    )
    .unwrap();

    let storage = JsonStorage::open(&path).unwrap();
    assert!(matches!(storage.get_habit("Nap"), Err(HabitError::InvalidPeriodType(_))));
    assert!(matches!(storage.get_all_habits(), Err(HabitError::InvalidPeriodType(_))));
}

#[test]
fn test_corrupt_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("habits.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(JsonStorage::open(&path), Err(HabitError::Json(_))));
}

#[test]
fn test_failed_save_leaves_store_unchanged() {
    let dir = TempDir::new().unwrap();
    // a regular file where the data directory should be makes every save fail
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let mut storage = JsonStorage::open(blocker.join("habits.json")).unwrap();
    let alice = User::new("alice");

    assert!(matches!(storage.insert_user(&alice), Err(HabitError::Io(_))));
    assert!(storage.get_user("alice").unwrap().is_none());
    // a retry fails the same way instead of claiming the user already exists
    assert!(matches!(storage.insert_user(&alice), Err(HabitError::Io(_))));

    let read = habit("Read", PeriodType::Daily);
    assert!(matches!(storage.insert_habit(&read), Err(HabitError::Io(_))));
    assert!(storage.get_all_habits().unwrap().is_empty());
}
