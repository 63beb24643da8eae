use chrono::{Local, NaiveDateTime};
use ratatui::widgets::TableState;
use tracing::warn;
use crate::analytics::{
    all_tracked_with_streak, all_tracked_with_streak_for_period_type, longest_current,
    longest_overall, longest_streak,
};
use crate::commands::{
    complete_habit, create_habit, delete_habit, edit_habit_description, load_user, parse_date,
    track_habit, untrack_habit,
};
use crate::error::Result;
use crate::models::{Habit, HistoryEntry, User};
use crate::period::PeriodType;
use crate::storage::{JsonStorage, Storage};

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
    Adding,
}

pub enum ViewMode {
    Tracking,
    Catalog,
}

pub enum InputField {
    None,
    Description,
    CompletionDate,
}

/// One tracked habit as shown in the tracking view.
pub struct HabitRow {
    pub name: String,
    pub period_type: PeriodType,
    pub description: String,
    pub current: u32,
    pub longest: u32,
    pub done_this_period: bool,
}

/// One catalog habit and whether the current user tracks it.
pub struct CatalogRow {
    pub habit: Habit,
    pub tracked: bool,
}

/// Completion history shown in a popup.
pub struct HistoryView {
    pub name: String,
    pub period_type: PeriodType,
    pub entries: Vec<HistoryEntry>,
}

pub struct App {
    storage: JsonStorage,
    pub user: User,
    pub rows: Vec<HabitRow>,
    pub catalog: Vec<CatalogRow>,
    pub state: TableState,
    pub catalog_state: TableState,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub target: Option<String>,
    pub add_state: AddState,
    pub period_filter: Option<PeriodType>,
    pub best_overall: (Option<String>, u32),
    pub best_current: (Option<String>, u32),
    pub history: Option<HistoryView>,
    pub status: Option<String>,
}

/// State for the multi-step "Add Habit" wizard.
#[derive(Default)]
pub struct AddState {
    pub name: String,
    pub description: String,
    pub step: usize, // 0: Name, 1: Description, 2: Period
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl App {
    /// Creates a new App for `username` and loads initial data.
    pub fn new(storage: JsonStorage, username: &str) -> Result<App> {
        let user = load_user(&storage, username)?;
        let mut app = App {
            storage,
            user,
            rows: Vec::new(),
            catalog: Vec::new(),
            state: TableState::default(),
            catalog_state: TableState::default(),
            view_mode: ViewMode::Tracking,
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            target: None,
            add_state: AddState::default(),
            period_filter: None,
            best_overall: (None, 0),
            best_current: (None, 0),
            history: None,
            status: None,
        };
        app.reload()?;
        Ok(app)
    }

    /// Selects the next item in the current list.
    pub fn next(&mut self) {
        let (len, state) = self.current_list();
        if len == 0 { return; }
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    /// Selects the previous item in the current list.
    pub fn previous(&mut self) {
        let (len, state) = self.current_list();
        if len == 0 { return; }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    fn current_list(&mut self) -> (usize, &mut TableState) {
        match self.view_mode {
            ViewMode::Tracking => (self.rows.len(), &mut self.state),
            ViewMode::Catalog => (self.catalog.len(), &mut self.catalog_state),
        }
    }

    fn selected_tracked(&self) -> Option<String> {
        let i = self.state.selected()?;
        self.rows.get(i).map(|r| r.name.clone())
    }

    fn selected_catalog(&self) -> Option<&CatalogRow> {
        let i = self.catalog_state.selected()?;
        self.catalog.get(i)
    }

    /// Name of the selected habit in whichever view is active.
    fn selected_name(&self) -> Option<String> {
        match self.view_mode {
            ViewMode::Tracking => self.selected_tracked(),
            ViewMode::Catalog => self.selected_catalog().map(|r| r.habit.name.clone()),
        }
    }

    /// Shows the outcome of an action in the status line and refreshes the views.
    fn finish(&mut self, outcome: Result<String>) {
        self.status = Some(match outcome {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "action failed");
                e.to_string()
            }
        });
        if let Err(e) = self.reload() {
            warn!(error = %e, "reload failed");
            self.status = Some(e.to_string());
        }
    }

    /// Marks the selected tracked habit as completed now.
    pub fn complete_selected(&mut self) {
        if let ViewMode::Catalog = self.view_mode { return; }
        if let Some(name) = self.selected_tracked() {
            let outcome = self.complete(&name, None);
            self.finish(outcome);
        }
    }

    fn complete(&mut self, name: &str, date: Option<&str>) -> Result<String> {
        let date = date.map(parse_date).transpose()?;
        let recorded = complete_habit(&mut self.storage, &mut self.user, name, date, now())?;
        Ok(match (recorded, date) {
            (false, _) => format!("{} was already completed for this period.", name),
            (true, Some(d)) => format!("{} marked as completed for {}.", name, d),
            (true, None) => format!("{} marked as completed for today.", name),
        })
    }

    /// Starts tracking the habit selected in the catalog.
    pub fn track_selected(&mut self) {
        if let ViewMode::Tracking = self.view_mode { return; }
        if let Some(name) = self.selected_name() {
            let outcome = track_habit(&mut self.storage, &mut self.user, &name, now())
                .map(|_| format!("{} added to tracking.", name));
            self.finish(outcome);
        }
    }

    /// Untracks the selected habit, or deletes the selected catalog definition.
    pub fn delete_selected(&mut self) {
        let Some(name) = self.selected_name() else { return; };
        let outcome = match self.view_mode {
            ViewMode::Tracking => untrack_habit(&mut self.storage, &mut self.user, &name)
                .map(|_| format!("{} removed from tracking.", name)),
            ViewMode::Catalog => delete_habit(&mut self.storage, &name)
                .map(|_| format!("{} deleted.", name)),
        };
        self.finish(outcome);
    }

    /// Opens the completion history popup for the selected tracked habit.
    pub fn show_history(&mut self) {
        if let ViewMode::Catalog = self.view_mode { return; }
        let Some(name) = self.selected_tracked() else { return; };
        let Some(tracked) = self.user.tracked(&name) else { return; };
        match tracked.completion_history(now()) {
            Ok(entries) => {
                self.history = Some(HistoryView {
                    name,
                    period_type: tracked.habit.period_type,
                    entries,
                })
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    /// Reloads the user and catalog from storage and recomputes streaks.
    pub fn reload(&mut self) -> Result<()> {
        let now = now();
        self.user = load_user(&self.storage, &self.user.username)?;

        let streaks = match self.period_filter {
            Some(p) => all_tracked_with_streak_for_period_type(&self.user, p, now)?,
            None => all_tracked_with_streak(&self.user, now)?,
        };
        let mut rows = Vec::with_capacity(streaks.len());
        for (habit, current) in streaks {
            let Some(tracked) = self.user.tracked(&habit.name) else { continue; };
            let history = tracked.completion_history(now)?;
            rows.push(HabitRow {
                name: habit.name.clone(),
                period_type: habit.period_type,
                description: habit.task_description.clone(),
                current,
                longest: longest_streak(&history),
                done_this_period: history.last().is_some_and(|e| e.completed),
            });
        }
        self.rows = rows;

        let (habit, streak) = longest_overall(&self.user, now)?;
        self.best_overall = (habit.map(|h| h.name.clone()), streak);
        let (habit, streak) = longest_current(&self.user, now)?;
        self.best_current = (habit.map(|h| h.name.clone()), streak);

        self.catalog = self
            .storage
            .get_all_habits()?
            .into_iter()
            .map(|habit| CatalogRow {
                tracked: self.user.tracked(&habit.name).is_some(),
                habit,
            })
            .collect();

        fix_selection(&mut self.state, self.rows.len());
        fix_selection(&mut self.catalog_state, self.catalog.len());
        Ok(())
    }

    /// Cycles the tracking view filter: all, then each period type.
    pub fn cycle_filter(&mut self) {
        self.period_filter = match self.period_filter {
            None => Some(PeriodType::ALL[0]),
            Some(p) => PeriodType::ALL
                .iter()
                .position(|x| *x == p)
                .and_then(|i| PeriodType::ALL.get(i + 1).copied()),
        };
        if let Err(e) = self.reload() {
            self.status = Some(e.to_string());
        }
    }

    /// Toggles between Tracking and Catalog views.
    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Tracking => ViewMode::Catalog,
            ViewMode::Catalog => ViewMode::Tracking,
        };
    }

    /// Initiates the "Add Habit" wizard.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    /// Initiates editing of a field for the selected habit.
    pub fn start_edit(&mut self, field: InputField) {
        if let InputField::CompletionDate = field {
            if let ViewMode::Catalog = self.view_mode { return; }
        }
        let Some(name) = self.selected_name() else { return; };
        self.input_buffer = match field {
            InputField::Description => self
                .catalog
                .iter()
                .find(|r| r.habit.name == name)
                .map(|r| r.habit.task_description.clone())
                .unwrap_or_default(),
            InputField::CompletionDate => now().format("%Y-%m-%d").to_string(),
            InputField::None => String::new(),
        };
        self.target = Some(name);
        self.input_field = field;
        self.input_mode = InputMode::Editing;
    }

    /// Handles text input based on the current mode.
    pub fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input(),
            InputMode::Editing => self.handle_editing_input(),
            _ => {}
        }
    }

    /// Handles input for the "Add Habit" wizard.
    fn handle_adding_input(&mut self) {
        match self.add_state.step {
            0 => { // Name
                if !self.input_buffer.trim().is_empty() {
                    self.add_state.name = self.input_buffer.trim().to_string();
                    self.add_state.step += 1;
                    self.input_buffer.clear();
                }
            }
            1 => { // Description
                self.add_state.description = self.input_buffer.clone();
                self.add_state.step += 1;
                self.input_buffer.clear();
            }
            2 => { // Period
                let outcome = create_habit(
                    &mut self.storage,
                    &self.add_state.name,
                    &self.add_state.description,
                    &self.input_buffer,
                    now(),
                );
                match outcome {
                    Ok(habit) => {
                        self.input_mode = InputMode::Normal;
                        self.input_buffer.clear();
                        self.finish(Ok(format!("{} created.", habit.name)));
                    }
                    // stay on the period prompt so the user can retry
                    Err(e) => self.status = Some(e.to_string()),
                }
            }
            _ => {}
        }
    }

    /// Handles input for the edit prompts.
    fn handle_editing_input(&mut self) {
        let Some(name) = self.target.take() else {
            self.input_mode = InputMode::Normal;
            return;
        };
        let input = std::mem::take(&mut self.input_buffer);
        let field = std::mem::replace(&mut self.input_field, InputField::None);
        let outcome = match field {
            InputField::Description => edit_habit_description(&mut self.storage, &name, &input)
                .map(|_| format!("{} updated.", name)),
            InputField::CompletionDate => self.complete(&name, Some(&input)),
            InputField::None => Ok(String::new()),
        };
        self.input_mode = InputMode::Normal;
        self.finish(outcome);
    }
}

fn fix_selection(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else if let Some(i) = state.selected() {
        if i >= len {
            state.select(Some(len - 1));
        }
    } else {
        state.select(Some(0));
    }
}
