use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};
use crate::analytics::StreakLevel;
use crate::commands::period_label;
use super::app::{App, HistoryView, InputMode, InputField, ViewMode};

fn streak_style(streak: u32) -> Style {
    let color = match StreakLevel::of(streak) {
        StreakLevel::Broken => Color::Gray,
        StreakLevel::Building => Color::Yellow,
        StreakLevel::Strong => Color::Green,
    };
    Style::default().fg(color)
}

fn best_text(label: &str, best: &(Option<String>, u32)) -> String {
    match best {
        (Some(name), streak) => format!("{}: {} ({})", label, name, streak),
        (None, _) => format!("{}: -", label),
    }
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Table
            Constraint::Length(3), // Summary / status
            Constraint::Length(3)  // Help
        ].as_ref())
        .split(f.area());

    match app.view_mode {
        ViewMode::Tracking => {
            let rows: Vec<Row> = app
                .rows
                .iter()
                .map(|r| {
                    Row::new(vec![
                        Cell::from(r.name.clone()),
                        Cell::from(r.period_type.to_string()),
                        Cell::from(r.description.clone()),
                        Cell::from(r.current.to_string()).style(streak_style(r.current)),
                        Cell::from(r.longest.to_string()),
                        Cell::from(if r.done_this_period { "Done" } else { "Pending" }),
                    ]).style(if r.done_this_period {
                        Style::default().fg(Color::Green)
                    } else {
                        Style::default()
                    })
                })
                .collect();

            let widths = [
                Constraint::Min(16),
                Constraint::Length(10),
                Constraint::Min(20),
                Constraint::Length(8),
                Constraint::Length(8),
                Constraint::Length(8),
            ];

            let filter = app.period_filter.map(|p| p.to_string()).unwrap_or_else(|| "all".into());
            let title = format!("Habitust - {} - Tracking ({})", app.user.username, filter);
            let table = Table::new(rows, widths)
                .header(Row::new(vec!["Habit", "Period", "Task", "Current", "Longest", "Status"])
                    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                    .bottom_margin(1))
                .block(Block::default().borders(Borders::ALL).title(title))
                .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
                .highlight_symbol(">> ");

            f.render_stateful_widget(table, chunks[0], &mut app.state);
        }
        ViewMode::Catalog => {
            let rows: Vec<Row> = app
                .catalog
                .iter()
                .map(|r| {
                    Row::new(vec![
                        Cell::from(r.habit.name.clone()),
                        Cell::from(r.habit.period_type.to_string()),
                        Cell::from(r.habit.task_description.clone()),
                        Cell::from(if r.tracked { "yes" } else { "" }),
                    ])
                })
                .collect();

            let widths = [
                Constraint::Min(16),
                Constraint::Length(10),
                Constraint::Min(20),
                Constraint::Length(8),
            ];

            let table = Table::new(rows, widths)
                .header(Row::new(vec!["Habit", "Period", "Task", "Tracked"])
                    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                    .bottom_margin(1))
                .block(Block::default().borders(Borders::ALL).title("Habitust - Catalog"))
                .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
                .highlight_symbol(">> ");

            f.render_stateful_widget(table, chunks[0], &mut app.catalog_state);
        }
    }

    let summary = match &app.status {
        Some(status) => Paragraph::new(status.as_str()).style(Style::default().fg(Color::Yellow)),
        None => Paragraph::new(format!(
            "{} | {}",
            best_text("Longest ever", &app.best_overall),
            best_text("Longest current", &app.best_current),
        )),
    };
    f.render_widget(summary.block(Block::default().borders(Borders::ALL)), chunks[1]);

    let help_text = match app.input_mode {
        InputMode::Normal => match app.view_mode {
            ViewMode::Tracking => "q: Quit | Space: Done | D: Done on date | h: History | f: Filter | d: Untrack | e: Edit task | a: Add | v: View Catalog",
            ViewMode::Catalog => "q: Quit | t/Enter: Track | a: Add | e: Edit task | d: Delete | v: View Tracking",
        },
        InputMode::Editing => "Enter: Save | Esc: Cancel",
        InputMode::Adding => "Enter: Next Step | Esc: Cancel",
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[2]);

    if let Some(history) = &app.history {
        render_history(f, history);
    }

    // Render Input Box if needed
    match app.input_mode {
        InputMode::Editing | InputMode::Adding => {
            let area = centered_rect(60, 3, f.area()); // Fixed height of 3 (border + 1 line)
            f.render_widget(Clear, area); // Clear the area first

            let title_string;
            let title = match app.input_mode {
                InputMode::Adding => match app.add_state.step {
                    0 => "Add Habit: Enter Name",
                    1 => "Add Habit: Enter Task Description",
                    2 => "Add Habit: Enter Period (daily, weekly, monthly, quarterly, annually)",
                    _ => "Add Habit",
                },
                InputMode::Editing => {
                    let target = app.target.as_deref().unwrap_or_default();
                    title_string = match app.input_field {
                        InputField::Description => format!("Edit Task of '{}'", target),
                        InputField::CompletionDate => format!("Complete '{}' on (YYYY-MM-DD)", target),
                        InputField::None => "Edit".to_string(),
                    };
                    title_string.as_str()
                },
                _ => "",
            };

            let input = Paragraph::new(app.input_buffer.as_str())
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().borders(Borders::ALL).title(title));

            f.render_widget(input, area);
        }
        _ => {}
    }
}

fn render_history(f: &mut Frame, history: &HistoryView) {
    let height = (history.entries.len() as u16 + 4).min(f.area().height.saturating_sub(2));
    let area = centered_rect(50, height, f.area());
    f.render_widget(Clear, area);

    let last = history.entries.len().saturating_sub(1);
    // newest first, so the open period is always visible
    let rows: Vec<Row> = history
        .entries
        .iter()
        .enumerate()
        .rev()
        .map(|(i, e)| {
            let (status, color) = match (e.completed, i == last) {
                (true, _) => ("Done", Color::Green),
                (false, true) => ("Open", Color::Yellow),
                (false, false) => ("Missed", Color::Red),
            };
            Row::new(vec![
                Cell::from(period_label(history.period_type, &e.period)),
                Cell::from(status),
            ]).style(Style::default().fg(color))
        })
        .collect();

    let table = Table::new(rows, [Constraint::Min(12), Constraint::Length(8)])
        .header(Row::new(vec!["Period", "Status"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)))
        .block(Block::default().borders(Borders::ALL).title(format!("History - {} (any key closes)", history.name)));

    f.render_widget(table, area);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let height = height.min(r.height);
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((r.height - height) / 2),
            Constraint::Length(height),
            Constraint::Length((r.height - height) / 2),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}
