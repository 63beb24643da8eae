//! # Habitust
//!
//! A terminal habit tracker. Define recurring habits, track them per user and
//! follow your streaks, from a quick CLI or an interactive TUI.
//!
//! ## Features
//!
//! *   **Calendar periods**: Habits repeat daily, weekly (Monday to Sunday), monthly,
//!     quarterly (Jan/Apr/Jul/Oct) or annually.
//! *   **Once per period**: A habit can be completed at most once in each period.
//! *   **Streaks**: Current streak (the open period does not break it) and longest streak,
//!     per habit and across all habits of a user.
//! *   **Dual Interface**:
//!     *   **CLI**: Scriptable and quick for single commands.
//!     *   **TUI**: Interactive dashboard to track habits visually.
//! *   **Data Persistence**: Everything is stored in one JSON file in the XDG data directory.
//!
//! ## Usage
//!
//! ```bash
//! # Create an account and a habit, then start tracking it
//! habitust user add alice
//! habitust habit add "Drink water" --period daily --description "Two litres"
//! habitust --user alice track "Drink water"
//!
//! # Mark it done today, or on an earlier day
//! habitust --user alice complete "Drink water"
//! habitust --user alice complete "Drink water" --date 2024-09-10
//!
//! # Streak analytics
//! habitust --user alice streaks --period daily
//! habitust --user alice longest
//! habitust --user alice longest-current
//! habitust --user alice history "Drink water"
//!
//! # Interactive mode
//! habitust --user alice
//! ```
//!
//! `--user` can also be given through `HABITUST_USER`.
//!
//! ## Data Storage
//!
//! Habits are saved in your local data directory:
//! *   Linux: `~/.local/share/habitust/habits.json`
//! *   macOS: `~/Library/Application Support/habitust/habits.json`
//! *   Windows: `%APPDATA%\habitust\habits.json`
//!
//! You can override this with `--db <path>` or the `HABITS_DB` environment variable.
//! Logs go to `habitust.log` next to the habits file; set `HABITUST_LOG` (e.g. `debug`)
//! to change the level.

use std::error::Error;
use std::io;
use std::path::PathBuf;

use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use habitust::commands::*;
use habitust::config::Config;
use habitust::storage::JsonStorage;
use habitust::tui::run_tui;
use habitust::{demo, logging};

#[derive(Parser)]
#[command(name = "habitust")]
#[command(about = "Terminal habit tracker with streak analytics", long_about = None)]
struct Cli {
    /// Habits file to use (overrides HABITS_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// User to act as
    #[arg(short, long, global = true, env = "HABITUST_USER")]
    user: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Manage the habit catalog
    Habit {
        #[command(subcommand)]
        command: HabitCommands,
    },
    /// Start tracking a habit
    Track {
        /// Habit name
        habit: String,
    },
    /// Stop tracking a habit (its completions are dropped)
    Untrack {
        /// Habit name
        habit: String,
    },
    /// Mark a tracked habit as completed
    Complete {
        /// Habit name
        habit: String,
        /// Day of completion in YYYY-MM-DD (defaults to now)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Show current streaks of all tracked habits
    Streaks {
        /// Only habits with this period (daily, weekly, monthly, quarterly, annually)
        #[arg(short, long)]
        period: Option<String>,
    },
    /// Show the habit with the longest streak ever
    Longest,
    /// Show the habit with the longest current streak
    LongestCurrent,
    /// Show current and longest streak of one habit
    Streak {
        /// Habit name
        habit: String,
    },
    /// Show the per-period completion history of one habit
    History {
        /// Habit name
        habit: String,
    },
    /// Fill the habits file with demo data
    Demo {
        /// Days of history to generate
        #[arg(long, default_value_t = 30)]
        days: i64,
        /// Probability of completing each period (0.0 - 1.0)
        #[arg(long, default_value_t = 0.75)]
        rate: f64,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user
    Add {
        /// Username
        name: String,
    },
    /// Delete a user and everything it tracks
    Remove {
        /// Username
        name: String,
    },
}

#[derive(Subcommand)]
enum HabitCommands {
    /// Add a new habit
    Add {
        /// Habit name (quoted if it has spaces)
        name: String,
        /// Period (daily, weekly, monthly, quarterly, annually)
        #[arg(short, long)]
        period: String,
        /// What has to be done
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Change the task description of a habit
    Edit {
        /// Habit name
        name: String,
        /// New task description
        #[arg(short, long)]
        description: String,
    },
    /// Remove a habit nobody tracks
    Remove {
        /// Habit name
        name: String,
    },
    /// List all habits
    List,
}

fn require_user(user: Option<&str>) -> Result<&str, Box<dyn Error>> {
    user.ok_or_else(|| "No user selected. Pass --user <name> or set HABITUST_USER.".into())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(Commands::Completions { shell }) = &cli.command {
        let shell_enum = match shell.as_str() {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "powershell" => Shell::PowerShell,
            "elvish" => Shell::Elvish,
            _ => return Err(format!("Unsupported shell: {}", shell).into()),
        };
        let mut cmd = Cli::command();
        generate(shell_enum, &mut cmd, "habitust", &mut io::stdout());
        return Ok(());
    }

    let config = Config::resolve(cli.db);
    let _log_guard = logging::init(&config)?;
    let mut storage = JsonStorage::open(config.data_path.clone())?;
    let now = Local::now().naive_local();
    let user = cli.user.as_deref();

    match cli.command {
        Some(Commands::User { command }) => match command {
            UserCommands::Add { name } => cmd_user_add(&mut storage, &name)?,
            UserCommands::Remove { name } => cmd_user_remove(&mut storage, &name)?,
        },
        Some(Commands::Habit { command }) => match command {
            HabitCommands::Add { name, period, description } => {
                cmd_habit_add(&mut storage, &name, &description, &period, now)?
            }
            HabitCommands::Edit { name, description } => {
                cmd_habit_edit(&mut storage, &name, &description)?
            }
            HabitCommands::Remove { name } => cmd_habit_remove(&mut storage, &name)?,
            HabitCommands::List => cmd_habit_list(&storage)?,
        },
        Some(Commands::Track { habit }) => {
            cmd_track(&mut storage, require_user(user)?, &habit, now)?
        }
        Some(Commands::Untrack { habit }) => {
            cmd_untrack(&mut storage, require_user(user)?, &habit)?
        }
        Some(Commands::Complete { habit, date }) => {
            cmd_complete(&mut storage, require_user(user)?, &habit, date.as_deref(), now)?;
        }
        Some(Commands::Streaks { period }) => {
            cmd_streaks(&storage, require_user(user)?, period.as_deref(), now)?
        }
        Some(Commands::Longest) => cmd_longest(&storage, require_user(user)?, now)?,
        Some(Commands::LongestCurrent) => cmd_longest_current(&storage, require_user(user)?, now)?,
        Some(Commands::Streak { habit }) => cmd_streak(&storage, require_user(user)?, &habit, now)?,
        Some(Commands::History { habit }) => {
            cmd_history(&storage, require_user(user)?, &habit, now)?
        }
        Some(Commands::Demo { days, rate }) => {
            let username = user.unwrap_or("testuser");
            let mut rng = rand::thread_rng();
            let summary = demo::seed(&mut storage, username, days, rate, now, &mut rng)?;
            println!(
                "Demo data for '{}': {} habits created, {} tracked, {} completions.",
                username, summary.habits_created, summary.habits_tracked, summary.completions
            );
        }
        Some(Commands::Completions { .. }) => {}
        Some(Commands::Ui) | None => run_tui(storage, require_user(user)?)?,
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
