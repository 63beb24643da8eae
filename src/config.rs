use std::path::PathBuf;

/// Environment variable overriding the habits file location.
pub const DB_ENV: &str = "HABITS_DB";
/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "HABITUST_LOG";

const DEFAULT_LOG_LEVEL: &str = "info";

/// Runtime settings resolved from flags, environment and platform directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path of the JSON habits file.
    pub data_path: PathBuf,
    /// Path of the log file, next to the habits file.
    pub log_path: PathBuf,
    /// `tracing` filter directive, e.g. `info` or `habitust=debug`.
    pub log_level: String,
}

impl Config {
    /// Resolves the configuration.
    ///
    /// The habits file is chosen in the following order:
    /// 1. `db_override` (the `--db` flag).
    /// 2. `HABITS_DB` environment variable.
    /// 3. `~/.local/share/habitust/habits.json` (on Linux).
    /// 4. `./habits.json` (fallback).
    pub fn resolve(db_override: Option<PathBuf>) -> Self {
        let data_path = db_override
            .or_else(|| std::env::var_os(DB_ENV).map(PathBuf::from))
            .unwrap_or_else(default_data_path);
        let log_level = std::env::var(LOG_ENV)
            .ok()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        Self::with_data_path(data_path, log_level)
    }

    pub fn with_data_path(data_path: PathBuf, log_level: String) -> Self {
        let mut log_path = data_path.clone();
        log_path.set_file_name("habitust.log");
        Self {
            data_path,
            log_path,
            log_level,
        }
    }
}

fn default_data_path() -> PathBuf {
    match dirs::data_local_dir() {
        Some(mut p) => {
            p.push("habitust");
            p.push("habits.json");
            p
        }
        None => PathBuf::from("habits.json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let cfg = Config::resolve(Some(PathBuf::from("/tmp/somewhere/mine.json")));
        assert_eq!(cfg.data_path, PathBuf::from("/tmp/somewhere/mine.json"));
        assert_eq!(cfg.log_path, PathBuf::from("/tmp/somewhere/habitust.log"));
    }

    #[test]
    fn log_file_sits_next_to_relative_data_file() {
        let cfg = Config::with_data_path(PathBuf::from("habits.json"), "debug".into());
        assert_eq!(cfg.log_path, PathBuf::from("habitust.log"));
        assert_eq!(cfg.log_level, "debug");
    }
}
