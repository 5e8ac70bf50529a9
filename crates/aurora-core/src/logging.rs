//! Logging configuration
//!
//! The subscriber itself is installed by the binary; this is the serializable
//! part that lives in the config file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

const LOG_FILE_PREFIX: &str = "aurora_";
const LOG_FILE_SUFFIX: &str = ".log";

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace, debug, info, warn, error or off
    pub level: String,
    /// Log to stderr
    pub console_output: bool,
    /// Log to a daily file in `log_dir`
    pub file_output: bool,
    pub log_dir: PathBuf,
    /// Log files kept by [`cleanup_old_logs`](Self::cleanup_old_logs)
    pub max_log_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_dir: default_log_dir(),
            max_log_files: 10,
        }
    }
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("aurora").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

impl LogConfig {
    /// Level filter for `level`, INFO if unrecognised
    pub fn parse_level(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::INFO)
    }

    /// Create `log_dir` if needed
    ///
    /// # Errors
    ///
    /// Directory creation failures.
    pub fn ensure_log_directory(&self) -> io::Result<()> {
        fs::create_dir_all(&self.log_dir)
    }

    /// Path of today's log file
    pub fn current_log_path(&self) -> PathBuf {
        let date = chrono::Local::now().format("%Y-%m-%d");
        self.log_dir
            .join(format!("{LOG_FILE_PREFIX}{date}{LOG_FILE_SUFFIX}"))
    }

    /// Delete all but the newest `max_log_files` log files. Returns the
    /// number removed.
    ///
    /// # Errors
    ///
    /// Failure to read `log_dir` or to delete a file.
    pub fn cleanup_old_logs(&self) -> io::Result<usize> {
        if !self.log_dir.exists() {
            return Ok(0);
        }

        let mut logs: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| {
                        name.starts_with(LOG_FILE_PREFIX) && name.ends_with(LOG_FILE_SUFFIX)
                    })
            })
            .collect();

        if logs.len() <= self.max_log_files {
            return Ok(0);
        }

        // Dated names sort chronologically
        logs.sort();
        let excess = logs.len() - self.max_log_files;
        for path in &logs[..excess] {
            fs::remove_file(path)?;
        }
        Ok(excess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_level() {
        let mut config = LogConfig::default();
        assert_eq!(config.parse_level(), LevelFilter::INFO);

        config.level = "debug".to_string();
        assert_eq!(config.parse_level(), LevelFilter::DEBUG);

        config.level = "loud".to_string();
        assert_eq!(config.parse_level(), LevelFilter::INFO);
    }

    #[test]
    fn test_current_log_path() {
        let config = LogConfig {
            log_dir: PathBuf::from("/tmp/aurora-logs"),
            ..LogConfig::default()
        };
        let path = config.current_log_path();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("aurora_"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_cleanup_old_logs() {
        let dir = TempDir::new().unwrap();
        for day in 1..=5 {
            fs::write(dir.path().join(format!("aurora_2024-01-0{day}.log")), "x").unwrap();
        }
        fs::write(dir.path().join("other.txt"), "keep").unwrap();

        let config = LogConfig {
            log_dir: dir.path().to_path_buf(),
            max_log_files: 2,
            ..LogConfig::default()
        };

        assert_eq!(config.cleanup_old_logs().unwrap(), 3);
        assert!(dir.path().join("aurora_2024-01-05.log").exists());
        assert!(dir.path().join("aurora_2024-01-04.log").exists());
        assert!(!dir.path().join("aurora_2024-01-01.log").exists());
        assert!(dir.path().join("other.txt").exists());
    }
}
