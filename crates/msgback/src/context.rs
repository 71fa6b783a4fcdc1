//! Per-run state computed once at batch start.
//!
//! The log directory name, staging root, and batch options are fixed for the
//! lifetime of one invocation and threaded through every operation instead of
//! living in module globals.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::Config;

pub struct RunContext {
    log_dir: PathBuf,
    staging_root: PathBuf,
    message_extension: String,
    cap: Option<usize>,
}

impl RunContext {
    /// Builds the context for a run starting now. Creates the run's log
    /// directory.
    pub fn create(config: &Config, bounded: bool) -> io::Result<Self> {
        Self::create_at(config, bounded, Utc::now())
    }

    /// Builds the context with an injected start time.
    pub fn create_at(config: &Config, bounded: bool, started_at: DateTime<Utc>) -> io::Result<Self> {
        let log_dir = config
            .log_root
            .join(format!("log_{}", started_at.format("%Y-%m-%d_%H-%M-%S")));
        std::fs::create_dir_all(&log_dir)?;

        Ok(Self {
            log_dir,
            staging_root: config.staging_dir.clone(),
            message_extension: config.message_extension.clone(),
            cap: bounded.then_some(config.batch_cap),
        })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    pub fn message_extension(&self) -> &str {
        &self.message_extension
    }

    /// Maximum documents for this run, `None` for an unbounded batch.
    pub fn cap(&self) -> Option<usize> {
        self.cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn test_config(root: &Path) -> Config {
        let json = format!(
            r#"{{
                "loginUrl": "https://login.example.com",
                "username": "ops@example.com",
                "clientId": {{}},
                "clientSecret": {{}},
                "password": {{}},
                "stagingDir": "{root}/files",
                "logRoot": "{root}/logs"
            }}"#,
            root = root.display()
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_log_dir_named_by_start_time() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        let started = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();

        let ctx = RunContext::create_at(&config, true, started).unwrap();

        assert!(ctx.log_dir().ends_with("log_2026-03-14_09-26-53"));
        assert!(ctx.log_dir().is_dir());
    }

    #[test]
    fn test_bounded_run_uses_configured_cap() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        let started = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();

        let bounded = RunContext::create_at(&config, true, started).unwrap();
        assert_eq!(bounded.cap(), Some(30));

        let unbounded = RunContext::create_at(&config, false, started).unwrap();
        assert_eq!(unbounded.cap(), None);
    }
}
