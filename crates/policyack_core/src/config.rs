//! Runtime configuration for hosts embedding the core.
//!
//! # Responsibility
//! - Resolve database path and logging settings from the environment.
//! - Validate settings with the same rules as `init_logging`.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "POLICYACK_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "POLICYACK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "POLICYACK_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "policyack.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    /// Normalized level: `trace|debug|info|warn|error`.
    pub log_level: &'static str,
    /// Absolute directory for rolling logs; file logging is off when `None`.
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Resolves configuration from process environment variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration from an arbitrary variable lookup.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    /// - Unsupported log level.
    /// - Relative log directory.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));
        let log_level = match read(ENV_LOG_LEVEL) {
            Some(level) => normalize_level(&level)?,
            None => default_log_level(),
        };
        let log_dir = read(ENV_LOG_DIR)
            .map(|dir| normalize_log_dir(&dir))
            .transpose()?;

        Ok(Self {
            db_path,
            log_level,
            log_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, ENV_DB_PATH, ENV_LOG_DIR, ENV_LOG_LEVEL};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset_or_blank() {
        let config = CoreConfig::from_lookup(lookup(&[(ENV_LOG_LEVEL, "  ")])).unwrap();
        assert!(config.db_path.ends_with("policyack.sqlite3"));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn explicit_values_are_normalized() {
        let config = CoreConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/var/lib/policyack/state.db"),
            (ENV_LOG_LEVEL, "WARNING"),
            (ENV_LOG_DIR, "/var/log/policyack"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/policyack/state.db"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/policyack")));
    }

    #[test]
    fn relative_log_dir_is_rejected() {
        let err = CoreConfig::from_lookup(lookup(&[(ENV_LOG_DIR, "logs")])).unwrap_err();
        assert!(err.contains("absolute"));
    }
}
