//! Checker configuration.
//!
//! `Config` deserializes from whatever format the host uses; `from_env`
//! covers the common case of environment variables.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::message::{MessageKey, Messages};
use crate::version::ServerVersion;

/// Set to anything but `0` or `false` to disable every check in the process.
pub const SAFETY_ASSURED_ENV: &str = "SAFETY_ASSURED";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Migrations with a version at or before this one are never checked.
    pub start_after: u64,
    /// Check migrations running down as well as up.
    pub check_down: bool,
    /// Evaluate against this server version instead of asking the database.
    pub target_version: Option<ServerVersion>,
    /// Refuse operations the checker has no rule for instead of allowing them.
    pub strict_unknown: bool,
    /// Also refuse non-unique indexes on more than three columns.
    pub index_best_practices: bool,
    /// Template overrides per message key.
    pub messages: HashMap<MessageKey, String>,
}

impl Config {
    /// Read `SAFESHIFT_START_AFTER`, `SAFESHIFT_CHECK_DOWN`,
    /// `SAFESHIFT_TARGET_VERSION`, `SAFESHIFT_STRICT_UNKNOWN` and
    /// `SAFESHIFT_INDEX_BEST_PRACTICES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(value) = lookup("SAFESHIFT_START_AFTER") {
            config.start_after = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "SAFESHIFT_START_AFTER",
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup("SAFESHIFT_CHECK_DOWN") {
            config.check_down = parse_flag("SAFESHIFT_CHECK_DOWN", &value)?;
        }

        if let Some(value) = lookup("SAFESHIFT_TARGET_VERSION") {
            let version = value.parse().map_err(|_| ConfigError::InvalidValue {
                var: "SAFESHIFT_TARGET_VERSION",
                value: value.clone(),
            })?;
            config.target_version = Some(version);
        }

        if let Some(value) = lookup("SAFESHIFT_STRICT_UNKNOWN") {
            config.strict_unknown = parse_flag("SAFESHIFT_STRICT_UNKNOWN", &value)?;
        }

        if let Some(value) = lookup("SAFESHIFT_INDEX_BEST_PRACTICES") {
            config.index_best_practices = parse_flag("SAFESHIFT_INDEX_BEST_PRACTICES", &value)?;
        }

        Ok(config)
    }

    pub fn messages(&self) -> Messages {
        Messages::new(self.messages.clone())
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

/// Whether the process-wide escape hatch is set.
pub fn safety_assured_by_env() -> bool {
    env_flag_set(std::env::var(SAFETY_ASSURED_ENV).ok().as_deref())
}

fn env_flag_set(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") | Some("0") => false,
        Some(v) => !v.eq_ignore_ascii_case("false"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name: &str| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults_check_everything_up() {
        let config = Config::default();
        assert_eq!(config.start_after, 0);
        assert!(!config.check_down);
        assert!(config.target_version.is_none());
        assert!(!config.strict_unknown);
        assert!(!config.index_best_practices);
    }

    #[test]
    fn reads_environment() {
        let vars = [
            ("SAFESHIFT_START_AFTER", "20240101000000"),
            ("SAFESHIFT_CHECK_DOWN", "true"),
            ("SAFESHIFT_TARGET_VERSION", "10.5"),
            ("SAFESHIFT_STRICT_UNKNOWN", "0"),
            ("SAFESHIFT_INDEX_BEST_PRACTICES", "on"),
        ];
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.start_after, 20240101000000);
        assert!(config.check_down);
        assert_eq!(config.target_version, Some(ServerVersion::new(10, 5, 0)));
        assert!(!config.strict_unknown);
        assert!(config.index_best_practices);
    }

    #[test]
    fn rejects_garbage() {
        let vars = [("SAFESHIFT_TARGET_VERSION", "latest")];
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for SAFESHIFT_TARGET_VERSION: \"latest\""
        );

        let vars = [("SAFESHIFT_CHECK_DOWN", "maybe")];
        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"target_version": "12", "messages": {"rename_table": "nope"}}"#,
        )
        .unwrap();

        assert_eq!(config.target_version, Some(ServerVersion::new(12, 0, 0)));
        assert!(!config.check_down);
        assert_eq!(config.messages().template(MessageKey::RenameTable), "nope");
    }

    #[test]
    fn escape_hatch_values() {
        assert!(!env_flag_set(None));
        assert!(!env_flag_set(Some("")));
        assert!(!env_flag_set(Some("0")));
        assert!(!env_flag_set(Some("FALSE")));
        assert!(env_flag_set(Some("1")));
        assert!(env_flag_set(Some("yes")));
    }
}
