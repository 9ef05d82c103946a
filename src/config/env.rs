//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "TESTPOOL";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Worker limit from TESTPOOL_MAX_CHILDREN
    pub max_children: Option<usize>,
    /// Artifact directory from TESTPOOL_ARTIFACT_DIR
    pub artifact_dir: Option<String>,
    /// Test-name filter from TESTPOOL_FILTER
    pub filter: Option<String>,
    /// Color suppression from TESTPOOL_NO_COLOR
    pub no_color: Option<bool>,
    /// Log level from TESTPOOL_LOG
    pub log: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            max_children: get_env_parse("MAX_CHILDREN"),
            artifact_dir: get_env("ARTIFACT_DIR"),
            filter: get_env("FILTER"),
            no_color: get_env_bool("NO_COLOR"),
            log: get_env("LOG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.max_children.is_some()
            || self.artifact_dir.is_some()
            || self.filter.is_some()
            || self.no_color.is_some()
            || self.log.is_some()
    }
}

fn get_env(suffix: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{suffix}")).ok()
}

fn get_env_parse<T: std::str::FromStr>(suffix: &str) -> Option<T> {
    get_env(suffix).and_then(|v| v.parse().ok())
}

fn get_env_bool(suffix: &str) -> Option<bool> {
    get_env(suffix).map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_worker_limit() {
        env::set_var("TESTPOOL_MAX_CHILDREN", "8");
        let config = EnvConfig::load();
        env::remove_var("TESTPOOL_MAX_CHILDREN");

        assert_eq!(config.max_children, Some(8));
        assert!(config.has_any());
    }

    #[test]
    fn bool_values_accept_common_spellings() {
        for value in ["1", "true", "YES"] {
            env::set_var("TESTPOOL_NO_COLOR", value);
            assert_eq!(EnvConfig::load().no_color, Some(true), "value {value}");
        }
        env::set_var("TESTPOOL_NO_COLOR", "0");
        assert_eq!(EnvConfig::load().no_color, Some(false));
        env::remove_var("TESTPOOL_NO_COLOR");
    }
}
