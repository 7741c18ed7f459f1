use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::{CommandSpec, Config};

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid context_limit: {0}. Must be at least 1")]
    InvalidContextLimit(usize),

    #[error("Invalid max_tokens: {0}. Must be at least 1")]
    InvalidMaxTokens(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid complexity threshold: {0}. Must be positive")]
    InvalidComplexityThreshold(f64),

    #[error("Command '{0}' is empty")]
    EmptyCommand(String),

    #[error("Acceptance criterion #{0} is blank")]
    BlankCriterion(usize),
}

impl ConfigError {
    /// Actionable suggestion for the user
    pub const fn hint(&self) -> &'static str {
        match self {
            Self::InvalidContextLimit(_) | Self::InvalidMaxTokens(_) => {
                "Set judge.context_limit and judge.max_tokens to the limits of the judge model."
            }
            Self::InvalidBackoff(_, _) => {
                "Lower judge.initial_backoff_ms or raise judge.max_backoff_ms."
            }
            Self::InvalidLogLevel(_) | Self::InvalidLogFormat(_) => {
                "Fix the logging section in .arbiter/config.yaml."
            }
            Self::InvalidComplexityThreshold(_) => {
                "Set metrics.complexity.threshold to a positive number."
            }
            Self::EmptyCommand(_) => "Remove the empty command or give it a command line.",
            Self::BlankCriterion(_) => {
                "Remove the blank entry from metrics.fulfillment.criteria or give it text."
            }
        }
    }
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .arbiter/config.yaml (project config)
    /// 3. .arbiter/local.yaml (project local overrides, optional)
    /// 4. Environment variables (ARBITER_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".arbiter/config.yaml"))
            .merge(Yaml::file(".arbiter/local.yaml"))
            .merge(Env::prefixed("ARBITER_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("ARBITER_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let judge = &config.judge;
        if judge.context_limit == 0 {
            return Err(ConfigError::InvalidContextLimit(judge.context_limit));
        }

        if judge.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens(judge.max_tokens));
        }

        if judge.initial_backoff_ms > judge.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                judge.initial_backoff_ms,
                judge.max_backoff_ms,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let threshold = config.metrics.complexity.threshold;
        if threshold.is_nan() || threshold <= 0.0 {
            return Err(ConfigError::InvalidComplexityThreshold(threshold));
        }

        if let Some(index) = config
            .metrics
            .fulfillment
            .criteria
            .iter()
            .position(|c| c.trim().is_empty())
        {
            return Err(ConfigError::BlankCriterion(index + 1));
        }

        let functional = &config.metrics.functional;
        let commands = config
            .metrics
            .code_quality
            .commands
            .iter()
            .chain(functional.build.iter())
            .chain(functional.test.iter())
            .chain(functional.coverage.iter());
        for spec in commands {
            validate_command(spec)?;
        }

        Ok(())
    }
}

fn validate_command(spec: &CommandSpec) -> Result<(), ConfigError> {
    if spec.command.trim().is_empty() {
        return Err(ConfigError::EmptyCommand(spec.name.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::MetricKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.judge.max_retries, 3);
        assert_eq!(config.judge.initial_backoff_ms, 1000);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_validate_zero_context_limit() {
        let mut config = Config::default();
        config.judge.context_limit = 0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidContextLimit(0))
        ));
    }

    #[test]
    fn test_validate_zero_max_tokens() {
        let mut config = Config::default();
        config.judge.max_tokens = 0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxTokens(0))
        ));
    }

    #[test]
    fn test_validate_invalid_backoff() {
        let mut config = Config::default();
        config.judge.initial_backoff_ms = 30000;
        config.judge.max_backoff_ms = 10000;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(30000, 10000))
        ));
    }

    #[test]
    fn test_validate_zero_retries_allowed() {
        let mut config = Config::default();
        config.judge.max_retries = 0;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogFormat(format)) => assert_eq!(format, "xml"),
            other => panic!("Expected InvalidLogFormat error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_non_positive_threshold() {
        let mut config = Config::default();
        config.metrics.complexity.threshold = 0.0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidComplexityThreshold(_))
        ));
    }

    #[test]
    fn test_validate_empty_command() {
        let mut config = Config::default();
        config.metrics.functional.test = Some(CommandSpec::new("   "));

        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyCommand(_)));
        assert!(err.hint().contains("command"));
    }

    #[test]
    fn test_validate_blank_criterion() {
        let mut config = Config::default();
        config.metrics.fulfillment.criteria = vec!["Adds tests".to_string(), "  ".to_string()];

        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::BlankCriterion(2)));
        assert!(err.hint().contains("criteria"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "judge:\n  model: claude-haiku-4-5\nmetrics:\n  enabled: [efficiency]\n  functional:\n    test:\n      command: cargo test"
        )
        .unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.judge.model, "claude-haiku-4-5");
        assert_eq!(config.metrics.enabled, vec![MetricKind::Efficiency]);
        assert_eq!(
            config.metrics.functional.test.as_ref().map(|t| t.command.as_str()),
            Some("cargo test")
        );
        assert_eq!(config.judge.max_retries, 3, "Defaults should fill gaps");
    }

    #[test]
    fn test_load_from_file_rejects_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "logging:\n  level: loud").unwrap();
        file.flush().unwrap();

        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_env_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "judge:\n  max_retries: 1").unwrap();
        file.flush().unwrap();

        temp_env::with_vars(
            [
                ("ARBITER_JUDGE__MAX_RETRIES", Some("5")),
                ("ARBITER_LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(config.judge.max_retries, 5, "Env should win over file");
                assert_eq!(config.logging.level, "debug");
            },
        );
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "judge:\n  model: base-model\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(
            override_file,
            "judge:\n  model: override-model\nlogging:\n  level: debug"
        )
        .unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.judge.model, "override-model", "Override should win");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }
}
