use std::env;
use std::fmt;
use std::num::ParseIntError;
use std::path::PathBuf;

use crate::workflows::allocation::policy::PolicyLoadMode;

/// Distinguishes runtime behavior for different stages of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the allocator.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub policy: PolicyConfig,
    pub output: OutputConfig,
    pub telemetry: TelemetryConfig,
    pub academic_year: Option<u16>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let path = env::var("APP_POLICY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/policy.json"));
        let mode = match env::var("APP_POLICY_MODE") {
            Ok(value) => parse_policy_mode(&value)?,
            Err(_) => PolicyLoadMode::Strict,
        };

        let directory = env::var("APP_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("out"));

        let academic_year = match env::var("APP_ACADEMIC_YEAR") {
            Ok(value) => Some(
                value
                    .trim()
                    .parse::<u16>()
                    .map_err(|source| ConfigError::InvalidAcademicYear { source })?,
            ),
            Err(_) => None,
        };

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            policy: PolicyConfig { path, mode },
            output: OutputConfig { directory },
            telemetry: TelemetryConfig { log_level },
            academic_year,
        })
    }
}

fn parse_policy_mode(value: &str) -> Result<PolicyLoadMode, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "strict" => Ok(PolicyLoadMode::Strict),
        "migrate" => Ok(PolicyLoadMode::Migrate),
        _ => Err(ConfigError::InvalidPolicyMode {
            value: value.to_string(),
        }),
    }
}

/// Where the policy document lives and how strictly it is read.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub path: PathBuf,
    pub mode: PolicyLoadMode,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPolicyMode { value: String },
    InvalidAcademicYear { source: ParseIntError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPolicyMode { value } => write!(
                f,
                "APP_POLICY_MODE must be 'strict' or 'migrate' (got '{}')",
                value
            ),
            ConfigError::InvalidAcademicYear { .. } => {
                write!(f, "APP_ACADEMIC_YEAR must be a valid u16")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPolicyMode { .. } => None,
            ConfigError::InvalidAcademicYear { source } => Some(source),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    /// Serialises tests that read or write process environment variables.
    pub(crate) fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_POLICY_PATH");
        env::remove_var("APP_POLICY_MODE");
        env::remove_var("APP_OUTPUT_DIR");
        env::remove_var("APP_ACADEMIC_YEAR");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.policy.path, PathBuf::from("config/policy.json"));
        assert_eq!(config.policy.mode, PolicyLoadMode::Strict);
        assert_eq!(config.output.directory, PathBuf::from("out"));
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.academic_year, None);
    }

    #[test]
    fn reads_overrides_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        env::set_var("APP_POLICY_MODE", "Migrate");
        env::set_var("APP_ACADEMIC_YEAR", "1404");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(config.policy.mode, PolicyLoadMode::Migrate);
        assert_eq!(config.academic_year, Some(1404));
    }

    #[test]
    fn rejects_unknown_policy_mode() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_POLICY_MODE", "lenient");
        let result = AppConfig::load();
        reset_env();

        match result {
            Err(ConfigError::InvalidPolicyMode { value }) => assert_eq!(value, "lenient"),
            other => panic!("expected invalid policy mode, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_numeric_academic_year() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ACADEMIC_YEAR", "next");
        let result = AppConfig::load();
        reset_env();

        assert!(matches!(result, Err(ConfigError::InvalidAcademicYear { .. })));
    }
}
