use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::allocation::{AllocationError, PolicyError};
use crate::workflows::counter::CounterError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Policy(PolicyError),
    Allocation(AllocationError),
    Counter(CounterError),
}

impl AppError {
    /// Process exit code; policy problems are distinguished from data problems.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::Telemetry(_) => 2,
            AppError::Policy(_) => 3,
            AppError::Allocation(_) | AppError::Counter(_) | AppError::Csv(_) => 4,
            AppError::Io(_) | AppError::Json(_) => 1,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Csv(err) => write!(f, "csv error: {}", err),
            AppError::Json(err) => write!(f, "json error: {}", err),
            AppError::Policy(err) => write!(f, "policy error: {}", err),
            AppError::Allocation(err) => write!(f, "allocation error: {}", err),
            AppError::Counter(err) => write!(f, "counter error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Csv(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Policy(err) => Some(err),
            AppError::Allocation(err) => Some(err),
            AppError::Counter(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<PolicyError> for AppError {
    fn from(value: PolicyError) -> Self {
        Self::Policy(value)
    }
}

impl From<AllocationError> for AppError {
    fn from(value: AllocationError) -> Self {
        match value {
            AllocationError::Policy(err) => Self::Policy(err),
            other => Self::Allocation(other),
        }
    }
}

impl From<CounterError> for AppError {
    fn from(value: CounterError) -> Self {
        Self::Counter(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::allocation::TableKind;

    #[test]
    fn allocation_policy_errors_surface_as_policy_errors() {
        let error = AppError::from(AllocationError::Policy(PolicyError::MissingSection(
            "join_keys",
        )));
        assert!(matches!(error, AppError::Policy(_)));
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn display_keeps_domain_message() {
        let error = AppError::from(AllocationError::BlankIdentifier {
            table: TableKind::Pool,
            row: 4,
        });
        assert_eq!(
            error.to_string(),
            "allocation error: pool row 4 has a blank identifier"
        );
    }
}
