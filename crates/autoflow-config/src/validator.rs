//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Convert into the first error, if any.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::InvalidValue {
                field: err.path,
                message: err.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_engine(config, &mut result);
        Self::validate_monitor(config, &mut result);
        Self::validate_scheduler(config, &mut result);
        Self::validate_coordinator(config, &mut result);
        Self::validate_reasoning(config, &mut result);

        result
    }

    fn validate_engine(config: &Config, result: &mut ValidationResult) {
        if config.engine.critical_steps.is_empty() {
            result.add_warning(ValidationWarning::new(
                "engine.critical_steps",
                "No critical steps configured, a failing step will never abort a workflow",
            ));
        }

        if config.engine.critical_steps.iter().any(|s| s.trim().is_empty()) {
            result.add_error(ValidationError::new(
                "engine.critical_steps",
                "Critical step names cannot be empty",
            ));
        }

        if config.engine.history_limit == 0 {
            result.add_warning(ValidationWarning::new(
                "engine.history_limit",
                "history_limit is 0, workflow history will grow without bound",
            ));
        }
    }

    fn validate_monitor(config: &Config, result: &mut ValidationResult) {
        let monitor = &config.monitor;

        if monitor.sample_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "monitor.sample_interval_ms",
                "sample_interval_ms must be greater than 0",
            ));
        }

        if monitor.completion_check_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "monitor.completion_check_interval_ms",
                "completion_check_interval_ms must be greater than 0",
            ));
        }

        if monitor.memory_ceiling_mb <= 0.0 {
            result.add_error(ValidationError::new(
                "monitor.memory_ceiling_mb",
                "memory_ceiling_mb must be greater than 0",
            ));
        }

        if monitor.cpu_ceiling_percent <= 0.0 {
            result.add_error(ValidationError::new(
                "monitor.cpu_ceiling_percent",
                "cpu_ceiling_percent must be greater than 0",
            ));
        } else if monitor.cpu_ceiling_percent > 100.0 {
            result.add_warning(ValidationWarning::new(
                "monitor.cpu_ceiling_percent",
                "cpu_ceiling_percent is above 100, the CPU alert can only fire on multi-core saturation",
            ));
        }

        if monitor.duration_ceiling_secs == 0 {
            result.add_error(ValidationError::new(
                "monitor.duration_ceiling_secs",
                "duration_ceiling_secs must be greater than 0",
            ));
        }

        if monitor.error_count_ceiling == 0 {
            result.add_error(ValidationError::new(
                "monitor.error_count_ceiling",
                "error_count_ceiling must be greater than 0",
            ));
        }
    }

    fn validate_scheduler(config: &Config, result: &mut ValidationResult) {
        if config.scheduler.min_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "scheduler.min_interval_ms",
                "min_interval_ms must be greater than 0",
            ));
        }

        if config.scheduler.event_capacity == 0 {
            result.add_error(ValidationError::new(
                "scheduler.event_capacity",
                "event_capacity must be greater than 0",
            ));
        }
    }

    fn validate_coordinator(config: &Config, result: &mut ValidationResult) {
        if config.coordinator.memory_reference_mb <= 0.0 {
            result.add_error(ValidationError::new(
                "coordinator.memory_reference_mb",
                "memory_reference_mb must be greater than 0",
            ));
        }

        if config.coordinator.cpu_reference_percent <= 0.0 {
            result.add_error(ValidationError::new(
                "coordinator.cpu_reference_percent",
                "cpu_reference_percent must be greater than 0",
            ));
        }
    }

    fn validate_reasoning(config: &Config, result: &mut ValidationResult) {
        let reasoning = &config.reasoning;

        if reasoning.api_key.is_none() {
            result.add_warning(ValidationWarning::new(
                "reasoning.api_key",
                "API key is not set, steps without an executor will return degraded results",
            ));
        }

        if !reasoning.base_url.starts_with("http://") && !reasoning.base_url.starts_with("https://")
        {
            result.add_error(ValidationError::new(
                "reasoning.base_url",
                "base_url must start with http:// or https://",
            ));
        }

        if reasoning.timeout_seconds == 0 {
            result.add_error(ValidationError::new(
                "reasoning.timeout_seconds",
                "timeout_seconds must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
