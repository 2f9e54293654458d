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

    /// Convert the first error into a [`ConfigError`].
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

        Self::validate_scheduler(config, &mut result);
        Self::validate_metrics(config, &mut result);
        Self::validate_scan(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_scheduler(config: &Config, result: &mut ValidationResult) {
        if config.scheduler.thread_count == 0 {
            result.add_error(ValidationError::new(
                "scheduler.thread_count",
                "thread_count must be greater than 0",
            ));
        }

        if config.scheduler.thread_count > 256 {
            result.add_warning(ValidationWarning::new(
                "scheduler.thread_count",
                "thread_count is very high (>256), every running job holds a blocking thread",
            ));
        }

        if config.scheduler.instance_name.trim().is_empty() {
            result.add_error(ValidationError::new(
                "scheduler.instance_name",
                "instance_name cannot be empty",
            ));
        }

        if !config.scheduler.wait_for_jobs_on_shutdown {
            result.add_warning(ValidationWarning::new(
                "scheduler.wait_for_jobs_on_shutdown",
                "running jobs will be abandoned on shutdown",
            ));
        }
    }

    fn validate_metrics(config: &Config, result: &mut ValidationResult) {
        if config.metrics.capacity == 0 {
            result.add_error(ValidationError::new(
                "metrics.capacity",
                "capacity must be greater than 0",
            ));
        }
    }

    fn validate_scan(config: &Config, result: &mut ValidationResult) {
        for (i, ns) in config.scan.namespaces.iter().enumerate() {
            if ns.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("scan.namespaces[{}]", i),
                    "namespace cannot be empty",
                ));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for ns in &config.scan.namespaces {
            if !seen.insert(ns.as_str()) {
                result.add_warning(ValidationWarning::new(
                    "scan.namespaces",
                    format!("namespace '{}' is listed more than once", ns),
                ));
            }
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

        // Anything with a directive separator is treated as a full filter.
        let level = config.logging.level.as_str();
        if !level.contains('=') && !level.contains(',') && !LEVELS.contains(&level) {
            result.add_error(ValidationError::new(
                "logging.level",
                format!("unknown log level '{}'", level),
            ));
        }

        if config.logging.directory.is_some() && config.logging.max_files == 0 {
            result.add_warning(ValidationWarning::new(
                "logging.max_files",
                "max_files is 0, rotated log files are never pruned",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
