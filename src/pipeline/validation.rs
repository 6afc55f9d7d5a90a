// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Configuration validation
//!
//! Validates a pipeline configuration before any pool is started.

use std::collections::HashSet;

use crate::pipeline::PipelineConfig;

/// Configuration validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline configuration
    pub fn validate(config: &PipelineConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_io(config, &mut result);
        Self::validate_compute(config, &mut result);
        Self::validate_thread_names(config, &mut result);

        if config.fetch.timeout_secs == 0 {
            result.add_error("fetch.timeout_secs must be greater than zero");
        }
        if config.fetch.max_bytes == 0 {
            result.add_error("fetch.max_bytes must be greater than zero");
        }

        result
    }

    fn validate_io(config: &PipelineConfig, result: &mut ValidationResult) {
        if config.io.worker_threads == 0 {
            result.add_error("io.worker_threads must be at least 1");
        }

        match config.io.max_blocking_threads {
            0 => result.add_error("io.max_blocking_threads must be at least 1"),
            1 => result.add_warning(
                "io.max_blocking_threads is 1: concurrent runs will fetch one at a time",
            ),
            _ => {}
        }
    }

    fn validate_compute(config: &PipelineConfig, result: &mut ValidationResult) {
        let Some(threads) = config.compute.threads else {
            return;
        };

        if threads == 0 {
            result.add_error("compute.threads must be at least 1 (omit it to use all cores)");
            return;
        }

        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        if threads > cores {
            result.add_warning(&format!(
                "compute.threads ({}) exceeds available parallelism ({}); \
                 CPU-bound stages will be oversubscribed",
                threads, cores
            ));
        }
    }

    fn validate_thread_names(config: &PipelineConfig, result: &mut ValidationResult) {
        let names = [
            ("io.thread_name", &config.io.thread_name),
            ("compute.thread_name", &config.compute.thread_name),
            ("consumer.thread_name", &config.consumer.thread_name),
        ];

        let mut seen = HashSet::new();
        for (key, name) in names {
            if name.trim().is_empty() {
                result.add_error(&format!("{} must not be empty", key));
            } else if !seen.insert(name.as_str()) {
                result.add_warning(&format!(
                    "{} '{}' is shared with another pool; logs will not tell them apart",
                    key, name
                ));
            }
        }
    }
}

/// Result of configuration validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let result = PipelineValidator::validate(&PipelineConfig::default());
        assert!(result.is_valid());
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let mut config = PipelineConfig::default();
        config.io.max_blocking_threads = 0;
        config.compute.threads = Some(0);

        let result = PipelineValidator::validate(&config);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("io.max_blocking_threads")));
        assert!(result.errors.iter().any(|e| e.contains("compute.threads")));
    }

    #[test]
    fn test_single_blocking_thread_warns() {
        let mut config = PipelineConfig::default();
        config.io.max_blocking_threads = 1;

        let result = PipelineValidator::validate(&config);
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("one at a time")));
    }

    #[test]
    fn test_oversubscribed_compute_warns() {
        let mut config = PipelineConfig::default();
        config.compute.threads = Some(100_000);

        let result = PipelineValidator::validate(&config);
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("oversubscribed")));
    }

    #[test]
    fn test_thread_names() {
        let mut config = PipelineConfig::default();
        config.consumer.thread_name = config.io.thread_name.clone();
        config.compute.thread_name = "  ".into();

        let result = PipelineValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("compute.thread_name")));
        assert!(result.warnings.iter().any(|w| w.contains("consumer.thread_name")));
    }
}
