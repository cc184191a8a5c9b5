//! Configuration management for TaskBox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use taskbox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Broker: {}:{}", config.broker.host, config.broker.port);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `TASKBOX__<section>__<key>`
//!
//! Examples:
//! - `TASKBOX__BROKER__HOST=rabbit.internal`
//! - `TASKBOX__WORKER__PREFETCH=4`
//! - `TASKBOX__MAIL__SMTP_HOST=smtp.example.com`
//!
//! Secrets (`TASKBOX_BROKER_PASSWORD`, `TASKBOX_SMTP_PASSWORD`) are read from
//! the environment only and never from the TOML file.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/taskbox.toml`.
//! This can be overridden using the `TASKBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

// Re-export public types
pub use models::{BrokerSettings, Config, MailSettings, WorkerSettings};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`TASKBOX__*`)
    /// 2. TOML file (default: `config/taskbox.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or validation
    /// fails (empty queue name, zero prefetch, missing from-address).
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
