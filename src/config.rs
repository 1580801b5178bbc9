//! Configuration
//!
//! Layered configuration in the usual precedence order: defaults, then the
//! global file `<home>/.omc/config.toml`, then the project file
//! `<project>/.omc/config.toml`, then `OMC_*` environment variables with `__`
//! as the nesting separator.

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::state::{DEFAULT_COMPLETION_PROMISE, DEFAULT_MAX_ITERATIONS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OmcConfig {
    /// Iteration ceiling applied to loop-type activations that carry no
    /// explicit count.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Completion-promise token written into loop-type activations.
    #[serde(default = "default_completion_promise")]
    pub completion_promise: String,

    /// Deadline for reading the inbound document from stdin.
    #[serde(default = "default_input_timeout_ms")]
    pub input_timeout_ms: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_completion_promise() -> String {
    DEFAULT_COMPLETION_PROMISE.to_string()
}

fn default_input_timeout_ms() -> u64 {
    crate::protocol::DEFAULT_INPUT_TIMEOUT_MS
}

impl Default for OmcConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            completion_promise: default_completion_promise(),
            input_timeout_ms: default_input_timeout_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

impl OmcConfig {
    /// Load configuration from the standard sources.
    pub fn load(project_root: &Path) -> Result<Self, ApiError> {
        let mut builder = Config::builder();
        if let Some(home) = crate::state::paths::home_dir() {
            builder = builder.add_source(
                File::from(home.join(".omc").join("config.toml")).required(false),
            );
        }
        builder = builder
            .add_source(
                File::from(project_root.join(".omc").join("config.toml")).required(false),
            )
            .add_source(Environment::with_prefix("OMC").separator("__").try_parsing(true));

        builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| ApiError::ConfigError(format!("Failed to load configuration: {e}")))
    }

    /// Load configuration from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<Self, ApiError> {
        Config::builder()
            .add_source(File::from(path.to_path_buf()))
            .add_source(Environment::with_prefix("OMC").separator("__").try_parsing(true))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| {
                ApiError::ConfigError(format!(
                    "Failed to load configuration from {}: {e}",
                    path.display()
                ))
            })
    }
}
