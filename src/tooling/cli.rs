//! Hook CLI
//!
//! One subcommand per hook event. The context loads configuration, wires up
//! logging, and dispatches the inbound document to the matching entry point.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::api::HookApi;
use crate::config::OmcConfig;
use crate::error::ApiError;
use crate::logging;
use crate::protocol::{self, HookInput};

/// OMC hook - mode orchestration and continuation enforcement
#[derive(Parser)]
#[command(name = "omc-hook")]
#[command(about = "Mode orchestration and continuation enforcement for agent sessions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (file, stderr, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a submitted prompt and activate matched modes
    Prompt,
    /// Decide whether the agent may stop
    Stop,
    /// Restore priority context and active modes at session start
    SessionStart,
}

/// Execution context for hook commands.
pub struct CliContext {
    api: HookApi,
    input_timeout: Duration,
}

impl CliContext {
    /// Load configuration, initialize logging, and build the API facade.
    ///
    /// A logging initialization failure is reported on stderr and otherwise
    /// ignored: the hook must stay available even when its log destination
    /// is not.
    pub fn new(cli: &Cli) -> Result<Self, ApiError> {
        let mut config = Self::load_config(cli)?;
        Self::apply_log_overrides(cli, &mut config);

        if let Err(e) = logging::init_logging(Some(&config.logging)) {
            eprintln!("omc-hook: logging disabled: {}", e);
        }

        let input_timeout = Duration::from_millis(config.input_timeout_ms);
        Ok(Self {
            api: HookApi::new(config),
            input_timeout,
        })
    }

    fn load_config(cli: &Cli) -> Result<OmcConfig, ApiError> {
        if let Some(path) = &cli.config {
            return OmcConfig::load_from_file(path);
        }
        let project_root = std::env::current_dir()
            .map_err(|e| ApiError::ConfigError(format!("Cannot resolve working directory: {e}")))?;
        Ok(OmcConfig::load(&project_root).unwrap_or_else(|e| {
            eprintln!("omc-hook: using default configuration: {}", e);
            OmcConfig::default()
        }))
    }

    fn apply_log_overrides(cli: &Cli, config: &mut OmcConfig) {
        if let Some(level) = &cli.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &cli.log_format {
            config.logging.format = format.clone();
        }
        if let Some(output) = &cli.log_output {
            config.logging.output = output.clone();
        }
        if let Some(file) = &cli.log_file {
            config.logging.file = Some(file.clone());
        }
    }

    /// Read the inbound document and execute a command, returning the
    /// serialized outbound document.
    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let input = protocol::read_input(self.input_timeout).await;
        Ok(self.dispatch(command, &input).to_json())
    }

    /// Dispatch an already-parsed document. Split out for tests.
    pub fn dispatch(&self, command: &Commands, input: &HookInput) -> crate::protocol::HookOutput {
        match command {
            Commands::Prompt => self.api.on_prompt(input),
            Commands::Stop => self.api.on_stop(input),
            Commands::SessionStart => self.api.on_session_start(input),
        }
    }
}
