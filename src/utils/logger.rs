use crate::config::{LogFormat, LoggingConfig};
use crate::utils::error::{IntakeError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn filter_for(directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
}

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Filter directive for the crate's own events at `level`.
pub fn filter_directive(level: &str) -> Result<String> {
    let level = level.trim().to_ascii_lowercase();
    if !LEVELS.contains(&level.as_str()) {
        return Err(IntakeError::Config {
            field: "logging.level".to_string(),
            message: format!("Unknown log level '{}', expected one of {:?}", level, LEVELS),
        });
    }
    Ok(format!("finetune_intake={}", level))
}

fn already_initialised(e: impl std::fmt::Display) -> IntakeError {
    IntakeError::Config {
        field: "logging".to_string(),
        message: format!("Failed to install subscriber: {}", e),
    }
}

pub fn init_logger(verbose: bool) -> Result<()> {
    if verbose {
        init_compact("finetune_intake=debug,info")
    } else {
        init_compact("finetune_intake=info")
    }
}

fn init_compact(directive: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(filter_for(directive))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init()
        .map_err(already_initialised)
}

/// JSON lines, for hosted front ends that ship logs to a collector.
pub fn init_json_logger() -> Result<()> {
    init_json("finetune_intake=info")
}

fn init_json(directive: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(filter_for(directive))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .try_init()
        .map_err(already_initialised)
}

pub fn init_from_config(config: &LoggingConfig) -> Result<()> {
    let directive = filter_directive(&config.level)?;
    match config.format {
        LogFormat::Json => init_json(&directive),
        LogFormat::Compact => init_compact(&directive),
    }
}
