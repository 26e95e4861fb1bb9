use std::fs;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use clap::builder::BoolishValueParser;
use clap::Parser;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error_handling::types::ConfigError;

/// Process-wide capture settings.
///
/// Values can come from a TOML file ([`CaptureConfig::from_file`]), from the
/// environment ([`CaptureConfig::from_env`]) or from explicit arguments.
///
/// # Fields Overview
///
/// - `passthrough`: forward captured writes to the real sinks as well. Used
///   when a scope is entered without an explicit choice.
/// - `capture_logging_writers`: redirect logging handlers bound to a
///   captured channel, not only the process handles.
#[derive(Parser, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[command(name = "testdata")]
#[serde(default)]
pub struct CaptureConfig {
    /// Forward captured writes to the real sinks.
    ///
    /// # Environment
    /// `TESTDATA_PASSTHROUGH` (`true`/`false`, `1`/`0`, `yes`/`no`)
    #[arg(
        long,
        env = "TESTDATA_PASSTHROUGH",
        default_value_t = false,
        value_parser = BoolishValueParser::new(),
        action = clap::ArgAction::Set
    )]
    pub passthrough: bool,

    /// Redirect logging handlers whose writer is a captured sink.
    ///
    /// # Environment
    /// `TESTDATA_CAPTURE_LOGGING`
    #[arg(
        long,
        env = "TESTDATA_CAPTURE_LOGGING",
        default_value_t = true,
        value_parser = BoolishValueParser::new(),
        action = clap::ArgAction::Set
    )]
    pub capture_logging_writers: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            passthrough: false,
            capture_logging_writers: true,
        }
    }
}

impl CaptureConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: CaptureConfig =
            toml::from_str(&content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        debug!("Loaded capture configuration from {}", path.display());
        Ok(config)
    }

    /// Reads settings from the environment only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_args(["testdata"])
    }

    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        CaptureConfig::try_parse_from(args).map_err(|e| ConfigError::ArgsError(e.to_string()))
    }
}

static GLOBAL: RwLock<Option<CaptureConfig>> = RwLock::new(None);

/// The process-wide configuration, read from the environment on first use.
pub fn global() -> CaptureConfig {
    if let Some(config) = GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        return config.clone();
    }
    let config = CaptureConfig::from_env().unwrap_or_else(|e| {
        debug!("Falling back to default capture configuration: {}", e);
        CaptureConfig::default()
    });
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert(config)
        .clone()
}

/// Replaces the process-wide configuration and returns the previous one.
pub fn set_global(config: CaptureConfig) -> Option<CaptureConfig> {
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(config)
}

/// Forgets the process-wide configuration so the next [`global`] call reads
/// the environment again.
pub fn reset_global() {
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
}
