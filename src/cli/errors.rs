//! CLI-specific error types
//!
//! All CLI errors are fatal. Errors from the library keep their own code in
//! the message.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::spec::SpecError;
use crate::table::TableError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout, report file)
    IoError,
    /// Spec could not be resolved
    SpecError,
    /// Build failed before producing a table
    BuildError,
    /// No source or output directory from flags, config or spec
    MissingDirectory,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "ADAM_CLI_CONFIG_ERROR",
            Self::IoError => "ADAM_CLI_IO_ERROR",
            Self::SpecError => "ADAM_CLI_SPEC_ERROR",
            Self::BuildError => "ADAM_CLI_BUILD_ERROR",
            Self::MissingDirectory => "ADAM_CLI_MISSING_DIRECTORY",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Directory not given anywhere
    pub fn missing_directory(field: &str) -> Self {
        Self::new(
            CliErrorCode::MissingDirectory,
            format!(
                "No {} given: pass a flag, set it in the config file or in the spec",
                field
            ),
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(format!("{}: {}", e.code(), e))
    }
}

impl From<SpecError> for CliError {
    fn from(e: SpecError) -> Self {
        Self::new(CliErrorCode::SpecError, e.to_string())
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        Self::new(CliErrorCode::BuildError, format!("{}: {}", e.code(), e))
    }
}

impl From<TableError> for CliError {
    fn from(e: TableError) -> Self {
        Self::io_error(format!("{}: {}", e.code(), e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
