//! Error types for applications and modules.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by the application lifecycle and the web layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Application is already running")]
    AlreadyRunning,

    #[error("Application is not running")]
    NotRunning,

    #[error("Another application instance is already running")]
    InstanceConflict,

    #[error("Modules cannot be registered after the application has started")]
    RegistrationClosed,

    #[error("A different module named '{0}' is already registered")]
    DuplicateModule(String),

    #[error("Module '{module}' failed to initialize: {source}")]
    ModuleInit {
        module: String,
        #[source]
        source: ModuleError,
    },

    #[error("Settings error: {0}")]
    Settings(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// True for errors caused by calling an operation in the wrong lifecycle state.
    pub fn is_illegal_state(&self) -> bool {
        matches!(
            self,
            AppError::AlreadyRunning
                | AppError::NotRunning
                | AppError::InstanceConflict
                | AppError::RegistrationClosed
        )
    }
}

/// Errors raised by modules.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Module '{0}' is not active")]
    Inactive(String),

    #[error("Module '{0}' is already initialized")]
    AlreadyInitialized(String),

    #[error("Invalid setting '{key}': {value}")]
    Settings { key: String, value: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl ModuleError {
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, ModuleError::Inactive(_) | ModuleError::AlreadyInitialized(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, ModuleError::InvalidArgument(_))
    }
}
