//! Plugin Error Types
//!
//! Error handling for plugin loading, scanning and activation. Failure
//! recovery is always "skip and continue" at the assembly or candidate
//! granularity; precondition violations surface immediately.

use thiserror::Error;

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

/// Error types for plugin operations
#[derive(Error, Debug, Clone)]
pub enum PluginError {
    /// Precondition violation (null/empty required argument)
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Plugin configuration error
    #[error("plugin configuration error: {message}")]
    ConfigurationError { message: String },

    /// Plugin library could not be loaded
    #[error("plugin loading error: {message}")]
    LoadingFailed { message: String },

    /// Plugin entrypoint missing or misbehaving
    #[error("plugin entrypoint error: {message}")]
    EntrypointFailed { message: String },

    /// Service instance could not be activated
    #[error("service activation error: {message}")]
    ActivationFailed { message: String },

    /// Operation not supported by this plugin backend
    #[error("unsupported operation: {message}")]
    UnsupportedOperation { message: String },
}

impl PluginError {
    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    /// Create a configuration error
    pub fn configuration_error<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError { message: message.into() }
    }

    /// Create a loading failed error
    pub fn loading_failed<S: Into<String>>(message: S) -> Self {
        Self::LoadingFailed { message: message.into() }
    }

    /// Create an entrypoint failed error
    pub fn entrypoint_failed<S: Into<String>>(message: S) -> Self {
        Self::EntrypointFailed { message: message.into() }
    }

    /// Create an activation failed error
    pub fn activation_failed<S: Into<String>>(message: S) -> Self {
        Self::ActivationFailed { message: message.into() }
    }

    /// Create an unsupported operation error
    pub fn unsupported_operation<S: Into<String>>(message: S) -> Self {
        Self::UnsupportedOperation { message: message.into() }
    }

    /// Check if error is recoverable by skipping the failing unit
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PluginError::LoadingFailed { .. }
                | PluginError::EntrypointFailed { .. }
                | PluginError::ActivationFailed { .. }
        )
    }

    /// Check if error is a precondition or configuration issue
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            PluginError::InvalidArgument { .. } | PluginError::ConfigurationError { .. }
        )
    }
}

impl From<toml::de::Error> for PluginError {
    fn from(err: toml::de::Error) -> Self {
        PluginError::configuration_error(format!("TOML error: {}", err))
    }
}
