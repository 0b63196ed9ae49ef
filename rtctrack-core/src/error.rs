//! Error types for RTC track handles

use thiserror::Error;

/// Main error type for track handle operations
#[derive(Error, Debug)]
pub enum TrackError {
    /// Command not supported for this track's kind/remote combination
    #[error("Invalid operation {operation} on track {track_id}: {reason}")]
    InvalidOperation {
        /// Track the command was issued against
        track_id: String,
        /// Operation that was rejected
        operation: String,
        /// Why the track does not support it
        reason: String,
    },

    /// Operation exists on the surface but has no implementation
    #[error("Not implemented: {operation}")]
    NotImplemented {
        /// Operation that was called
        operation: String,
    },

    /// The native engine reported a failure for a command
    #[error("Native command {command} failed: {reason}")]
    NativeCommandFailure {
        /// Command name
        command: String,
        /// Failure reason reported by the native side
        reason: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// Engine-provided track descriptor could not be used
    #[error("Invalid track descriptor: {message}")]
    InvalidDescriptor {
        /// Error message
        message: String,
    },

    /// Name outside the track event vocabulary
    #[error("Unknown track event: {name}")]
    UnknownEvent {
        /// Name that failed to parse
        name: String,
    },

    /// JSON decoding failed
    #[error("Serialization error: {source}")]
    Serialization {
        /// Underlying serde error
        #[from]
        source: serde_json::Error,
    },
}

/// Result type alias for track operations
pub type TrackResult<T> = Result<T, TrackError>;

impl TrackError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            TrackError::InvalidOperation { .. } => "INVALID_OPERATION",
            TrackError::NotImplemented { .. } => "NOT_IMPLEMENTED",
            TrackError::NativeCommandFailure { .. } => "NATIVE_COMMAND_FAILURE",
            TrackError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            TrackError::InvalidDescriptor { .. } => "INVALID_DESCRIPTOR",
            TrackError::UnknownEvent { .. } => "UNKNOWN_EVENT",
            TrackError::Serialization { .. } => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the failed call may succeed when issued again
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TrackError::NativeCommandFailure { .. })
    }

    /// Build an [`TrackError::InvalidOperation`] for the given track
    pub fn invalid_operation(track_id: &str, operation: &str, reason: &str) -> Self {
        TrackError::InvalidOperation {
            track_id: track_id.to_string(),
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`TrackError::NotImplemented`]
    pub fn not_implemented(operation: &str) -> Self {
        TrackError::NotImplemented {
            operation: operation.to_string(),
        }
    }

    /// Build a [`TrackError::NativeCommandFailure`]
    pub fn native_failure(command: &str, reason: impl Into<String>) -> Self {
        TrackError::NativeCommandFailure {
            command: command.to_string(),
            reason: reason.into(),
        }
    }
}
