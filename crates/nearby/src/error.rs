use thiserror::Error;
use tracing::error;

use crate::Channel;

#[derive(Error, Debug)]
pub enum NearbyError {
    #[error("Control disabled: {0}")]
    ControlDisabled(Channel),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for NearbyError {
    fn from(err: serde_json::Error) -> Self {
        NearbyError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NearbyError>;

/// Context for error logging
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub channel: Option<Channel>,
    pub preference_key: Option<String>,
    pub additional_info: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_preference_key(mut self, key: impl Into<String>) -> Self {
        self.preference_key = Some(key.into());
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.additional_info = Some(info.into());
        self
    }
}

impl NearbyError {
    /// Log error with structured context
    pub fn log_with_context(&self, context: &ErrorContext) {
        error!(
            error = %self,
            error_type = ?self,
            channel = ?context.channel,
            preference_key = ?context.preference_key,
            additional_info = ?context.additional_info,
            timestamp = %chrono::Utc::now(),
            "Nearby error occurred"
        );
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            NearbyError::ControlDisabled(channel) => {
                format!(
                    "The {} switch is disabled because the proximity service is unavailable.",
                    channel
                )
            }
            NearbyError::Serialization(details) => {
                format!("A nearby message could not be read: {}.", details)
            }
            NearbyError::Storage(details) => {
                format!("Local preferences could not be saved: {}.", details)
            }
            NearbyError::Io(err) => {
                format!("Local storage is unavailable: {}.", err)
            }
        }
    }
}
