//! Error types for chunkscribe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkscribeError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Planning errors
    #[error("Invalid segment plan: {message}")]
    InvalidSegmentPlan { message: String },

    // Transcoder errors
    #[error("Transcoding failed: {message}")]
    Transcode { message: String },

    // Speech service errors
    #[error("Network error: {message}")]
    Network { message: String },

    #[error(
        "Could not get a valid response from the speech service for segment starting at second {start}"
    )]
    RecognitionUnavailable { start: f64 },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl ChunkscribeError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn plan(message: impl Into<String>) -> Self {
        Self::InvalidSegmentPlan {
            message: message.into(),
        }
    }

    pub(crate) fn transcode(message: impl Into<String>) -> Self {
        Self::Transcode {
            message: message.into(),
        }
    }

    pub(crate) fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChunkscribeError>;
