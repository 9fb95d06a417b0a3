//! Error types for touch_chimes.

use thiserror::Error;

/// Error type for synthesis and engine setup.
///
/// Neither variant ever reaches the input layer: the scheduler and the
/// effect coordinator log and absorb them, falling back to silence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid parameter `{name}`: {value} (must be positive)")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Audio engine unavailable: {0}")]
    EngineUnavailable(String),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, value: f64) -> Self {
        Error::InvalidParameter { name, value }
    }
}

impl From<cpal::DefaultStreamConfigError> for Error {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        Error::EngineUnavailable(err.to_string())
    }
}

impl From<cpal::BuildStreamError> for Error {
    fn from(err: cpal::BuildStreamError) -> Self {
        Error::EngineUnavailable(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for Error {
    fn from(err: cpal::PlayStreamError) -> Self {
        Error::EngineUnavailable(err.to_string())
    }
}

/// Result type alias using the crate error.
pub type Result<T> = std::result::Result<T, Error>;
