use std::fmt::{self, Debug, Display};
use std::io;

/// All errors surfaced by the SIRV engine.
///
/// Configuration problems are caught before a run starts. Invariant violations inside the
/// event loop are programming errors and panic instead of producing a `SirvError`.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum SirvError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    /// A parameter failed validation. The message names the offending field.
    InvalidConfig(String),
    /// `run_simulation` was called before `set_parameters`.
    ParametersNotSet,
    /// `run_simulation` was called before `init_random`.
    RandomNotInitialized,
    /// A step was taken before `init_population`.
    PopulationNotInitialized,
    LoggingError(String),
}

impl From<io::Error> for SirvError {
    fn from(error: io::Error) -> Self {
        SirvError::IoError(error)
    }
}

impl From<serde_json::Error> for SirvError {
    fn from(error: serde_json::Error) -> Self {
        SirvError::JsonError(error)
    }
}

impl From<&str> for SirvError {
    fn from(message: &str) -> Self {
        SirvError::InvalidConfig(message.to_string())
    }
}

impl std::error::Error for SirvError {}

impl Display for SirvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SirvError::IoError(error) => write!(f, "I/O error: {error}"),
            SirvError::JsonError(error) => write!(f, "JSON error: {error}"),
            SirvError::InvalidConfig(message) => write!(f, "invalid configuration: {message}"),
            SirvError::ParametersNotSet => write!(f, "parameters have not been set"),
            SirvError::RandomNotInitialized => {
                write!(f, "random source has not been initialized with a seed")
            }
            SirvError::PopulationNotInitialized => {
                write!(f, "population has not been initialized")
            }
            SirvError::LoggingError(message) => write!(f, "logging error: {message}"),
        }
    }
}
