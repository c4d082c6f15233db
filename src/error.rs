//! Error types for the anofox-downscale library.

use thiserror::Error;

/// Result type alias for downscaling operations.
pub type Result<T> = std::result::Result<T, DownscaleError>;

/// Errors that can occur during calibration and synthesis.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DownscaleError {
    /// Option combination rejected before any work is done.
    #[error("invalid options: {0}")]
    Validation(String),

    /// A period, fold or transform step has too few samples.
    #[error("insufficient data in {context}: need at least {needed}, got {got}")]
    InsufficientData {
        context: String,
        needed: usize,
        got: usize,
    },

    /// Cross-product matrix could not be inverted.
    #[error("singular design matrix in {context}")]
    SingularMatrix { context: String },

    /// Data outside the domain of the requested transform.
    #[error("transform error: {0}")]
    Transform(String),

    /// A parameter search found no usable candidate.
    #[error("no solution: {0}")]
    NoSolution(String),

    /// Too few values survived back-transformation.
    #[error("inverse transform failed in {context}: {survived} values survived, need {needed}")]
    InverseTransformFailure {
        context: String,
        survived: usize,
        needed: usize,
    },

    /// Malformed parameter, manifest or data file.
    #[error("{path}:{line}: {message}")]
    FileFormat {
        path: String,
        line: usize,
        message: String,
    },

    /// A predictor stream ended before the requested synthesis length.
    #[error("predictor file {path} exhausted at synthesis day {day}")]
    EndOfPredictors { path: String, day: usize },

    /// No fitted coefficients are available for a period.
    #[error("no parameters for period {period}")]
    MissingParameters { period: String },

    /// The run was cancelled through its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// Underlying I/O failure.
    #[error("i/o error on {path}: {message}")]
    Io { path: String, message: String },
}

impl DownscaleError {
    /// Wrap an I/O error together with the path it occurred on.
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        DownscaleError::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// Build a file-format error for a 1-based line number.
    pub fn format(path: impl AsRef<std::path::Path>, line: usize, message: impl Into<String>) -> Self {
        DownscaleError::FileFormat {
            path: path.as_ref().display().to_string(),
            line,
            message: message.into(),
        }
    }

    /// Replace the location carried by context-bearing variants.
    pub fn in_context(self, location: impl Into<String>) -> Self {
        match self {
            DownscaleError::InsufficientData { needed, got, .. } => DownscaleError::InsufficientData {
                context: location.into(),
                needed,
                got,
            },
            DownscaleError::SingularMatrix { .. } => DownscaleError::SingularMatrix {
                context: location.into(),
            },
            DownscaleError::InverseTransformFailure {
                survived, needed, ..
            } => DownscaleError::InverseTransformFailure {
                context: location.into(),
                survived,
                needed,
            },
            DownscaleError::Transform(message) => {
                DownscaleError::Transform(format!("{}: {message}", location.into()))
            }
            DownscaleError::NoSolution(message) => {
                DownscaleError::NoSolution(format!("{}: {message}", location.into()))
            }
            other => other,
        }
    }

    pub(crate) fn insufficient(context: impl Into<String>, needed: usize, got: usize) -> Self {
        DownscaleError::InsufficientData {
            context: context.into(),
            needed,
            got,
        }
    }
}
