//! Error types and context management for complexity measurement

use std::fmt;
use std::path::PathBuf;

/// Main error type for all measurement operations
#[derive(Debug)]
pub enum ComplexityError {
    /// Failed to decode a source image from the filesystem
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image decoding error
        source: image::ImageError,
    },

    /// Image data is internally inconsistent
    ///
    /// Occurs when:
    /// - Channel planes or the validity mask disagree on (height, width)
    /// - The image has zero rows, columns or channels
    /// - A channel stack mixes images of different sizes
    InvalidImage {
        /// Description of what's wrong with the image
        reason: String,
    },

    /// Configuration option out of range or inconsistent with another option
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Failed to write a row of the tabular report
    Report {
        /// Destination of the report (`-` for standard output)
        path: PathBuf,
        /// Underlying CSV error
        source: csv::Error,
    },

    /// Numerical computation produced invalid result
    Computation {
        /// Name of the computation that failed
        operation: &'static str,
        /// Description of the failure
        reason: String,
    },
}

impl fmt::Display for ComplexityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageLoad { path, source } => {
                write!(f, "Failed to load image '{}': {source}", path.display())
            }
            Self::InvalidImage { reason } => {
                write!(f, "Invalid image: {reason}")
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::Report { path, source } => {
                write!(
                    f,
                    "Failed to write report to '{}': {source}",
                    path.display()
                )
            }
            Self::Computation { operation, reason } => {
                write!(f, "Computation error in {operation}: {reason}")
            }
        }
    }
}

impl std::error::Error for ComplexityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageLoad { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            Self::Report { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for measurement results
pub type Result<T> = std::result::Result<T, ComplexityError>;

const UNKNOWN_PATH: &str = "<unknown>";

/// Additional context to enrich error messages
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Image the failing operation was working on
    pub path: Option<PathBuf>,
    /// Operation being performed
    pub operation: Option<&'static str>,
}

/// Enriches error messages with the image being processed
pub trait WithContext<T> {
    /// Add error context to a Result
    ///
    /// # Errors
    ///
    /// Propagates the original error with additional context applied
    fn with_context(self, context: ErrorContext) -> Result<T>;

    /// Attach the path of the image being processed
    ///
    /// # Errors
    ///
    /// Propagates the original error with the path applied
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T, E> WithContext<T> for std::result::Result<T, E>
where
    E: Into<ComplexityError>,
{
    fn with_context(self, context: ErrorContext) -> Result<T> {
        self.map_err(|e| {
            let mut error = e.into();
            // Conversions through `From` leave placeholder fields behind
            match &mut error {
                ComplexityError::FileSystem {
                    path, operation, ..
                } => {
                    if let Some(op) = context.operation {
                        if *operation == "unknown" {
                            *operation = op;
                        }
                    }
                    fill_unknown_path(path, context.path.as_ref());
                }
                ComplexityError::ImageLoad { path, .. } | ComplexityError::Report { path, .. } => {
                    fill_unknown_path(path, context.path.as_ref());
                }
                _ => {}
            }
            error
        })
    }

    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.with_context(ErrorContext {
            path: Some(path.into()),
            ..Default::default()
        })
    }
}

fn fill_unknown_path(path: &mut PathBuf, replacement: Option<&PathBuf>) {
    if let Some(replacement) = replacement {
        if path.as_os_str() == UNKNOWN_PATH {
            path.clone_from(replacement);
        }
    }
}

impl From<image::ImageError> for ComplexityError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageLoad {
            path: PathBuf::from(UNKNOWN_PATH),
            source: err,
        }
    }
}

impl From<std::io::Error> for ComplexityError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from(UNKNOWN_PATH),
            operation: "unknown",
            source: err,
        }
    }
}

impl From<csv::Error> for ComplexityError {
    fn from(err: csv::Error) -> Self {
        Self::Report {
            path: PathBuf::from(UNKNOWN_PATH),
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> ComplexityError {
    ComplexityError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create an invalid image error
pub fn invalid_image(reason: &impl ToString) -> ComplexityError {
    ComplexityError::InvalidImage {
        reason: reason.to_string(),
    }
}

/// Create a computation error
pub fn computation_error(operation: &'static str, reason: &impl ToString) -> ComplexityError {
    ComplexityError::Computation {
        operation,
        reason: reason.to_string(),
    }
}
