//! Input decoding, configuration, errors and report output

/// Command-line interface and batch driver
pub mod cli;
/// Measurement constants and runtime configuration
pub mod configuration;
/// Error types and context management
pub mod error;
/// Image decoding and input enumeration
pub mod image;
/// Batch progress display
pub mod progress;
/// CSV report output
pub mod report;
