//! Measure selection and per-image orchestration

/// Per-image measurement pipeline and result records
pub mod executor;
/// Named measure functions behind a common interface
pub mod registry;
