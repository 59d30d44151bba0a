//! Tabular report output
//!
//! One header row (`image` followed by the measure columns) and one row per
//! successfully measured image. Undefined values are written as `NaN`.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::algorithm::executor::ImageRecord;
use crate::io::configuration::IMAGE_COLUMN;
use crate::io::error::{ErrorContext, Result, WithContext, invalid_parameter};

/// Destination name used in errors when writing to standard output
pub const STDOUT_DESTINATION: &str = "-";

/// Text form of a measured value
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else {
        value.to_string()
    }
}

/// CSV writer bound to a fixed column layout
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
    destination: PathBuf,
    columns: Vec<String>,
}

impl<W: Write> ReportWriter<W> {
    /// Wrap a sink and write the header row
    ///
    /// # Errors
    ///
    /// Returns a `Report` error if the header cannot be written
    pub fn new(sink: W, destination: impl Into<PathBuf>, columns: Vec<String>) -> Result<Self> {
        let destination = destination.into();
        let mut writer = csv::Writer::from_writer(sink);
        writer
            .write_record(std::iter::once(IMAGE_COLUMN).chain(columns.iter().map(String::as_str)))
            .with_path(&destination)?;
        Ok(Self {
            writer,
            destination,
            columns,
        })
    }

    /// Measure columns after the image identifier
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Where the report is written
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Append the row of one image
    ///
    /// # Errors
    ///
    /// Returns an error if the record's columns differ from the header or the
    /// row cannot be written
    pub fn write_record(&mut self, record: &ImageRecord) -> Result<()> {
        let matches = record.results.len() == self.columns.len()
            && record
                .results
                .iter()
                .zip(&self.columns)
                .all(|(result, column)| &result.name == column);
        if !matches {
            return Err(invalid_parameter(
                "record",
                &record.image,
                &"columns do not match the report header",
            ));
        }
        let row = std::iter::once(record.image.clone())
            .chain(record.results.iter().map(|result| format_value(result.value)));
        self.writer.write_record(row).with_path(&self.destination)
    }

    /// Flush buffered rows
    ///
    /// # Errors
    ///
    /// Returns a `FileSystem` error if the sink rejects the data
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush().with_context(ErrorContext {
            path: Some(self.destination.clone()),
            operation: Some("flush report"),
        })
    }
}
