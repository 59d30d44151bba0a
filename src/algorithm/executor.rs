//! Per-image measurement orchestration
//!
//! Load → preprocess → measure → assemble. Measures on one image run
//! concurrently; a measure that fails is logged and recorded as `NaN` without
//! affecting the others.

use std::time::Instant;

use log::{debug, warn};
use rayon::prelude::*;

use crate::algorithm::registry::{MeasureInput, MeasureKind, MeasureResult};
use crate::io::configuration::{ComplexityConfig, GRADIENT_SUFFIX, GradientMode};
use crate::io::error::Result;
use crate::preprocess::{PreparedImage, Preprocessor};
use crate::spatial::{DecodedImage, ImageBuffer};

/// Measurement values of one image, in column order
#[derive(Clone, Debug, PartialEq)]
pub struct ImageRecord {
    /// Image identifier, usually the file path
    pub image: String,
    /// One entry per report column after the identifier
    pub results: Vec<MeasureResult>,
}

impl ImageRecord {
    /// Value of the named column, if present
    pub fn value(&self, name: &str) -> Option<f64> {
        self.results
            .iter()
            .find(|result| result.name == name)
            .map(|result| result.value)
    }
}

/// Runs the selected measures on images according to one configuration
#[derive(Debug, Clone)]
pub struct ComplexityMeasurer {
    config: ComplexityConfig,
    preprocessor: Preprocessor,
    measures: Vec<MeasureKind>,
}

impl ComplexityMeasurer {
    /// Create a measurer after validating the configuration
    ///
    /// # Errors
    ///
    /// Returns an `InvalidParameter` error if the configuration is inconsistent
    pub fn new(config: ComplexityConfig) -> Result<Self> {
        config.validate()?;
        let preprocessor = Preprocessor::from_config(&config);
        let measures = config.measures.iter().copied().collect();
        Ok(Self {
            config,
            preprocessor,
            measures,
        })
    }

    /// Configuration in use
    pub const fn config(&self) -> &ComplexityConfig {
        &self.config
    }

    /// Report columns after the image identifier
    ///
    /// With `GradientMode::Too` each measure is followed by its gradient
    /// column.
    pub fn header(&self) -> Vec<String> {
        self.measures
            .iter()
            .flat_map(|kind| {
                let name = kind.name();
                match self.config.gradient {
                    GradientMode::Too => vec![name.to_owned(), format!("{name}{GRADIENT_SUFFIX}")],
                    GradientMode::Off | GradientMode::Only => vec![name.to_owned()],
                }
            })
            .collect()
    }

    /// Preprocess a decoded image and measure it
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be masked or transformed
    pub fn measure_decoded(&self, image: &str, decoded: DecodedImage) -> Result<ImageRecord> {
        let prepared = self.preprocessor.prepare(decoded)?;
        self.measure_prepared(image, &prepared)
    }

    /// Measure an already preprocessed image
    ///
    /// # Errors
    ///
    /// Returns an error if the patch grid cannot be built
    pub fn measure_prepared(&self, image: &str, prepared: &PreparedImage) -> Result<ImageRecord> {
        let gradient = prepared.gradient.as_ref();
        let results = match (self.config.gradient, gradient) {
            (GradientMode::Only, Some(gradient)) => self.measure_buffer(gradient)?,
            (GradientMode::Too, Some(gradient)) => {
                let original = self.measure_buffer(&prepared.original)?;
                let derived = self.measure_buffer(gradient)?;
                original
                    .into_iter()
                    .zip(derived)
                    .flat_map(|(plain, mut grad)| {
                        grad.name.push_str(GRADIENT_SUFFIX);
                        [plain, grad]
                    })
                    .collect()
            }
            _ => self.measure_buffer(&prepared.original)?,
        };
        Ok(ImageRecord {
            image: image.to_owned(),
            results,
        })
    }

    /// Run every selected measure on one image buffer
    ///
    /// # Errors
    ///
    /// Returns an error if the patch grid cannot be built
    pub fn measure_buffer(&self, image: &ImageBuffer) -> Result<Vec<MeasureResult>> {
        let input = MeasureInput::new(image, &self.config)?;
        debug!(
            "{}x{}x{} image, {} of {} patches valid",
            image.height(),
            image.width(),
            image.channels(),
            input.grid().valid_count(),
            input.grid().patches().len()
        );
        Ok(self
            .measures
            .par_iter()
            .map(|&kind| {
                let started = Instant::now();
                let value = kind.compute(&input, &self.config).unwrap_or_else(|error| {
                    warn!("{} failed: {error}", kind.name());
                    f64::NAN
                });
                if value.is_nan() {
                    warn!("{} is undefined for this image", kind.name());
                }
                debug!("{} = {value} in {:?}", kind.name(), started.elapsed());
                MeasureResult {
                    name: kind.name().to_owned(),
                    value,
                }
            })
            .collect())
    }
}
