//! Command-line interface and batch driver

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use log::{info, warn};
use rayon::prelude::*;

use crate::algorithm::executor::{ComplexityMeasurer, ImageRecord};
use crate::algorithm::registry::MeasureKind;
use crate::analysis::divergence::GaussianDivergence;
use crate::analysis::fourier::FrequencyWeighting;
use crate::io::configuration::{
    ComplexityConfig, DEFAULT_DWT_KEEP_FRACTION, DEFAULT_DWT_LEVELS, DEFAULT_KNN_K,
    DEFAULT_MAX_SAMPLES, DEFAULT_PATCH_SIZE, DEFAULT_RIDGE, DEFAULT_SEED,
    DEFAULT_SINKHORN_REGULARIZATION, DEFAULT_WASSERSTEIN_ORDER, GradientMode,
};
use crate::io::error::{ErrorContext, Result, WithContext, computation_error};
use crate::io::image::{enumerate_inputs, load_input};
use crate::io::progress::ProgressManager;
use crate::io::report::{ReportWriter, STDOUT_DESTINATION};
use crate::preprocess::filters::GreyscaleMode;
use crate::spatial::BoundaryPolicy;

#[derive(Parser, Debug)]
#[command(name = "visual-complexity")]
#[command(
    author,
    version,
    about = "Compute visual complexity measures for images and write them as CSV"
)]
/// Command-line arguments for the measurement tool
// Each preprocessing switch is an independent boolean flag
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Image file or directory of images to measure
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Measures to compute (all when omitted)
    #[arg(short, long, value_enum, value_delimiter = ',')]
    pub measures: Vec<MeasureKind>,

    /// Accept arbitrary channel counts; directories inside TARGET become channel stacks
    #[arg(long)]
    pub mspec: bool,

    /// Reduce to one channel before measuring
    #[arg(short, long, value_enum)]
    pub greyscale: Option<GreyscaleMode>,

    /// Scale factor applied before blurring
    #[arg(short, long)]
    pub resize: Option<f64>,

    /// Gaussian blur sigma in pixels, applied after resizing
    #[arg(short, long)]
    pub blur: Option<f64>,

    /// Treat every pixel as valid even when the image has an alpha channel
    #[arg(long)]
    pub ignore_alpha: bool,

    /// Measure the gradient magnitude image instead of the image
    #[arg(long)]
    pub use_grad_only: bool,

    /// Measure the gradient magnitude image as well, in `<measure>_grad` columns
    #[arg(long)]
    pub use_grad_too: bool,

    /// Patch side length in pixels
    #[arg(short, long, default_value_t = DEFAULT_PATCH_SIZE)]
    pub patch_size: usize,

    /// Treatment of patches crossing the image border
    #[arg(long, value_enum, default_value_t = BoundaryPolicy::Drop)]
    pub boundary: BoundaryPolicy,

    /// Weight of the mean term in the moment distance
    #[arg(long, default_value_t = 1.0)]
    pub gamma_mean: f64,

    /// Weight of the covariance term in the moment distance
    #[arg(long, default_value_t = 1.0)]
    pub gamma_cov: f64,

    /// Divergence used by the gaussian_divergence measure
    #[arg(long, value_enum, default_value_t = GaussianDivergence::Jeffreys)]
    pub divergence: GaussianDivergence,

    /// Ridge added to singular covariance matrices
    #[arg(long, default_value_t = DEFAULT_RIDGE)]
    pub ridge: f64,

    /// Approximate optimal transport with Sinkhorn iterations
    #[arg(long)]
    pub sinkhorn: bool,

    /// Entropic regularisation strength of the Sinkhorn solver
    #[arg(long, default_value_t = DEFAULT_SINKHORN_REGULARIZATION)]
    pub sinkhorn_reg: f64,

    /// Order of the Wasserstein distance
    #[arg(long, default_value_t = DEFAULT_WASSERSTEIN_ORDER)]
    pub wasserstein_order: f64,

    /// Scale factor for the transport measure only; ignored when --resize is given
    #[arg(long)]
    pub transport_downscale: Option<f64>,

    /// Haar decomposition levels of the wavelet measure
    #[arg(long, default_value_t = DEFAULT_DWT_LEVELS)]
    pub dwt_levels: usize,

    /// Fraction of largest wavelet coefficients retained
    #[arg(long, default_value_t = DEFAULT_DWT_KEEP_FRACTION)]
    pub dwt_keep_fraction: f64,

    /// Frequency radius used to weight the Fourier measure (Manhattan and
    /// Euclidean readings of the measure are both in circulation)
    #[arg(long, value_enum, default_value_t = FrequencyWeighting::Manhattan)]
    pub frequency_weighting: FrequencyWeighting,

    /// Neighbour rank of the differential entropy estimator
    #[arg(long, default_value_t = DEFAULT_KNN_K)]
    pub knn_k: usize,

    /// Sample cap of the differential entropy estimator
    #[arg(long, default_value_t = DEFAULT_MAX_SAMPLES)]
    pub max_samples: usize,

    /// Seed for subsampling and tie-breaking jitter
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Worker threads (0 lets rayon decide)
    #[arg(short = 'j', long, default_value_t = 0)]
    pub threads: usize,

    /// CSV output path (standard output when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Measurement configuration described by the arguments
    ///
    /// # Errors
    ///
    /// Returns an error if both gradient flags are set or an option is out of range
    pub fn to_config(&self) -> Result<ComplexityConfig> {
        let measures = if self.measures.is_empty() {
            MeasureKind::ALL.into_iter().collect()
        } else {
            self.measures.iter().copied().collect()
        };
        let config = ComplexityConfig {
            mspec: self.mspec,
            greyscale: self.greyscale,
            resize: self.resize,
            blur: self.blur,
            ignore_alpha: self.ignore_alpha,
            gradient: GradientMode::from_flags(self.use_grad_only, self.use_grad_too)?,
            measures,
            patch_size: self.patch_size,
            boundary: self.boundary,
            gamma_mean: self.gamma_mean,
            gamma_cov: self.gamma_cov,
            divergence: self.divergence,
            ridge: self.ridge,
            sinkhorn: self.sinkhorn,
            sinkhorn_regularization: self.sinkhorn_reg,
            wasserstein_order: self.wasserstein_order,
            transport_downscale: self.transport_downscale,
            dwt_levels: self.dwt_levels,
            dwt_keep_fraction: self.dwt_keep_fraction,
            frequency_weighting: self.frequency_weighting,
            knn_k: self.knn_k,
            max_samples: self.max_samples,
            seed: self.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Measures every input of a batch and writes the report
pub struct FileProcessor {
    cli: Cli,
}

impl FileProcessor {
    /// Create a new file processor with the given CLI arguments
    pub const fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Measure all inputs and write one row per successfully measured image
    ///
    /// Images that fail to decode or preprocess are logged and left out.
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the target cannot be
    /// enumerated, or the report cannot be written
    pub fn process(&self) -> Result<usize> {
        let measurer = ComplexityMeasurer::new(self.cli.to_config()?)?;
        let inputs = enumerate_inputs(&self.cli.target, self.cli.mspec)?;
        info!(
            "measuring {} inputs from {}",
            inputs.len(),
            self.cli.target.display()
        );

        let started = Instant::now();
        let records = if self.cli.threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.cli.threads)
                .build()
                .map_err(|error| computation_error("thread pool", &error))?;
            pool.install(|| self.measure_all(&measurer, &inputs))
        } else {
            self.measure_all(&measurer, &inputs)
        };

        let written = self.write_report(&measurer, &records)?;
        info!(
            "wrote {written} of {} rows in {:?}",
            inputs.len(),
            started.elapsed()
        );
        Ok(written)
    }

    /// Measure inputs in parallel, returning successful records in input order
    fn measure_all(&self, measurer: &ComplexityMeasurer, inputs: &[PathBuf]) -> Vec<ImageRecord> {
        let progress = ProgressManager::new(inputs.len(), self.cli.should_show_progress());
        let mut tagged: Vec<(usize, ImageRecord)> = inputs
            .par_iter()
            .enumerate()
            .filter_map(|(index, path)| {
                let outcome = measure_path(measurer, path, self.cli.mspec);
                progress.complete(path);
                match outcome {
                    Ok(record) => Some((index, record)),
                    Err(error) => {
                        warn!("skipping {}: {error}", path.display());
                        None
                    }
                }
            })
            .collect();
        progress.finish();
        tagged.sort_by_key(|(index, _)| *index);
        tagged.into_iter().map(|(_, record)| record).collect()
    }

    fn write_report(&self, measurer: &ComplexityMeasurer, records: &[ImageRecord]) -> Result<usize> {
        let (sink, destination): (Box<dyn Write>, PathBuf) = match &self.cli.output {
            Some(path) => {
                let file = File::create(path).with_context(ErrorContext {
                    path: Some(path.clone()),
                    operation: Some("create report"),
                })?;
                (Box::new(file), path.clone())
            }
            None => (Box::new(io::stdout().lock()), PathBuf::from(STDOUT_DESTINATION)),
        };
        let mut report = ReportWriter::new(sink, destination, measurer.header())?;
        for record in records {
            report.write_record(record)?;
        }
        report.finish()?;
        Ok(records.len())
    }
}

/// Decode, preprocess and measure one input
///
/// # Errors
///
/// Returns an error if the input cannot be decoded or preprocessed
pub fn measure_path(measurer: &ComplexityMeasurer, path: &Path, mspec: bool) -> Result<ImageRecord> {
    let decoded = load_input(path, mspec)?;
    measurer.measure_decoded(&path.display().to_string(), decoded)
}
