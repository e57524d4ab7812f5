use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

const DEFAULT_RESOLUTION: u32 = 80;
const DEFAULT_NUM_DOCUMENTS: usize = 100;
const DEFAULT_BATCH_SIZE: usize = 50;
const DEFAULT_CHUNKSIZE: usize = 1;
const DEFAULT_SHARD_SIZE: usize = 1_000;
const DEFAULT_QUALITY: u8 = 70;
const DEFAULT_TEMPLATE: &str = "columns.html";

/// Raster encoding used for each rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputFormat {
    /// Lossless raster (PNG)
    Png,
    /// Lossy raster (JPEG), honours [`GenerationConfig::quality`]
    Jpeg,
}

impl OutputFormat {
    /// Returns true if the encoding discards information.
    #[must_use]
    pub const fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg)
    }

    /// Returns the conventional upper-case name of the encoding.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-document options forwarded to the [`Renderer`](crate::Renderer).
///
/// Everything except `index` is derived from the run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderOptions {
    /// Document index within the run
    pub index: usize,
    /// Raster resolution in dots per inch
    pub resolution: u32,
    /// Page encoding
    pub output_format: OutputFormat,
    /// Encoder quality, only meaningful for lossy formats
    pub quality: u8,
    /// Render pages in grayscale instead of RGB
    pub grayscale: bool,
}

/// Configuration for a generation run.
///
/// Use [`GenerationConfig::builder()`] to construct a new configuration.
/// A config is treated as immutable once a run has started.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GenerationConfig {
    /// Raster resolution in dots per inch
    pub resolution: u32,

    /// Number of documents to generate
    pub num_documents: usize,

    /// Documents per batch
    pub batch_size: usize,

    /// Batches handed to a worker per dispatch
    pub chunksize: usize,

    /// Documents per shard directory
    pub shard_size: usize,

    /// Page encoding
    pub output_format: OutputFormat,

    /// Encoder quality (1-100) for lossy formats
    pub quality: u8,

    /// Grayscale output
    pub grayscale: bool,

    /// Worker count, `None` for the number of logical CPUs
    pub max_workers: Option<usize>,

    /// Template identifier resolved by the renderer
    pub template_name: String,
}

impl GenerationConfig {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use docbatch::GenerationConfig;
    ///
    /// let config = GenerationConfig::builder()
    ///     .num_documents(1_000)
    ///     .batch_size(25)
    ///     .build()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.batch_size, 25);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Any size or count that must be positive is zero
    /// - The quality is outside 1-100 for a lossy format
    /// - The template name is empty
    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 {
            return Err(Error::config("resolution must be greater than 0"));
        }

        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be greater than 0"));
        }

        if self.chunksize == 0 {
            return Err(Error::config("chunksize must be greater than 0"));
        }

        if self.shard_size == 0 {
            return Err(Error::config("shard_size must be greater than 0"));
        }

        if self.max_workers == Some(0) {
            return Err(Error::config("max_workers must be greater than 0"));
        }

        if self.output_format.is_lossy() && !(1..=100).contains(&self.quality) {
            return Err(Error::config(format!(
                "quality ({}) must be between 1 and 100 for {} output",
                self.quality, self.output_format
            )));
        }

        if self.template_name.trim().is_empty() {
            return Err(Error::config("template_name must not be empty"));
        }

        if self.batch_size > self.num_documents && self.num_documents > 0 {
            tracing::debug!(
                "batch_size ({}) exceeds num_documents ({}), a single batch will be dispatched",
                self.batch_size,
                self.num_documents
            );
        }

        Ok(())
    }

    /// Returns the number of workers the pool will start.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.max_workers.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Returns the renderer options for the first document.
    ///
    /// Workers copy this value and set [`RenderOptions::index`] per document.
    #[must_use]
    pub const fn render_options(&self) -> RenderOptions {
        RenderOptions {
            index: 0,
            resolution: self.resolution,
            output_format: self.output_format,
            quality: self.quality,
            grayscale: self.grayscale,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            num_documents: DEFAULT_NUM_DOCUMENTS,
            batch_size: DEFAULT_BATCH_SIZE,
            chunksize: DEFAULT_CHUNKSIZE,
            shard_size: DEFAULT_SHARD_SIZE,
            output_format: OutputFormat::Jpeg,
            quality: DEFAULT_QUALITY,
            grayscale: true,
            max_workers: None,
            template_name: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// Builder for creating a [`GenerationConfig`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    resolution: Option<u32>,
    num_documents: Option<usize>,
    batch_size: Option<usize>,
    chunksize: Option<usize>,
    shard_size: Option<usize>,
    output_format: Option<OutputFormat>,
    quality: Option<u8>,
    grayscale: Option<bool>,
    max_workers: Option<usize>,
    template_name: Option<String>,
}

impl ConfigBuilder {
    /// Sets the raster resolution.
    #[must_use]
    pub fn resolution(mut self, dpi: u32) -> Self {
        self.resolution = Some(dpi);
        self
    }

    /// Sets the number of documents to generate.
    #[must_use]
    pub fn num_documents(mut self, count: usize) -> Self {
        self.num_documents = Some(count);
        self
    }

    /// Sets the number of documents per batch.
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Sets how many batches are sent to a worker per dispatch.
    #[must_use]
    pub fn chunksize(mut self, size: usize) -> Self {
        self.chunksize = Some(size);
        self
    }

    /// Sets the number of documents per shard directory.
    #[must_use]
    pub fn shard_size(mut self, size: usize) -> Self {
        self.shard_size = Some(size);
        self
    }

    /// Sets the page encoding.
    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    /// Sets the lossy encoder quality.
    #[must_use]
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Enables or disables grayscale output.
    #[must_use]
    pub fn grayscale(mut self, enabled: bool) -> Self {
        self.grayscale = Some(enabled);
        self
    }

    /// Sets the worker count.
    ///
    /// Defaults to the number of logical CPUs when unset.
    #[must_use]
    pub fn max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    /// Sets the template identifier.
    #[must_use]
    pub fn template_name(mut self, name: impl Into<String>) -> Self {
        self.template_name = Some(name.into());
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<GenerationConfig> {
        let config = GenerationConfig {
            resolution: self.resolution.unwrap_or(DEFAULT_RESOLUTION),
            num_documents: self.num_documents.unwrap_or(DEFAULT_NUM_DOCUMENTS),
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            chunksize: self.chunksize.unwrap_or(DEFAULT_CHUNKSIZE),
            shard_size: self.shard_size.unwrap_or(DEFAULT_SHARD_SIZE),
            output_format: self.output_format.unwrap_or(OutputFormat::Jpeg),
            quality: self.quality.unwrap_or(DEFAULT_QUALITY),
            grayscale: self.grayscale.unwrap_or(true),
            max_workers: self.max_workers,
            template_name: self
                .template_name
                .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GenerationConfig::builder().build().unwrap();

        assert_eq!(config.resolution, DEFAULT_RESOLUTION);
        assert_eq!(config.num_documents, DEFAULT_NUM_DOCUMENTS);
        assert_eq!(config.output_format, OutputFormat::Jpeg);
        assert_eq!(config.template_name, "columns.html");
        assert!(config.grayscale);
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(GenerationConfig::builder().batch_size(0).build().is_err());
        assert!(GenerationConfig::builder().shard_size(0).build().is_err());
        assert!(GenerationConfig::builder().chunksize(0).build().is_err());
        assert!(GenerationConfig::builder().resolution(0).build().is_err());
        assert!(GenerationConfig::builder().max_workers(0).build().is_err());
    }

    #[test]
    fn test_zero_documents_allowed() {
        let config = GenerationConfig::builder().num_documents(0).build().unwrap();
        assert_eq!(config.num_documents, 0);
    }

    #[test]
    fn test_quality_only_checked_for_lossy() {
        let lossy = GenerationConfig::builder()
            .output_format(OutputFormat::Jpeg)
            .quality(0)
            .build();
        assert!(lossy.is_err());

        let lossless = GenerationConfig::builder()
            .output_format(OutputFormat::Png)
            .quality(0)
            .build();
        assert!(lossless.is_ok());
    }

    #[test]
    fn test_empty_template_rejected() {
        let result = GenerationConfig::builder().template_name("  ").build();
        assert!(result.unwrap_err().is_config());
    }

    #[test]
    fn test_worker_count() {
        let config = GenerationConfig::builder().max_workers(3).build().unwrap();
        assert_eq!(config.worker_count(), 3);

        let config = GenerationConfig::builder().build().unwrap();
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_render_options() {
        let config = GenerationConfig::builder()
            .resolution(150)
            .output_format(OutputFormat::Png)
            .grayscale(false)
            .build()
            .unwrap();

        let options = config.render_options();
        assert_eq!(options.index, 0);
        assert_eq!(options.resolution, 150);
        assert_eq!(options.output_format.name(), "PNG");
        assert!(!options.grayscale);
    }
}
