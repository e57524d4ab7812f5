//! # docbatch
//!
//! Bulk generation of rendered documents across a pool of workers, with
//! sharded, resumable output.
//!
//! ## Features
//!
//! - Fixed-size batches dispatched to a thread pool
//! - Deterministic sharded layout (`<shard:05>/doc_<index:08>.<ext>`)
//! - Resume by skipping artifacts already on disk
//! - Per-document failure isolation with merged error logs
//! - Atomic rename of the run directory to a name encoding its throughput
//!
//! ## Quick Start
//!
//! ```no_run
//! use docbatch::{Content, GenerationConfig, Pipeline, TemplateRenderer};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = GenerationConfig::builder()
//!     .num_documents(1_000)
//!     .batch_size(50)
//!     .template_name("columns.html")
//!     .build()?;
//!
//! let stats = Pipeline::new(config, TemplateRenderer::new())?
//!     .run(&Content::placeholder(), "./output".as_ref())?;
//! println!("{} generated, {} errors", stats.generated, stats.errors);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! A run moves through these stages:
//! 1. **Partition**: Splits `[0, num_documents)` into contiguous batches
//! 2. **Pool**: Workers resolve their template once, then process batches
//! 3. **Worker**: Routes each index to its shard, skips existing artifacts,
//!    renders and writes atomically
//! 4. **Finalize**: Merges worker error logs, writes the report and renames
//!    the run directory

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod content;
mod error;
mod finalize;
mod pipeline;
mod pool;
mod render;
mod template;
mod worker;

pub mod partition;
pub mod shard;

pub use config::{ConfigBuilder, GenerationConfig, OutputFormat, RenderOptions};
pub use content::Content;
pub use error::{DocumentError, Error, RenderError, Result};
pub use finalize::{RunDirectory, RunReport, RunState, final_dir_name, finalize, throughput_digits};
pub use pipeline::{Pipeline, RunStats};
pub use pool::PoolOutcome;
pub use render::Renderer;
pub use template::{LoadedTemplate, TemplateRenderer};
pub use worker::BatchResult;

/// Runs a complete generation into a new run directory under `output_dir`.
///
/// This is the main entry point for the library.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - The run directory cannot be created
/// - Any worker fails to initialize
/// - A dispatched batch never reports back
///
/// # Examples
///
/// ```no_run
/// use docbatch::{Content, GenerationConfig, TemplateRenderer, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = GenerationConfig::builder().num_documents(10).build()?;
///
/// run(config, TemplateRenderer::new(), &Content::placeholder(), "./output".as_ref())?;
/// # Ok(())
/// # }
/// ```
pub fn run<R: Renderer>(
    config: GenerationConfig,
    renderer: R,
    content: &Content,
    output_dir: &std::path::Path,
) -> Result<RunStats> {
    Pipeline::new(config, renderer)?.run(content, output_dir)
}
