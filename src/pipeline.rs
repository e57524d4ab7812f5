use crate::{
    config::GenerationConfig,
    content::Content,
    error::{Error, Result},
    finalize::{self, RunDirectory, RunReport},
    pool::{PoolOutcome, WorkerPool},
    render::Renderer,
};
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tracing::{error, info, instrument, warn};

/// Statistics collected during a generation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    /// Documents requested
    pub total_documents: usize,

    /// Documents whose artifact exists, including skipped ones
    pub generated: usize,

    /// Documents that failed
    pub errors: usize,

    /// Documents already present from an earlier attempt
    pub skipped: usize,

    /// Batches dispatched
    pub batches: usize,

    /// Workers started
    pub workers: usize,

    /// Pool wall time
    pub duration: Duration,

    /// Total execution time including finalization
    pub total_duration: Duration,

    /// Final run directory
    pub run_directory: PathBuf,
}

impl RunStats {
    fn new(config: &GenerationConfig, outcome: &PoolOutcome, total_duration: Duration, run_directory: PathBuf) -> Self {
        Self {
            total_documents: config.num_documents,
            generated: outcome.totals.processed,
            errors: outcome.totals.failed,
            skipped: outcome.totals.skipped,
            batches: outcome.batches,
            workers: outcome.workers,
            duration: outcome.elapsed,
            total_duration,
            run_directory,
        }
    }

    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║             Generation Run Summary                    ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Documents Requested:  {:>8}                        ║",
            self.total_documents
        );
        println!(
            "║   - Generated:        {:>8}                        ║",
            self.generated
        );
        println!(
            "║   - Already present:  {:>8}                        ║",
            self.skipped
        );
        println!(
            "║   - Errors:           {:>8}                        ║",
            self.errors
        );
        println!("║                                                       ║");
        println!(
            "║ Batches Dispatched:   {:>8}                        ║",
            self.batches
        );
        println!(
            "║ Workers:              {:>8}                        ║",
            self.workers
        );
        println!("║                                                       ║");
        println!("║ Run Directory:                                        ║");
        println!(
            "║   {}                                              ║",
            self.run_directory.display()
        );
        println!("║                                                       ║");
        println!("║ Timing:                                               ║");
        println!(
            "║   - Generation:       {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        println!(
            "║   - Total:            {:>8.2}s                     ║",
            self.total_duration.as_secs_f64()
        );
        println!(
            "║   - Throughput:       {:>8.2} docs/s               ║",
            self.docs_per_second()
        );
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }

    /// Returns the throughput in documents per second.
    #[must_use]
    pub fn docs_per_second(&self) -> f64 {
        crate::pool::throughput(self.generated, self.duration)
    }

    /// Returns true if at least one document failed.
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Orchestrates a run: run directory, worker pool and finalization.
pub struct Pipeline<R: Renderer> {
    config: GenerationConfig,
    renderer: R,
}

impl<R: Renderer> Pipeline<R> {
    /// Creates a new pipeline with the given configuration and renderer.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new(config: GenerationConfig, renderer: R) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, renderer })
    }

    /// Returns the run configuration.
    #[must_use]
    pub const fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Returns the renderer shared by the workers.
    #[must_use]
    pub const fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Generates every document into a new run directory under `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the run directory cannot be created. Failures
    /// after that point are returned as [`Error::Aborted`], and the
    /// temporary directory is kept so that [`Pipeline::resume`] can pick it up.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use docbatch::{Content, GenerationConfig, Pipeline, TemplateRenderer};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = GenerationConfig::builder().num_documents(10).build()?;
    ///
    /// let stats = Pipeline::new(config, TemplateRenderer::new())?
    ///     .run(&Content::placeholder(), "./output".as_ref())?;
    /// stats.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self, content), fields(documents = self.config.num_documents))]
    pub fn run(&self, content: &Content, output_dir: &Path) -> Result<RunStats> {
        let start_time = Instant::now();
        info!("Starting generation into {}", output_dir.display());

        std::fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;
        let run_dir = RunDirectory::create(output_dir)?;

        self.complete(run_dir, content, start_time)
    }

    /// Finishes an interrupted run in its temporary directory.
    ///
    /// Artifacts already on disk are counted as generated without being
    /// rendered again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunDirectory`] if `tmp_dir` is not a temporary run
    /// directory, otherwise fails like [`Pipeline::run`].
    #[instrument(skip(self, content), fields(run_dir = %tmp_dir.display()))]
    pub fn resume(&self, content: &Content, tmp_dir: &Path) -> Result<RunStats> {
        let start_time = Instant::now();
        let run_dir = RunDirectory::open(tmp_dir)?;
        info!("Resuming run {}", run_dir.prefix());

        self.complete(run_dir, content, start_time)
    }

    /// Runs the worker pool against an existing directory without finalizing it.
    ///
    /// # Errors
    ///
    /// Returns an error if any worker fails to initialize or a batch result is lost.
    pub fn execute(&self, content: &Content, run_dir: &Path) -> Result<PoolOutcome> {
        if content.is_empty() {
            warn!("Content has no paragraphs, documents will be empty");
        }

        WorkerPool::new(&self.config, &self.renderer, content).run(run_dir)
    }

    fn complete(&self, run_dir: RunDirectory, content: &Content, start_time: Instant) -> Result<RunStats> {
        let outcome = match self.execute(content, run_dir.path()) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    "Run aborted, partial output kept in {}",
                    run_dir.path().display()
                );
                return Err(Error::aborted(run_dir.path(), e));
            }
        };

        info!(
            "✓ Generated {}/{} documents ({} errors) in {:.2}s",
            outcome.totals.processed,
            self.config.num_documents,
            outcome.totals.failed,
            outcome.elapsed.as_secs_f64()
        );

        let report = RunReport::new(&self.config, &outcome);
        let tmp_path = run_dir.path().to_path_buf();
        let final_path =
            finalize::finalize(run_dir, &report).map_err(|e| Error::aborted(tmp_path, e))?;

        let stats = RunStats::new(&self.config, &outcome, start_time.elapsed(), final_path);

        if stats.has_errors() {
            warn!(
                "{} documents failed, see {}",
                stats.errors,
                stats.run_directory.join("errors.log").display()
            );
        }
        info!(
            "✓ Run completed in {:.2}s",
            stats.total_duration.as_secs_f64()
        );

        Ok(stats)
    }
}
