use crate::{
    config::{GenerationConfig, RenderOptions},
    content::Content,
    error::{DocumentError, Error, Result},
    partition::Batch,
    render::Renderer,
    shard::{self, ShardRouter},
};
use serde::Serialize;
use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, trace, warn};

/// Prefix shared by every per-worker error log file name.
pub(crate) const WORKER_LOG_PREFIX: &str = "errors_worker_";

/// Aggregate outcome of one batch.
///
/// Only counts cross the worker boundary; per-document failure detail lives
/// in the worker error log.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    /// Documents whose artifact exists after the batch (rendered or skipped)
    pub processed: usize,

    /// Documents that failed
    pub failed: usize,

    /// Subset of `processed` already present before the batch ran
    pub skipped: usize,
}

impl BatchResult {
    /// Adds another result to this one.
    pub fn merge(&mut self, other: Self) {
        self.processed += other.processed;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Successful outcome of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DocumentOutcome {
    /// Rendered and written in this run
    Rendered,
    /// Artifact already existed, renderer not called
    Skipped,
}

/// Returns the error log file name for a worker.
pub(crate) fn error_log_name(pid: u32, worker: usize) -> String {
    format!("{WORKER_LOG_PREFIX}{pid}_{worker}.log")
}

/// A ready pool member.
///
/// Holding a `Worker` means initialization succeeded: the template is
/// resolved and the error log is open. Both are private to this worker and
/// reused for every document it processes.
pub(crate) struct Worker<'r, R: Renderer> {
    id: usize,
    renderer: &'r R,
    template: R::Template,
    options: RenderOptions,
    router: ShardRouter,
    error_log: File,
    error_log_path: PathBuf,
}

impl<'r, R: Renderer> Worker<'r, R> {
    /// Resolves the template and opens the error log.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerInit`] if the template does not resolve or the
    /// error log cannot be opened beneath `run_dir`.
    pub(crate) fn init(
        id: usize,
        renderer: &'r R,
        config: &GenerationConfig,
        run_dir: &Path,
    ) -> Result<Self> {
        let template = renderer
            .load_template(&config.template_name)
            .map_err(|e| Error::worker_init(id, e.to_string()))?;

        let error_log_path = run_dir.join(error_log_name(std::process::id(), id));
        let error_log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&error_log_path)
            .map_err(|e| {
                Error::worker_init(id, format!("{}: {e}", error_log_path.display()))
            })?;

        debug!(
            "Worker {} ready (template '{}', log {})",
            id,
            config.template_name,
            error_log_path.display()
        );

        Ok(Self {
            id,
            renderer,
            template,
            options: config.render_options(),
            router: ShardRouter::new(run_dir, config.shard_size, renderer.extension()),
            error_log,
            error_log_path,
        })
    }

    /// Returns the worker number within the pool.
    pub(crate) const fn id(&self) -> usize {
        self.id
    }

    /// Processes every index of `batch`, never failing as a whole.
    pub(crate) fn process_batch(&mut self, batch: Batch, content: &Content) -> BatchResult {
        let mut result = BatchResult::default();

        for index in batch.indices() {
            match self.process(index, content) {
                Ok(DocumentOutcome::Rendered) => result.processed += 1,
                Ok(DocumentOutcome::Skipped) => {
                    result.processed += 1;
                    result.skipped += 1;
                }
                Err(e) => {
                    self.record_failure(index, &e);
                    result.failed += 1;
                }
            }
        }

        debug!(
            "Worker {} finished batch [{}, {}): {} processed ({} skipped), {} failed",
            self.id, batch.lo, batch.hi, result.processed, result.skipped, result.failed
        );

        result
    }

    /// Produces the artifact for one document unless it already exists.
    pub(crate) fn process(
        &self,
        index: usize,
        content: &Content,
    ) -> std::result::Result<DocumentOutcome, DocumentError> {
        let target = self.router.locate(index);

        shard::ensure_dir(&target).map_err(|e| {
            DocumentError::write(target.parent().unwrap_or(target.as_path()), &e)
        })?;

        if target.exists() {
            trace!("Skipping existing artifact {}", target.display());
            return Ok(DocumentOutcome::Skipped);
        }

        let options = RenderOptions {
            index,
            ..self.options
        };
        let bytes = self.renderer.render(content, &self.template, &options)?;

        write_file_atomic(&target, &bytes)?;
        trace!("Wrote {} ({} bytes)", target.display(), bytes.len());

        Ok(DocumentOutcome::Rendered)
    }

    /// Appends one `idx=<index> error=<detail>` line to the worker log.
    fn record_failure(&mut self, index: usize, error: &DocumentError) {
        warn!("Worker {} failed on document {}: {}", self.id, index, error);

        let line = format!("idx={index} error={}\n", error.log_line());
        if let Err(e) = self.error_log.write_all(line.as_bytes()) {
            warn!(
                "Could not append to {}: {}",
                self.error_log_path.display(),
                e
            );
        }
    }
}

/// Writes `bytes` to a temporary sibling, syncs it, then renames it onto `path`.
///
/// The final path only ever appears with its complete contents, so the
/// existence check used for resuming never sees a partial artifact.
fn write_file_atomic(path: &Path, bytes: &[u8]) -> std::result::Result<(), DocumentError> {
    let temp_path = path.with_extension("tmp");

    let written = File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&temp_path, path));

    written.map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        DocumentError::write(path, &e)
    })
}
