use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Run-level error types for the docbatch library.
///
/// Per-document failures never surface here; they are recorded in the
/// worker error logs and counted (see [`DocumentError`]).
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// Template rendering engine setup error.
    #[error("Failed to register template '{template}': {message}")]
    Template {
        /// Template name
        template: String,
        /// Error message
        message: String,
    },

    /// A worker could not reach its ready state.
    #[error("Worker {worker} failed to initialize: {message}")]
    WorkerInit {
        /// Worker number within the pool
        worker: usize,
        /// Error message
        message: String,
    },

    /// The worker pool could not be started.
    #[error("Failed to start worker pool: {message}")]
    Pool {
        /// Error message
        message: String,
    },

    /// Dispatched batches whose results were never returned.
    #[error("{missing} of {dispatched} dispatched batches never returned a result")]
    WorkerLost {
        /// Batches without a result
        missing: usize,
        /// Batches sent to the pool
        dispatched: usize,
    },

    /// The run directory is not in the expected lifecycle state.
    #[error("Run directory '{path}' is not resumable: {reason}")]
    RunDirectory {
        /// Offending directory
        path: PathBuf,
        /// Reason why it was rejected
        reason: String,
    },

    /// A run failed after its temporary directory was created.
    ///
    /// The directory is left in place for inspection.
    #[error("Run aborted, partial output kept in '{run_dir}': {source}")]
    Aborted {
        /// Temporary run directory left behind
        run_dir: PathBuf,
        /// Underlying failure
        source: Box<Error>,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a template registration error.
    #[must_use]
    pub fn template(template: impl Into<String>, source: tera::Error) -> Self {
        Self::Template {
            template: template.into(),
            message: source.to_string(),
        }
    }

    /// Creates a worker initialization error.
    #[must_use]
    pub fn worker_init(worker: usize, message: impl Into<String>) -> Self {
        Self::WorkerInit {
            worker,
            message: message.into(),
        }
    }

    /// Wraps an error raised while `run_dir` was in progress.
    #[must_use]
    pub fn aborted(run_dir: impl Into<PathBuf>, source: Self) -> Self {
        Self::Aborted {
            run_dir: run_dir.into(),
            source: Box::new(source),
        }
    }

    /// Returns the temporary run directory left behind by an aborted run.
    #[must_use]
    pub fn run_dir(&self) -> Option<&Path> {
        match self {
            Self::Aborted { run_dir, .. } => Some(run_dir),
            _ => None,
        }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns true if the run was aborted after its directory was created.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Failure reported by a [`Renderer`](crate::Renderer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The template identifier could not be resolved.
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    /// Layout or rasterization failed.
    #[error("render failure: {0}")]
    Render(String),

    /// Image or container encoding failed.
    #[error("encode failure: {0}")]
    Encode(String),
}

/// Recoverable failure of a single document.
///
/// Logged to the worker error log and counted, never propagated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The renderer rejected the document.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The artifact or its shard directory could not be written.
    #[error("write failure at '{path}': {message}")]
    Write {
        /// Target path
        path: PathBuf,
        /// Error message
        message: String,
    },
}

impl DocumentError {
    /// Creates a write failure with path context.
    #[must_use]
    pub fn write(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Single-line description suitable for the error log.
    #[must_use]
    pub fn log_line(&self) -> String {
        self.to_string().replace(['\r', '\n'], " ")
    }
}

// Conversion implementations for convenient error handling
impl From<globset::Error> for Error {
    fn from(e: globset::Error) -> Self {
        Self::Config {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("test message");
        assert!(err.is_config());
        assert!(err.to_string().contains("test message"));
    }

    #[test]
    fn test_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io("/tmp/test.txt", io_err);
        assert!(err.is_io());
        assert!(err.to_string().contains("/tmp/test.txt"));
    }

    #[test]
    fn test_aborted_keeps_run_dir() {
        let inner = Error::WorkerLost {
            missing: 1,
            dispatched: 4,
        };
        let err = Error::aborted("/out/gen_0101_1200_-_tmp", inner);

        assert!(err.is_aborted());
        assert_eq!(err.run_dir(), Some(Path::new("/out/gen_0101_1200_-_tmp")));
        assert!(err.to_string().contains("1 of 4"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_clone() {
        let err = Error::worker_init(2, "bad template");
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_document_error_from_render() {
        let err: DocumentError = RenderError::Encode("bad jpeg".to_string()).into();
        assert_eq!(err.to_string(), "encode failure: bad jpeg");
    }

    #[test]
    fn test_template_error_names_template() {
        let source = tera::Tera::one_off("{{ ", &tera::Context::new(), false).unwrap_err();
        let err = Error::template("plain.html", source);

        assert!(matches!(&err, Error::Template { template, .. } if template == "plain.html"));
        assert!(err.to_string().contains("'plain.html'"));
    }

    #[test]
    fn test_log_line_is_single_line() {
        let err = DocumentError::from(RenderError::Render("line one\nline two".to_string()));
        assert_eq!(err.log_line(), "render failure: line one line two");
    }
}
