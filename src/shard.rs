//! Maps document indices to bounded-size shard directories.
//!
//! Layout beneath a run directory `R`:
//!
//! ```text
//! R/00000/doc_00000000.pdf
//! R/00000/doc_00000001.pdf
//! ...
//! R/00001/doc_00001000.pdf
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Returns the shard holding `index`.
#[must_use]
pub const fn shard_id(index: usize, shard_size: usize) -> usize {
    index / shard_size
}

/// Returns the artifact file name for `index`.
#[must_use]
pub fn artifact_name(index: usize, extension: &str) -> String {
    format!("doc_{index:08}.{extension}")
}

/// Returns the artifact path for `index` beneath `run_dir`.
///
/// Pure function of its arguments, performs no I/O.
#[must_use]
pub fn locate(index: usize, shard_size: usize, run_dir: &Path, extension: &str) -> PathBuf {
    run_dir
        .join(format!("{:05}", shard_id(index, shard_size)))
        .join(artifact_name(index, extension))
}

/// Creates the parent directory of `artifact`.
///
/// Idempotent; a directory created concurrently by another worker counts as
/// success.
///
/// # Errors
///
/// Returns the underlying IO error when the directory cannot be created.
pub fn ensure_dir(artifact: &Path) -> io::Result<()> {
    let Some(dir) = artifact.parent() else {
        return Ok(());
    };

    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Shard routing bound to one run directory.
#[derive(Debug, Clone)]
pub struct ShardRouter {
    run_dir: PathBuf,
    shard_size: usize,
    extension: String,
}

impl ShardRouter {
    /// Creates a router for `run_dir`.
    #[must_use]
    pub fn new(run_dir: impl Into<PathBuf>, shard_size: usize, extension: impl Into<String>) -> Self {
        Self {
            run_dir: run_dir.into(),
            shard_size,
            extension: extension.into(),
        }
    }

    /// Returns the artifact path for `index`.
    #[must_use]
    pub fn locate(&self, index: usize) -> PathBuf {
        locate(index, self.shard_size, &self.run_dir, &self.extension)
    }

    /// Returns the run directory this router writes beneath.
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}
