use crate::{
    config::{GenerationConfig, OutputFormat},
    error::{Error, Result},
    pool::PoolOutcome,
    worker::WORKER_LOG_PREFIX,
};
use chrono::{DateTime, Local};
use globset::{Glob, GlobMatcher};
use serde::Serialize;
use std::{
    fmt::Write as _,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Separator between the timestamp prefix and the rest of a run directory name.
const NAME_SEPARATOR: &str = "_-_";
const TMP_MARKER: &str = "tmp";
const PREFIX_FORMAT: &str = "gen_%d%m_%H%M";
const MERGED_LOG: &str = "errors.log";
const PREVIOUS_LOG: &str = "errors_previous.log";
const REPORT_FILE: &str = "report.txt";
const RENAME_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Lifecycle of a run directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Temporary name; workers are (or were) writing beneath it
    InProgress,
    /// Logs merged and report being written; no worker is running
    Finalizing,
    /// Renamed to its final name
    Final,
}

/// Root output directory of one run.
///
/// Only the pipeline moves a run directory through its states; workers just
/// write beneath [`RunDirectory::path`].
#[derive(Debug)]
pub struct RunDirectory {
    output_dir: PathBuf,
    prefix: String,
    path: PathBuf,
    started: DateTime<Local>,
    state: RunState,
}

impl RunDirectory {
    /// Creates (or reuses) the temporary directory for a run starting now.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(output_dir: &Path) -> Result<Self> {
        Self::create_at(output_dir, Local::now())
    }

    /// Creates (or reuses) the temporary directory for a run started at `started`.
    ///
    /// A directory left behind by an interrupted run in the same minute is
    /// reused, which lets the new run skip its finished artifacts.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create_at(output_dir: &Path, started: DateTime<Local>) -> Result<Self> {
        let prefix = started.format(PREFIX_FORMAT).to_string();
        let path = output_dir.join(format!("{prefix}{NAME_SEPARATOR}{TMP_MARKER}"));

        if path.is_dir() {
            info!("Reusing in-progress run directory {}", path.display());
            archive_previous_errors(&path);
        }
        fs::create_dir_all(&path).map_err(|e| Error::io(&path, e))?;

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            prefix,
            path,
            started,
            state: RunState::InProgress,
        })
    }

    /// Reopens the temporary directory of an interrupted run.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not an existing directory with a
    /// temporary run name.
    pub fn open(path: &Path) -> Result<Self> {
        let rejected = |reason: &str| Error::RunDirectory {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if !path.is_dir() {
            return Err(rejected("not an existing directory"));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| rejected("directory name is not valid UTF-8"))?;

        let prefix = name
            .strip_suffix(TMP_MARKER)
            .and_then(|rest| rest.strip_suffix(NAME_SEPARATOR))
            .filter(|prefix| !prefix.is_empty())
            .ok_or_else(|| rejected("name does not end with '_-_tmp'"))?;

        let output_dir = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        archive_previous_errors(path);

        Ok(Self {
            output_dir,
            prefix: prefix.to_string(),
            path: path.to_path_buf(),
            started: Local::now(),
            state: RunState::InProgress,
        })
    }

    /// Current location of the run directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Timestamp prefix shared by the temporary and final names.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            matches!(
                (self.state, next),
                (RunState::InProgress, RunState::Finalizing) | (RunState::Finalizing, RunState::Final)
            ),
            "invalid run directory transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("Run directory {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Picks a final path that does not exist yet.
    ///
    /// A collision gets the two-digit start second appended, then a counter.
    fn final_path(&self, num_documents: usize, docs_per_second: f64) -> PathBuf {
        let name = final_dir_name(&self.prefix, num_documents, docs_per_second);
        let candidate = self.output_dir.join(&name);
        if !candidate.exists() {
            return candidate;
        }

        let suffixed = format!("{name}_{}", self.started.format("%S"));
        let candidate = self.output_dir.join(&suffixed);
        if !candidate.exists() {
            return candidate;
        }

        (2..)
            .map(|n| self.output_dir.join(format!("{suffixed}_{n}")))
            .find(|candidate| !candidate.exists())
            .unwrap_or(candidate)
    }
}

/// Final directory name: `<prefix>_-_<num_documents>_<throughput digits>`.
#[must_use]
pub fn final_dir_name(prefix: &str, num_documents: usize, docs_per_second: f64) -> String {
    format!(
        "{prefix}{NAME_SEPARATOR}{num_documents}_{}",
        throughput_digits(docs_per_second)
    )
}

/// Throughput rounded to two decimals with separators stripped, e.g. `12.34` -> `1234`.
#[must_use]
pub fn throughput_digits(docs_per_second: f64) -> String {
    format!("{docs_per_second:.2}").replace(['.', ','], "")
}

/// Summary written to `report.txt`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Documents requested
    pub total_documents: usize,
    /// Documents whose artifact exists
    pub generated: usize,
    /// Documents that failed
    pub errors: usize,
    /// Grayscale output
    pub grayscale: bool,
    /// Page encoding
    pub output_format: OutputFormat,
    /// Raster resolution
    pub resolution: u32,
    /// Lossy encoder quality
    pub quality: u8,
    /// Documents per batch
    pub batch_size: usize,
    /// Batches per dispatch
    pub chunksize: usize,
    /// Documents per shard
    pub shard_size: usize,
    /// Workers started
    pub workers: usize,
    /// Wall time in seconds
    pub total_seconds: f64,
    /// Throughput
    pub docs_per_second: f64,
}

impl RunReport {
    /// Builds the report of a drained pool.
    #[must_use]
    pub fn new(config: &GenerationConfig, outcome: &PoolOutcome) -> Self {
        Self {
            total_documents: config.num_documents,
            generated: outcome.totals.processed,
            errors: outcome.totals.failed,
            grayscale: config.grayscale,
            output_format: config.output_format,
            resolution: config.resolution,
            quality: config.quality,
            batch_size: config.batch_size,
            chunksize: config.chunksize,
            shard_size: config.shard_size,
            workers: outcome.workers,
            total_seconds: outcome.elapsed.as_secs_f64(),
            docs_per_second: outcome.docs_per_second(),
        }
    }

    /// Renders the report as `key=value` lines.
    #[must_use]
    pub fn to_key_values(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "total_documents={}", self.total_documents);
        let _ = writeln!(out, "generated={}", self.generated);
        let _ = writeln!(out, "errors={}", self.errors);
        let _ = writeln!(out, "grayscale={}", self.grayscale);
        let _ = writeln!(out, "output_format={}", self.output_format);
        let _ = writeln!(out, "resolution={}", self.resolution);
        let _ = writeln!(out, "quality={}", self.quality);
        let _ = writeln!(out, "batch_size={}", self.batch_size);
        let _ = writeln!(out, "chunksize={}", self.chunksize);
        let _ = writeln!(out, "shard_size={}", self.shard_size);
        let _ = writeln!(out, "workers={}", self.workers);
        let _ = writeln!(out, "total_seconds={:.2}", self.total_seconds);
        let _ = write!(out, "docs_per_second={:.2}", self.docs_per_second);
        out
    }
}

/// Merges worker logs, writes the report and renames the run directory.
///
/// Log merge problems and name collisions are absorbed. A rename that keeps
/// failing leaves the run under its temporary name and returns that path.
///
/// # Errors
///
/// Returns an error only if the report cannot be written.
pub fn finalize(mut run_dir: RunDirectory, report: &RunReport) -> Result<PathBuf> {
    run_dir.transition(RunState::Finalizing);

    let merged = merge_worker_logs(run_dir.path());
    debug!("Merged {} worker error logs", merged);

    let report_path = run_dir.path().join(REPORT_FILE);
    fs::write(&report_path, report.to_key_values()).map_err(|e| Error::io(&report_path, e))?;

    let target = run_dir.final_path(report.total_documents, report.docs_per_second);
    let final_path = match move_dir(run_dir.path(), &target) {
        Ok(()) => target,
        Err(e) => {
            error!(
                "Could not move {} to {}: {}; run left under its temporary name",
                run_dir.path().display(),
                target.display(),
                e
            );
            run_dir.path().to_path_buf()
        }
    };

    run_dir.transition(RunState::Final);

    info!("Run directory finalized at {}", final_path.display());
    Ok(final_path)
}

fn worker_log_matcher() -> Result<GlobMatcher> {
    Ok(Glob::new(&format!("{WORKER_LOG_PREFIX}*.log"))?.compile_matcher())
}

/// Appends every readable worker log to `errors.log` and deletes the merged ones.
///
/// Unreadable logs are skipped and left in place. Returns the number of logs merged.
pub(crate) fn merge_worker_logs(run_dir: &Path) -> usize {
    merge_worker_logs_into(run_dir, MERGED_LOG)
}

/// Moves failures recorded by an earlier attempt into `errors_previous.log`.
///
/// `errors.log` of the finished run then lists only failures counted in its
/// report. Best effort, like the final merge.
fn archive_previous_errors(run_dir: &Path) {
    let mut archived = merge_worker_logs_into(run_dir, PREVIOUS_LOG);

    let merged_path = run_dir.join(MERGED_LOG);
    if merged_path.is_file() {
        let moved = fs::read_to_string(&merged_path)
            .and_then(|text| append_to(&run_dir.join(PREVIOUS_LOG), &text))
            .and_then(|()| fs::remove_file(&merged_path));
        match moved {
            Ok(()) => archived += 1,
            Err(e) => warn!("Could not archive {}: {}", merged_path.display(), e),
        }
    }

    if archived > 0 {
        info!(
            "Moved {} error log(s) of the earlier attempt to {}",
            archived, PREVIOUS_LOG
        );
    }
}

fn append_to(path: &Path, text: &str) -> io::Result<()> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(text.as_bytes()))
}

fn merge_worker_logs_into(run_dir: &Path, target: &str) -> usize {
    let matcher = match worker_log_matcher() {
        Ok(matcher) => matcher,
        Err(e) => {
            warn!("Invalid worker log pattern: {}", e);
            return 0;
        }
    };

    let entries = match fs::read_dir(run_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list {}: {}", run_dir.display(), e);
            return 0;
        }
    };

    let mut logs: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .is_some_and(|name| matcher.is_match(Path::new(name)))
        })
        .collect();
    logs.sort();

    if logs.is_empty() {
        return 0;
    }

    let mut merged = String::new();
    let mut readable = Vec::with_capacity(logs.len());
    for log in logs {
        match fs::read_to_string(&log) {
            Ok(text) => {
                merged.push_str(&text);
                if !text.is_empty() && !text.ends_with('\n') {
                    merged.push('\n');
                }
                readable.push(log);
            }
            Err(e) => warn!("Skipping unreadable worker log {}: {}", log.display(), e),
        }
    }

    let merged_path = run_dir.join(target);
    if let Err(e) = append_to(&merged_path, &merged) {
        warn!(
            "Could not write {}: {}; keeping worker logs",
            merged_path.display(),
            e
        );
        return 0;
    }

    for log in &readable {
        if let Err(e) = fs::remove_file(log) {
            warn!("Could not remove {}: {}", log.display(), e);
        }
    }

    readable.len()
}

/// Renames `from` to `to`, retrying once, then falls back to copy-and-remove.
///
/// `to` must not exist. The copy fallback never writes into, or removes, a
/// directory it did not create. Once the copy is complete the move counts as
/// done even if `from` cannot be removed.
fn move_dir(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) => warn!(
            "Rename of {} failed ({}), retrying in {}ms",
            from.display(),
            e,
            RENAME_RETRY_DELAY.as_millis()
        ),
    }

    thread::sleep(RENAME_RETRY_DELAY);

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!("Rename failed again ({}), copying instead", e);
            copy_and_remove(from, to)
        }
    }
}

/// Copies `from` to the new directory `to`, then removes `from`.
///
/// A leftover `from` is only warned about; `to` is complete at that point.
fn copy_and_remove(from: &Path, to: &Path) -> io::Result<()> {
    copy_dir(from, to)?;

    if let Err(e) = fs::remove_dir_all(from) {
        warn!(
            "Copied to {} but could not remove {}: {}",
            to.display(),
            from.display(),
            e
        );
    }
    Ok(())
}

/// Recursively copies the tree at `from` into a new directory `to`.
///
/// Fails with [`io::ErrorKind::AlreadyExists`] if `to` exists. A partial copy
/// is removed again.
fn copy_dir(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir(to)?;

    copy_tree(from, to).inspect_err(|_| {
        let _ = fs::remove_dir_all(to);
    })
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(io::Error::other)?;
        let dest = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir(&dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::BatchResult;
    use assert_fs::prelude::*;
    use chrono::TimeZone;

    fn started() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    fn create_test_report(generated: usize, errors: usize, docs_per_second: f64) -> RunReport {
        let config = GenerationConfig::builder()
            .num_documents(generated + errors)
            .build()
            .unwrap();
        let outcome = PoolOutcome {
            totals: BatchResult {
                processed: generated,
                failed: errors,
                skipped: 0,
            },
            batches: 1,
            workers: 2,
            elapsed: Duration::from_secs(2),
        };
        RunReport {
            docs_per_second,
            ..RunReport::new(&config, &outcome)
        }
    }

    #[test]
    fn test_create_uses_timestamp_prefix() {
        let temp = assert_fs::TempDir::new().unwrap();
        let run_dir = RunDirectory::create_at(temp.path(), started()).unwrap();

        assert_eq!(run_dir.prefix(), "gen_1403_0926");
        assert_eq!(run_dir.path(), temp.path().join("gen_1403_0926_-_tmp"));
        assert_eq!(run_dir.state(), RunState::InProgress);
        assert!(run_dir.path().is_dir());
    }

    #[test]
    fn test_create_reuses_existing_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("gen_1403_0926_-_tmp/00000/doc_00000000.pdf")
            .write_str("done")
            .unwrap();

        let run_dir = RunDirectory::create_at(temp.path(), started()).unwrap();
        assert!(run_dir.path().join("00000/doc_00000000.pdf").exists());
    }

    #[test]
    fn test_open_temporary_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("gen_0101_0000_-_tmp").create_dir_all().unwrap();

        let run_dir = RunDirectory::open(&temp.path().join("gen_0101_0000_-_tmp")).unwrap();
        assert_eq!(run_dir.prefix(), "gen_0101_0000");
        assert_eq!(run_dir.output_dir, temp.path());
    }

    #[test]
    fn test_open_rejects_final_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("gen_0101_0000_-_10_512").create_dir_all().unwrap();

        let result = RunDirectory::open(&temp.path().join("gen_0101_0000_-_10_512"));
        assert!(matches!(result, Err(Error::RunDirectory { .. })));

        let result = RunDirectory::open(&temp.path().join("missing_-_tmp"));
        assert!(matches!(result, Err(Error::RunDirectory { .. })));
    }

    #[test]
    fn test_throughput_digits() {
        assert_eq!(throughput_digits(12.346), "1235");
        assert_eq!(throughput_digits(0.0), "000");
        assert_eq!(final_dir_name("gen_1403_0926", 5, 2.5), "gen_1403_0926_-_5_250");
    }

    #[test]
    fn test_report_lines() {
        let report = create_test_report(4, 1, 2.0);
        let text = report.to_key_values();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "total_documents=5");
        assert_eq!(lines[1], "generated=4");
        assert_eq!(lines[2], "errors=1");
        assert!(lines.contains(&"grayscale=true"));
        assert!(lines.contains(&"output_format=JPEG"));
        assert!(lines.contains(&"resolution=80"));
        assert!(lines.contains(&"total_seconds=2.00"));
        assert_eq!(*lines.last().unwrap(), "docs_per_second=2.00");
    }

    #[test]
    fn test_merge_worker_logs() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("errors_worker_100_0.log")
            .write_str("idx=3 error=render failure: boom\n")
            .unwrap();
        temp.child("errors_worker_100_1.log").write_str("").unwrap();
        temp.child("errors_worker_100_2.log")
            .write_str("idx=9 error=write failure")
            .unwrap();
        temp.child("unrelated.log").write_str("keep me").unwrap();

        let merged = merge_worker_logs(temp.path());

        assert_eq!(merged, 3);
        temp.child("errors.log")
            .assert("idx=3 error=render failure: boom\nidx=9 error=write failure\n");
        assert!(!temp.child("errors_worker_100_0.log").exists());
        assert!(!temp.child("errors_worker_100_2.log").exists());
        assert!(temp.child("unrelated.log").exists());
    }

    #[test]
    fn test_merge_without_logs() {
        let temp = assert_fs::TempDir::new().unwrap();
        assert_eq!(merge_worker_logs(temp.path()), 0);
        assert!(!temp.child("errors.log").exists());
    }

    #[test]
    fn test_finalize_renames_and_reports() {
        let temp = assert_fs::TempDir::new().unwrap();
        let run_dir = RunDirectory::create_at(temp.path(), started()).unwrap();
        let tmp_path = run_dir.path().to_path_buf();
        fs::write(tmp_path.join("errors_worker_1_0.log"), "idx=3 error=x\n").unwrap();

        let final_path = finalize(run_dir, &create_test_report(4, 1, 2.5)).unwrap();

        assert_eq!(final_path, temp.path().join("gen_1403_0926_-_5_250"));
        assert!(!tmp_path.exists());
        assert!(final_path.join("report.txt").exists());
        assert_eq!(
            fs::read_to_string(final_path.join("errors.log")).unwrap(),
            "idx=3 error=x\n"
        );
    }

    #[test]
    fn test_finalize_name_collision() {
        let temp = assert_fs::TempDir::new().unwrap();
        let report = create_test_report(5, 0, 2.5);

        let first = finalize(RunDirectory::create_at(temp.path(), started()).unwrap(), &report).unwrap();
        let second = finalize(RunDirectory::create_at(temp.path(), started()).unwrap(), &report).unwrap();
        let third = finalize(RunDirectory::create_at(temp.path(), started()).unwrap(), &report).unwrap();

        assert_eq!(first, temp.path().join("gen_1403_0926_-_5_250"));
        assert_eq!(second, temp.path().join("gen_1403_0926_-_5_250_53"));
        assert_eq!(third, temp.path().join("gen_1403_0926_-_5_250_53_2"));
        assert!(first.is_dir() && second.is_dir() && third.is_dir());
    }

    #[test]
    fn test_copy_dir() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/00000/doc_00000000.pdf").write_str("a").unwrap();
        temp.child("src/report.txt").write_str("b").unwrap();

        copy_dir(&temp.path().join("src"), &temp.path().join("dst")).unwrap();

        temp.child("dst/00000/doc_00000000.pdf").assert("a");
        temp.child("dst/report.txt").assert("b");
    }

    #[test]
    fn test_open_archives_earlier_errors() {
        let temp = assert_fs::TempDir::new().unwrap();
        let tmp_dir = temp.child("gen_0101_0000_-_tmp");
        tmp_dir
            .child("errors_worker_99999_0.log")
            .write_str("idx=3 error=render failure: old\n")
            .unwrap();
        tmp_dir.child("errors.log").write_str("idx=5 error=write failure\n").unwrap();

        RunDirectory::open(tmp_dir.path()).unwrap();

        tmp_dir
            .child("errors_previous.log")
            .assert("idx=3 error=render failure: old\nidx=5 error=write failure\n");
        assert!(!tmp_dir.child("errors_worker_99999_0.log").exists());
        assert!(!tmp_dir.child("errors.log").exists());
    }

    #[test]
    fn test_reused_directory_archives_earlier_errors() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("gen_1403_0926_-_tmp/errors_worker_1_2.log")
            .write_str("idx=7 error=encode failure: bad jpeg\n")
            .unwrap();

        let run_dir = RunDirectory::create_at(temp.path(), started()).unwrap();

        assert!(!run_dir.path().join("errors_worker_1_2.log").exists());
        assert_eq!(
            fs::read_to_string(run_dir.path().join("errors_previous.log")).unwrap(),
            "idx=7 error=encode failure: bad jpeg\n"
        );
        assert_eq!(merge_worker_logs(run_dir.path()), 0);
    }

    #[test]
    fn test_move_dir_refuses_existing_target() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("from/report.txt").write_str("new run").unwrap();
        temp.child("from/00000/doc_00000001.pdf").write_str("new").unwrap();
        temp.child("to/report.txt").write_str("other run").unwrap();
        temp.child("to/00000/doc_00000000.pdf").write_str("other").unwrap();

        let result = move_dir(&temp.path().join("from"), &temp.path().join("to"));

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::AlreadyExists);
        temp.child("to/report.txt").assert("other run");
        temp.child("to/00000/doc_00000000.pdf").assert("other");
        assert!(!temp.child("to/00000/doc_00000001.pdf").exists());
        temp.child("from/report.txt").assert("new run");
        temp.child("from/00000/doc_00000001.pdf").assert("new");
    }

    #[test]
    fn test_copy_dir_leaves_existing_target_alone() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/report.txt").write_str("new run").unwrap();
        temp.child("dst").create_dir_all().unwrap();

        let result = copy_dir(&temp.path().join("src"), &temp.path().join("dst"));

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::AlreadyExists);
        assert!(temp.child("dst").is_dir());
        assert!(!temp.child("dst/report.txt").exists());
    }

    #[test]
    fn test_copy_and_remove() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("from/00000/doc_00000000.pdf").write_str("a").unwrap();
        temp.child("from/report.txt").write_str("b").unwrap();

        copy_and_remove(&temp.path().join("from"), &temp.path().join("to")).unwrap();

        assert!(!temp.child("from").exists());
        temp.child("to/00000/doc_00000000.pdf").assert("a");
        temp.child("to/report.txt").assert("b");
    }

    #[test]
    fn test_copy_and_remove_keeps_copy_when_source_stays() {
        let temp = assert_fs::TempDir::new().unwrap();
        // A plain file copies as an empty tree but cannot be removed as a directory.
        temp.child("from").write_str("not a directory").unwrap();

        let result = copy_and_remove(&temp.path().join("from"), &temp.path().join("to"));

        assert!(result.is_ok());
        assert!(temp.child("to").is_dir());
        assert!(temp.child("from").exists());
    }

    #[test]
    fn test_move_dir() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("from/file.txt").write_str("x").unwrap();

        move_dir(&temp.path().join("from"), &temp.path().join("to")).unwrap();

        assert!(!temp.child("from").exists());
        temp.child("to/file.txt").assert("x");
    }
}
