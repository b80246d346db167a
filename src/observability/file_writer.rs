//! Size-rotated append-only file used as the trace sink.
//!
//! Each write appends one line. Once the file grows past [`MAX_FILE_SIZE_BYTES`]
//! it is renamed to `<name>.<unix-secs>` and a fresh file is started; only the
//! newest [`MAX_BACKUP_FILES`] rotated files are kept.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Size at which the trace file is rotated (10 MB).
const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Rotated files retained next to the live one.
const MAX_BACKUP_FILES: usize = 3;

/// Line-oriented file writer with size-based rotation.
///
/// The handle is opened lazily on the first write and guarded by a mutex, so
/// one writer can be shared by the span exporter across threads.
pub struct RotatingFile {
    path: PathBuf,
    handle: Mutex<Option<fs::File>>,
}

impl RotatingFile {
    /// Creates a writer for `path`. Nothing is opened until the first write.
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
            handle: Mutex::new(None),
        }
    }

    /// Path of the live file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `line` plus a newline, rotating first if the file is too large.
    ///
    /// # Errors
    ///
    /// Fails if the lock is poisoned or any rename, open, or write fails.
    pub fn append_line(&self, line: &str) -> std::io::Result<()> {
        let mut handle = self
            .handle
            .lock()
            .map_err(|e| std::io::Error::other(format!("trace file lock poisoned: {e}")))?;

        if fs::metadata(&self.path).is_ok_and(|m| m.len() > MAX_FILE_SIZE_BYTES) {
            *handle = None;
            self.rotate()?;
        }

        if handle.is_none() {
            *handle = Some(OpenOptions::new().create(true).append(true).open(&self.path)?);
        }
        let Some(file) = handle.as_mut() else {
            return Err(std::io::Error::other("trace file unavailable"));
        };

        writeln!(file, "{line}")?;
        file.flush()
    }

    fn rotate(&self) -> std::io::Result<()> {
        let stamp = chrono::Utc::now().timestamp();
        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| std::io::Error::other("trace path has no file name"))?;
        let backup = self.path.with_file_name(format!("{file_name}.{stamp}"));

        if self.path.exists() {
            fs::rename(&self.path, &backup)?;
        }
        self.prune_backups(file_name)
    }

    fn prune_backups(&self, file_name: &str) -> std::io::Result<()> {
        let Some(dir) = self.path.parent() else {
            return Ok(());
        };
        let prefix = format!("{file_name}.");

        let mut backups: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix))
            })
            .collect();

        // Newest first; the suffix is a unix timestamp.
        backups.sort_by(|a, b| b.cmp(a));

        for stale in backups.iter().skip(MAX_BACKUP_FILES) {
            if let Err(e) = fs::remove_file(stale) {
                tracing::debug!(path = ?stale, error = %e, "failed to remove old trace backup");
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for RotatingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingFile")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
