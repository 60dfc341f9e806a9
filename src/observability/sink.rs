//! Size-rotated, append-only file sink.
//!
//! # Rotation
//! When the next line would push the file past `max_bytes`, the file is
//! closed and renamed to `<name>.1`, existing backups shift up by one, and
//! anything beyond `backup_count` is dropped. A line is never split across
//! files; a single oversized line goes into a fresh file on its own.
//!
//! With `backup_count == 0` the file is truncated instead of renamed, and
//! `max_bytes == 0` disables rotation.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SinkError {
    fn io(path: &Path, source: io::Error) -> Self {
        SinkError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

struct SinkState {
    file: Option<File>,
    len: u64,
}

/// A log file shared by all request tasks. Writes are serialized by an
/// internal mutex so lines never interleave.
pub struct RotatingFileSink {
    path: PathBuf,
    max_bytes: u64,
    backup_count: u32,
    state: Mutex<SinkState>,
}

impl RotatingFileSink {
    /// Open (or create) the sink file in append mode.
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backup_count: u32) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SinkError::io(parent, e))?;
        }
        let file = open_append(&path)?;
        let len = file.metadata().map_err(|e| SinkError::io(&path, e))?.len();

        Ok(Self {
            path,
            max_bytes,
            backup_count,
            state: Mutex::new(SinkState {
                file: Some(file),
                len,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the `index`-th rotated file (`app.log.1`, `app.log.2`, …).
    pub fn backup_path(&self, index: u32) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    /// Append one line (a newline is added).
    pub fn write_line(&self, line: &str) -> Result<(), SinkError> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if self.should_rotate(state.len, buf.len() as u64) {
            self.rotate(&mut state)?;
        }

        if state.file.is_none() {
            let file = open_append(&self.path)?;
            state.len = file.metadata().map(|m| m.len()).unwrap_or(0);
            state.file = Some(file);
        }

        if let Some(file) = state.file.as_mut() {
            if let Err(e) = file.write_all(&buf) {
                // Reopen on the next write; the handle may be stale.
                state.file = None;
                return Err(SinkError::io(&self.path, e));
            }
        }
        state.len += buf.len() as u64;
        Ok(())
    }

    /// Flush buffered data to disk.
    pub fn flush(&self) -> Result<(), SinkError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(file) = state.file.as_mut() {
            file.flush().map_err(|e| SinkError::io(&self.path, e))?;
            file.sync_data().map_err(|e| SinkError::io(&self.path, e))?;
        }
        Ok(())
    }

    fn should_rotate(&self, current: u64, incoming: u64) -> bool {
        self.max_bytes > 0 && current > 0 && current + incoming > self.max_bytes
    }

    fn rotate(&self, state: &mut SinkState) -> Result<(), SinkError> {
        // Close before renaming.
        state.file = None;

        if self.backup_count > 0 {
            for index in (1..self.backup_count).rev() {
                let src = self.backup_path(index);
                if src.exists() {
                    let dst = self.backup_path(index + 1);
                    remove_if_exists(&dst)?;
                    fs::rename(&src, &dst).map_err(|e| SinkError::io(&src, e))?;
                }
            }
            let first = self.backup_path(1);
            remove_if_exists(&first)?;
            fs::rename(&self.path, &first).map_err(|e| SinkError::io(&self.path, e))?;
            state.file = Some(open_append(&self.path)?);
        } else {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)
                .map_err(|e| SinkError::io(&self.path, e))?;
            state.file = Some(file);
        }

        state.len = 0;
        Ok(())
    }
}

impl std::fmt::Debug for RotatingFileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingFileSink")
            .field("path", &self.path)
            .field("max_bytes", &self.max_bytes)
            .field("backup_count", &self.backup_count)
            .finish()
    }
}

fn open_append(path: &Path) -> Result<File, SinkError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| SinkError::io(path, e))
}

fn remove_if_exists(path: &Path) -> Result<(), SinkError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SinkError::io(path, e)),
    }
}
