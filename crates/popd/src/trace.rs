//! Append-mode trace file shared by the diagnostics layers.
//!
//! A [`TraceSink`] is a cheap handle around at most one open file. Clones
//! share the same file, so the supervisor can rotate it in place while the
//! telemetry layer keeps writing through its own clone.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing_subscriber::fmt::MakeWriter;

/// Errors raised while opening or rotating the trace file.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The trace path could not be made absolute.
    #[error("unable to resolve trace file \"{path}\": {source}")]
    Resolve {
        /// Path as supplied.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The trace file could not be opened for appending.
    #[error("Unable to open trace file \"{path}\": {source}")]
    Open {
        /// Absolute trace file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
struct TraceFile {
    path: PathBuf,
    file: File,
}

/// Shared handle to the optional trace file.
#[derive(Debug, Clone, Default)]
pub struct TraceSink {
    inner: Arc<Mutex<Option<TraceFile>>>,
}

impl TraceSink {
    /// A sink with no file behind it; writes are discarded.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Opens `path` for appending.
    ///
    /// Relative paths are resolved against the current directory now, so
    /// later reopening is unaffected by the daemon changing directory.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError`] when the path cannot be resolved or opened.
    pub fn open(path: &Path) -> Result<Self, TraceError> {
        let absolute = std::path::absolute(path).map_err(|source| TraceError::Resolve {
            path: path.to_path_buf(),
            source,
        })?;
        let file = open_append(&absolute)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Some(TraceFile {
                path: absolute,
                file,
            }))),
        })
    }

    /// Opens the configured path, or returns a disabled sink when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError`] when the path cannot be resolved or opened.
    pub fn from_config(path: Option<&Path>) -> Result<Self, TraceError> {
        path.map_or_else(|| Ok(Self::disabled()), Self::open)
    }

    /// Flushes, closes, and reopens the file at the same path.
    ///
    /// Returns `false` when no file is open. If reopening fails the sink is
    /// left closed.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Open`] when the path cannot be reopened.
    pub fn rotate(&self) -> Result<bool, TraceError> {
        let mut slot = self.lock();
        let Some(current) = slot.take() else {
            return Ok(false);
        };
        let TraceFile { path, mut file } = current;
        file.flush().ok();
        drop(file);
        let reopened = open_append(&path)?;
        *slot = Some(TraceFile {
            path,
            file: reopened,
        });
        Ok(true)
    }

    /// Flushes and closes the file. Later writes are discarded.
    pub fn close(&self) {
        if let Some(mut current) = self.lock().take() {
            current.file.flush().ok();
        }
    }

    /// Descriptor of the open file, if any.
    #[must_use]
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.lock().as_ref().map(|current| current.file.as_raw_fd())
    }

    /// Whether a file is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Path of the open file, if any.
    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        self.lock().as_ref().map(|current| current.path.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Option<TraceFile>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn open_append(path: &Path) -> Result<File, TraceError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| TraceError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Writer handed to the formatting layer for each event.
#[derive(Debug)]
pub struct TraceWriter {
    inner: Arc<Mutex<Option<TraceFile>>>,
}

impl Write for TraceWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_mut() {
            Some(current) => current.file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_mut().map_or(Ok(()), |current| current.file.flush())
    }
}

impl<'a> MakeWriter<'a> for TraceSink {
    type Writer = TraceWriter;

    fn make_writer(&'a self) -> Self::Writer {
        TraceWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn dir() -> TempDir {
        TempDir::new().expect("create temp dir")
    }

    fn write_line(sink: &TraceSink, line: &str) {
        let mut writer = sink.make_writer();
        writeln!(writer, "{line}").expect("write trace line");
    }

    #[rstest]
    fn rotation_reopens_the_same_path(dir: TempDir) {
        let path = dir.path().join("pop.trace");
        let sink = TraceSink::open(&path).expect("open trace");
        write_line(&sink, "before");

        let rotated = dir.path().join("pop.trace.1");
        fs::rename(&path, &rotated).expect("rename trace");
        assert!(sink.rotate().expect("rotate"));
        assert_eq!(sink.path().as_deref(), Some(path.as_path()));
        write_line(&sink, "after");

        assert_eq!(fs::read_to_string(&rotated).expect("read old"), "before\n");
        assert_eq!(fs::read_to_string(&path).expect("read new"), "after\n");
    }

    #[rstest]
    fn clones_observe_rotation_and_close(dir: TempDir) {
        let path = dir.path().join("pop.trace");
        let sink = TraceSink::open(&path).expect("open trace");
        let clone = sink.clone();
        sink.rotate().expect("rotate");
        assert_eq!(clone.raw_fd(), sink.raw_fd());
        sink.close();
        assert!(!clone.is_open());
        write_line(&clone, "discarded");
        assert_eq!(fs::read_to_string(&path).expect("read trace"), "");
    }

    #[test]
    fn disabled_sink_does_not_rotate() {
        let sink = TraceSink::disabled();
        assert!(!sink.rotate().expect("rotate"));
        assert_eq!(sink.raw_fd(), None);
    }

    #[rstest]
    fn unopenable_path_reports_open_error(dir: TempDir) {
        let path = dir.path().join("missing").join("pop.trace");
        let error = TraceSink::open(&path).expect_err("open must fail");
        assert!(matches!(error, TraceError::Open { .. }));
    }
}
