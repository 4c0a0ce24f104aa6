//! Incremental tail over the command file.
//!
//! The open handle is the read cursor: each poll returns only lines appended
//! since the previous one. A trailing fragment with no newline yet is held
//! back until the writer finishes the line.


use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum FeedError {
    Open { path: PathBuf, source: io::Error },
    Read { path: PathBuf, source: io::Error },
    Closed { path: PathBuf },
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Open { path, source } => {
                write!(f, "failed to open command file '{}': {source}", path.display())
            }
            FeedError::Read { path, source } => {
                write!(f, "failed to read command file '{}': {source}", path.display())
            }
            FeedError::Closed { path } => {
                write!(f, "command file '{}' is already closed", path.display())
            }
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Open { source, .. } | FeedError::Read { source, .. } => Some(source),
            FeedError::Closed { .. } => None,
        }
    }
}

/// Tail over any buffered reader; files use the default `BufReader<File>`.
pub struct CommandFeed<R = BufReader<File>> {
    path: PathBuf,
    reader: Option<R>,
    partial: Vec<u8>,
}

impl CommandFeed {
    pub fn open(path: &Path) -> Result<Self, FeedError> {
        let file = File::open(path).map_err(|source| FeedError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let metadata = file.metadata().map_err(|source| FeedError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        if metadata.is_dir() {
            return Err(FeedError::Open {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "path is a directory"),
            });
        }
        Ok(Self::from_reader(path, BufReader::new(file)))
    }
}

impl<R: BufRead> CommandFeed<R> {
    /// Tail `reader` from its current position. `path` is only used in errors and logs.
    pub fn from_reader(path: &Path, reader: R) -> Self {
        Self {
            path: path.to_path_buf(),
            reader: Some(reader),
            partial: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Lines completed since the last poll, trimmed, in file order.
    ///
    /// A read error after some lines were completed returns those lines; the
    /// error shows up again on the next poll if it persists. Bytes consumed
    /// before an error stay in the partial line.
    pub fn poll_new_lines(&mut self) -> Result<Vec<String>, FeedError> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(FeedError::Closed {
                path: self.path.clone(),
            });
        };
        let mut lines = Vec::new();
        loop {
            let read = match reader.read_until(b'\n', &mut self.partial) {
                Ok(read) => read,
                Err(source) if lines.is_empty() => {
                    return Err(FeedError::Read {
                        path: self.path.clone(),
                        source,
                    })
                }
                Err(err) => {
                    tracing::warn!(
                        "read from '{}' failed after {} new line(s): {err}",
                        self.path.display(),
                        lines.len()
                    );
                    break;
                }
            };
            if read == 0 || self.partial.last() != Some(&b'\n') {
                break;
            }
            lines.push(String::from_utf8_lossy(&self.partial).trim().to_string());
            self.partial.clear();
        }
        Ok(lines)
    }

    /// Release the reader. Returns whether this call closed it.
    pub fn close(&mut self) -> bool {
        self.reader.take().is_some()
    }
}
