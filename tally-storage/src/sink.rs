use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tally_common::error::Result;
use tally_common::types::SnapshotRecord;
use tracing::trace;

/// Defines the behavior for any destination of flushed records.
///
/// `append` is called once per flush cycle and must have persisted the record
/// by the time it returns.
pub trait RecordSink: Send + Sync {
    fn append(&self, record: &SnapshotRecord) -> Result<()>;
}

/// Appends one text line per record to a local file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Opens the destination once up front so an unwritable path fails here
    /// rather than on the first flush.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        Self::open_append(&path)?;
        Ok(Self { path })
    }

    fn open_append(path: &Path) -> Result<File> {
        Ok(OpenOptions::new().create(true).append(true).open(path)?)
    }
}

impl RecordSink for FileSink {
    fn append(&self, record: &SnapshotRecord) -> Result<()> {
        let line = record.to_line();
        let mut file = Self::open_append(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        trace!(path = %self.path.display(), bytes = line.len(), "record appended");
        Ok(())
    }
}
