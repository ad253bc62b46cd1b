use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use super::TelemetryStream;
use crate::error::Result;

#[derive(Debug)]
struct OpenFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

/// Appends packets to a capture file. Can be shut down and re-opened on another path.
#[derive(Debug, Default)]
pub struct FileStream {
    file: Mutex<Option<OpenFile>>,
}

impl FileStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (truncating) the capture file. Any previously open file is closed first.
    pub fn init(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        let writer = BufWriter::new(File::create(&path)?);
        let mut slot = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut old) = slot.take() {
            old.writer.flush()?;
        }
        info!("Telemetry file stream opened: {}", path.display());
        *slot = Some(OpenFile { path, writer });
        Ok(())
    }

    pub fn shutdown(&self) -> Result<()> {
        let mut slot = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut open) = slot.take() {
            open.writer.flush()?;
            debug!("Telemetry file stream closed: {}", open.path.display());
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.file.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|open| open.path.clone())
    }
}

impl TelemetryStream for FileStream {
    fn write(&self, data: &[u8]) -> std::io::Result<()> {
        let mut slot = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_mut() {
            Some(open) => {
                open.writer.write_all(data)?;
                open.writer.flush()
            }
            None => Err(std::io::Error::new(ErrorKind::NotConnected, "file stream is not open")),
        }
    }
}

impl Drop for FileStream {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
