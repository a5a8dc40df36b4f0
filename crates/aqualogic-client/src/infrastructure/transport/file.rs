//! Replay transport over a recorded bus capture.
//!
//! Reads a binary capture file byte by byte.  Writes are accepted and
//! discarded so the engine can run its full command path against a
//! recording.  The end of the file ends processing.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, info};

use super::{ByteStream, TransportError};

/// A [`ByteStream`] that replays a capture file.
#[derive(Debug)]
pub struct FileStream {
    path: PathBuf,
    reader: Option<BufReader<File>>,
}

impl FileStream {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            reader: None,
        }
    }
}

#[async_trait]
impl ByteStream for FileStream {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let file = File::open(&self.path)
            .await
            .map_err(|e| TransportError::connect_failed(self.path.display(), e))?;
        info!("replaying capture {}", self.path.display());
        self.reader = Some(BufReader::new(file));
        Ok(())
    }

    async fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        let reader = self.reader.as_mut().ok_or(TransportError::NotConnected)?;
        match reader.read_u8().await {
            Ok(b) => Ok(Some(b)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        debug!(len = data.len(), "replay transport discarding write");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.reader = None;
        Ok(())
    }
}
