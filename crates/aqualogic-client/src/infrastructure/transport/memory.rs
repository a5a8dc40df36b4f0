//! In-memory transport for tests and synthesised captures.
//!
//! # Why an in-memory stream?
//!
//! Engine behaviour depends on *when* bytes arrive relative to the burst
//! writes and the reconciliation timer.  `MemoryStream` lets a test script
//! the bus: chunks of bytes, each optionally delivered after a delay, with
//! every write recorded in a shared log the test can inspect afterwards.
//!
//! ```ignore
//! let stream = MemoryStream::new(keep_alive)
//!     .then_after(Duration::from_secs(3), leds_with_lights_on)
//!     .hold_open();
//! let writes = stream.writes();
//! ```
//!
//! Delays use `tokio::time::sleep`, so tests run instantly under
//! `#[tokio::test(start_paused = true)]`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{ByteStream, TransportError};

/// Shared record of every frame written to a [`MemoryStream`].
pub type WriteLog = Arc<Mutex<Vec<Vec<u8>>>>;

#[derive(Debug)]
struct Chunk {
    delay: Duration,
    bytes: VecDeque<u8>,
}

/// A scripted [`ByteStream`].
#[derive(Debug, Default)]
pub struct MemoryStream {
    chunks: VecDeque<Chunk>,
    writes: WriteLog,
    hold_open: bool,
    connected: bool,
    closed: bool,
}

impl MemoryStream {
    /// Creates a stream that yields `bytes` immediately, then ends.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self::default().then_after(Duration::ZERO, bytes)
    }

    /// Appends a chunk delivered `delay` after the previous chunk ran out.
    #[must_use]
    pub fn then_after(mut self, delay: Duration, bytes: impl Into<Vec<u8>>) -> Self {
        self.chunks.push_back(Chunk {
            delay,
            bytes: bytes.into().into(),
        });
        self
    }

    /// Keeps the stream open once the script is exhausted instead of ending.
    #[must_use]
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Returns a handle to the write log.
    pub fn writes(&self) -> WriteLog {
        Arc::clone(&self.writes)
    }
}

#[async_trait]
impl ByteStream for MemoryStream {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        Ok(())
    }

    async fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        loop {
            let Some(chunk) = self.chunks.front_mut() else {
                if self.hold_open {
                    std::future::pending::<()>().await;
                }
                return Ok(None);
            };

            if !chunk.delay.is_zero() {
                tokio::time::sleep(chunk.delay).await;
                chunk.delay = Duration::ZERO;
            }

            match chunk.bytes.pop_front() {
                Some(b) => return Ok(Some(b)),
                None => {
                    self.chunks.pop_front();
                }
            }
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.writes
            .lock()
            .map_err(|_| TransportError::Closed)?
            .push(data.to_vec());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        Ok(())
    }
}
