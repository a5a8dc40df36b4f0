//! Byte transports to the controller bus.
//!
//! The engine only ever needs four things from a connection: open it, read
//! one byte, write a frame, and close it.  [`ByteStream`] captures exactly
//! that, so the engine can run against a TCP bridge, an RS-485 adapter, a
//! recorded capture file, or an in-memory buffer in tests.
//!
//! # End of stream
//!
//! `read_byte` returns `Ok(None)` when the source is exhausted (a replay file
//! reached its end, or the peer closed the socket).  The engine treats that
//! as a clean end of processing.

use async_trait::async_trait;
use thiserror::Error;

pub mod file;
pub mod memory;
#[cfg(feature = "serial")]
pub mod serial;
pub mod tcp;

pub use file::FileStream;
pub use memory::MemoryStream;
#[cfg(feature = "serial")]
pub use serial::SerialByteStream;
pub use tcp::TcpByteStream;

/// Errors raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be opened.
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error occurred on an open connection.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The connection was closed locally.
    #[error("transport closed")]
    Closed,
    /// A read or write was attempted before `connect`.
    #[error("transport not connected")]
    NotConnected,
}

impl TransportError {
    pub(crate) fn connect_failed(addr: impl ToString, source: std::io::Error) -> Self {
        Self::ConnectFailed {
            addr: addr.to_string(),
            source,
        }
    }
}

/// A bidirectional byte connection to the controller bus.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ByteStream: Send {
    /// Opens the underlying connection.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Reads one byte, or `None` at end of stream.
    async fn read_byte(&mut self) -> Result<Option<u8>, TransportError>;

    /// Writes a complete encoded frame.
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Closes the connection.  Further reads return [`TransportError::Closed`].
    async fn close(&mut self) -> Result<(), TransportError>;
}
