//! RS-485 serial transport.
//!
//! The controller bus runs at 19200 baud, 8 data bits, no parity, two stop
//! bits.  Enabled with the `serial` feature.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::info;

use super::{ByteStream, TransportError};

/// Bus baud rate.
pub const BAUD_RATE: u32 = 19_200;

/// A [`ByteStream`] over a local serial port.
#[derive(Debug)]
pub struct SerialByteStream {
    path: String,
    port: Option<SerialStream>,
}

impl SerialByteStream {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            port: None,
        }
    }
}

#[async_trait]
impl ByteStream for SerialByteStream {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let port = tokio_serial::new(&self.path, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::Two)
            .open_native_async()
            .map_err(|e| TransportError::connect_failed(&self.path, e.into()))?;
        info!("opened serial port {} at {BAUD_RATE} baud", self.path);
        self.port = Some(port);
        Ok(())
    }

    async fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;
        match port.read_u8().await {
            Ok(b) => Ok(Some(b)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;
        port.write_all(data).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.port = None;
        Ok(())
    }
}
