//! TCP transport for serial-to-Ethernet bridges.
//!
//! Most installations expose the controller's RS-485 bus through a small
//! bridge that forwards raw bytes over TCP (port 8899 by default).

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info};

use super::{ByteStream, TransportError};

/// A [`ByteStream`] over a TCP connection.
#[derive(Debug)]
pub struct TcpByteStream {
    host: String,
    port: u16,
    reader: Option<BufReader<OwnedReadHalf>>,
    writer: Option<OwnedWriteHalf>,
}

impl TcpByteStream {
    /// Creates an unconnected stream to `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            reader: None,
            writer: None,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[async_trait]
impl ByteStream for TcpByteStream {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| TransportError::connect_failed(self.addr(), e))?;
        stream.set_nodelay(true)?;
        info!("connected to controller bridge at {}", self.addr());

        let (read_half, write_half) = stream.into_split();
        self.reader = Some(BufReader::new(read_half));
        self.writer = Some(write_half);
        Ok(())
    }

    async fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        let reader = self.reader.as_mut().ok_or(TransportError::NotConnected)?;
        match reader.read_u8().await {
            Ok(b) => Ok(Some(b)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!("controller bridge closed the connection");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let writer = self.writer.as_mut().ok_or(TransportError::NotConnected)?;
        writer.write_all(data).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.reader = None;
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_reads_bytes_then_reports_end_of_stream() {
        // Arrange – a bridge that sends two bytes and hangs up
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            socket.write_all(&[0x10, 0x02]).await.expect("write");
        });
        let mut stream = TcpByteStream::new("127.0.0.1", port);

        // Act
        stream.connect().await.expect("connect");
        let first = stream.read_byte().await.expect("read");
        let second = stream.read_byte().await.expect("read");
        let end = stream.read_byte().await.expect("read");

        // Assert
        assert_eq!((first, second, end), (Some(0x10), Some(0x02), None));
    }

    #[tokio::test]
    async fn test_writes_reach_the_bridge() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buf = [0u8; 3];
            socket.read_exact(&mut buf).await.expect("read");
            buf
        });

        let mut stream = TcpByteStream::new("127.0.0.1", port);
        stream.connect().await.expect("connect");
        stream.write(&[1, 2, 3]).await.expect("write");

        assert_eq!(server.await.expect("join"), [1, 2, 3]);
    }

    #[tokio::test]
    async fn test_read_before_connect_fails() {
        let mut stream = TcpByteStream::new("127.0.0.1", 1);
        assert!(matches!(
            stream.read_byte().await,
            Err(TransportError::NotConnected)
        ));
    }
}
