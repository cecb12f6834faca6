//! TCP transport implementation (GENIBus tunnelled over TCP)

use crate::error::{not_connected, GeniError, GeniResult};
use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use std::fmt;
use std::net::SocketAddr;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Wrapper for TcpStream that implements Debug
struct DebugTcpStream(TcpStream);

impl fmt::Debug for DebugTcpStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpStream").finish()
    }
}

impl Deref for DebugTcpStream {
    type Target = TcpStream;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DebugTcpStream {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// TCP transport layer settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    pub address: SocketAddr,
    pub timeout: Option<Duration>,
}

impl TcpSettings {
    /// Create new TCP settings
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            timeout: Some(Duration::from_secs(5)),
        }
    }

    /// Create TCP settings with timeout
    pub fn with_timeout(address: SocketAddr, timeout: Duration) -> Self {
        Self {
            address,
            timeout: Some(timeout),
        }
    }
}

/// TCP transport layer implementation
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<DebugTcpStream>,
    settings: TcpSettings,
    closed: bool,
}

impl TcpTransport {
    /// Create a new TCP transport layer
    pub fn new(settings: TcpSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    /// Create TCP transport from address string
    pub fn from_address(address: &str) -> GeniResult<Self> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| GeniError::InvalidData(format!("Invalid TCP address: {}", e)))?;
        Ok(Self::new(TcpSettings::new(addr)))
    }

    /// Create TCP transport from an already-connected TcpStream
    pub fn from_connected_stream(stream: TcpStream, timeout: Option<Duration>) -> GeniResult<Self> {
        let address = stream.peer_addr()?;
        Ok(Self {
            stream: Some(DebugTcpStream(stream)),
            settings: TcpSettings { address, timeout },
            closed: false,
        })
    }

    pub fn settings(&self) -> &TcpSettings {
        &self.settings
    }
}

#[async_trait]
impl TransportLayer for TcpTransport {
    async fn open(&mut self) -> GeniResult<()> {
        if !self.closed {
            return Err(GeniError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let stream = if let Some(timeout) = self.settings.timeout {
            tokio::time::timeout(timeout, TcpStream::connect(self.settings.address))
                .await
                .map_err(|_| GeniError::Timeout)??
        } else {
            TcpStream::connect(self.settings.address).await?
        };
        stream.set_nodelay(true)?;
        log::info!("GENIBus TCP link open to {}", self.settings.address);

        self.stream = Some(DebugTcpStream(stream));
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for TcpTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> GeniResult<()> {
        self.settings.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> GeniResult<usize> {
        let stream = self.stream.as_mut().ok_or_else(|| not_connected("TCP stream"))?;

        let result = if let Some(timeout) = self.settings.timeout {
            tokio::time::timeout(timeout, stream.read(buf))
                .await
                .map_err(|_| GeniError::Timeout)?
                .map_err(GeniError::Connection)
        } else {
            stream.read(buf).await.map_err(GeniError::Connection)
        };

        match result {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    async fn write(&mut self, buf: &[u8]) -> GeniResult<usize> {
        let stream = self.stream.as_mut().ok_or_else(|| not_connected("TCP stream"))?;

        if let Some(timeout) = self.settings.timeout {
            tokio::time::timeout(timeout, stream.write(buf))
                .await
                .map_err(|_| GeniError::Timeout)?
                .map_err(GeniError::Connection)
        } else {
            stream.write(buf).await.map_err(GeniError::Connection)
        }
    }

    async fn flush(&mut self) -> GeniResult<()> {
        let stream = self.stream.as_mut().ok_or_else(|| not_connected("TCP stream"))?;

        stream.flush().await.map_err(GeniError::Connection)
    }

    async fn discard_input(&mut self) -> GeniResult<usize> {
        let stream = self.stream.as_mut().ok_or_else(|| not_connected("TCP stream"))?;

        let mut scratch = [0u8; 64];
        let mut discarded = 0;
        loop {
            match stream.try_read(&mut scratch) {
                Ok(0) => break,
                Ok(n) => discarded += n,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(GeniError::Connection(e)),
            }
        }
        Ok(discarded)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> GeniResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_settings() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let settings = TcpSettings::new(addr);
        assert_eq!(settings.address, addr);
        assert!(settings.timeout.is_some());
        assert!(TcpTransport::from_address("not an address").is_err());
    }

    #[tokio::test]
    async fn test_tcp_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(&buf).await.unwrap();
        });

        let mut transport = TcpTransport::new(TcpSettings::with_timeout(addr, Duration::from_secs(2)));
        assert!(transport.is_closed());
        transport.open().await.unwrap();
        transport.write_all(&[0x27, 0x02, 0x20, 0x01]).await.unwrap();
        transport.flush().await.unwrap();

        let mut echo = [0u8; 4];
        transport.read_exact(&mut echo).await.unwrap();
        assert_eq!(echo, [0x27, 0x02, 0x20, 0x01]);

        server.await.unwrap();
        transport.close().await.unwrap();
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_read_before_open_fails() {
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let mut transport = TcpTransport::new(TcpSettings::new(addr));
        let mut buf = [0u8; 1];
        assert!(matches!(
            transport.read(&mut buf).await,
            Err(GeniError::Connection(_))
        ));
    }
}
