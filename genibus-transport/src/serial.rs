//! Serial port transport implementation (RS-485 GENIBus line)

use crate::error::{not_connected, GeniError, GeniResult};
use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::SerialStream;

/// Line speed used by GENIBus units
pub const GENIBUS_BAUD_RATE: u32 = 9600;

/// Wrapper for SerialStream that implements Debug
struct DebugSerialStream(SerialStream);

impl fmt::Debug for DebugSerialStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialStream").finish()
    }
}

impl Deref for DebugSerialStream {
    type Target = SerialStream;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DebugSerialStream {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Serial port transport layer settings
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: tokio_serial::DataBits,
    pub stop_bits: tokio_serial::StopBits,
    pub parity: tokio_serial::Parity,
    pub flow_control: tokio_serial::FlowControl,
    pub timeout: Option<Duration>,
}

impl SerialSettings {
    /// Create new serial settings with the GENIBus line format (8N1)
    pub fn new(port_name: String, baud_rate: u32) -> Self {
        Self {
            port_name,
            baud_rate,
            data_bits: tokio_serial::DataBits::Eight,
            stop_bits: tokio_serial::StopBits::One,
            parity: tokio_serial::Parity::None,
            flow_control: tokio_serial::FlowControl::None,
            timeout: Some(Duration::from_secs(2)),
        }
    }

    /// Create serial settings with timeout
    pub fn with_timeout(port_name: String, baud_rate: u32, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::new(port_name, baud_rate)
        }
    }
}

/// Serial port transport layer implementation
#[derive(Debug)]
pub struct SerialTransport {
    stream: Option<DebugSerialStream>,
    settings: SerialSettings,
    closed: bool,
}

impl SerialTransport {
    /// Create a new serial transport layer
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    /// Create serial transport with port name at the GENIBus baud rate
    pub fn new_simple(port_name: String) -> Self {
        Self::new(SerialSettings::new(port_name, GENIBUS_BAUD_RATE))
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }
}

#[async_trait]
impl TransportLayer for SerialTransport {
    async fn open(&mut self) -> GeniResult<()> {
        if !self.closed {
            return Err(GeniError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let builder = tokio_serial::new(&self.settings.port_name, self.settings.baud_rate)
            .data_bits(self.settings.data_bits)
            .stop_bits(self.settings.stop_bits)
            .parity(self.settings.parity)
            .flow_control(self.settings.flow_control);

        let stream = SerialStream::open(&builder).map_err(|e| {
            GeniError::Connection(std::io::Error::other(format!(
                "Failed to open serial port {}: {}",
                self.settings.port_name, e
            )))
        })?;
        log::info!(
            "GENIBus serial line open on {} at {} baud",
            self.settings.port_name,
            self.settings.baud_rate
        );

        self.stream = Some(DebugSerialStream(stream));
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for SerialTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> GeniResult<()> {
        self.settings.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> GeniResult<usize> {
        let stream = self.stream.as_mut().ok_or_else(|| not_connected("Serial stream"))?;

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
        let stream = self.stream.as_mut().ok_or_else(|| not_connected("Serial stream"))?;

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
        let stream = self.stream.as_mut().ok_or_else(|| not_connected("Serial stream"))?;

        stream.flush().await.map_err(GeniError::Connection)
    }

    async fn discard_input(&mut self) -> GeniResult<usize> {
        use tokio_serial::{ClearBuffer, SerialPort};

        let stream = self.stream.as_mut().ok_or_else(|| not_connected("Serial stream"))?;

        let pending = SerialPort::bytes_to_read(&stream.0).map_err(std::io::Error::from)?;
        SerialPort::clear(&stream.0, ClearBuffer::Input).map_err(std::io::Error::from)?;
        Ok(pending as usize)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> GeniResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.flush().await;
        }
        self.closed = true;
        Ok(())
    }
}
