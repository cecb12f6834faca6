//! Connection builder for the GENIBus client
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use genibus_client::ConnectionBuilder;
//! use std::time::Duration;
//!
//! # async fn demo() -> genibus_core::GeniResult<()> {
//! let conn = ConnectionBuilder::new()
//!     .serial("/dev/ttyUSB0", 9600)
//!     .reply_timeout(Duration::from_millis(500))
//!     .build()?;
//! conn.open().await?;
//! conn.connect(Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

use super::{Connection, ContentionPolicy};
use crate::engine::{EngineConfig, TransactionEngine, DEFAULT_MASTER_ADDRESS, DEFAULT_REPLY_TIMEOUT};
use genibus_core::{Address, GeniError, GeniResult};
use genibus_session::{ChecksumStrategy, TelegramCodec};
use genibus_transport::{SerialSettings, SerialTransport, TcpTransport, TransportLayer};
use std::sync::Arc;
use std::time::Duration;

/// A connection over any transport, as produced by [`ConnectionBuilder`]
pub type DynConnection = Connection<Box<dyn TransportLayer>>;

enum TransportType {
    Tcp { address: String },
    Serial { port_name: String, baud_rate: u32 },
    Custom(Box<dyn TransportLayer>),
    None,
}

/// Builder for [`Connection`]s
///
/// # Default Settings
/// - Source address: 0x01
/// - Destination: connection-request address until [`Connection::connect`]
///   finds the unit
/// - Reply timeout: 2 s
/// - Contention policy: block
pub struct ConnectionBuilder {
    transport_type: TransportType,
    source: Address,
    destination: Address,
    reply_timeout: Option<Duration>,
    policy: ContentionPolicy,
    checksum: Option<Arc<dyn ChecksumStrategy>>,
}

impl ConnectionBuilder {
    pub fn new() -> Self {
        Self {
            transport_type: TransportType::None,
            source: Address::new(DEFAULT_MASTER_ADDRESS),
            destination: Address::CONNECTION_REQUEST,
            reply_timeout: Some(DEFAULT_REPLY_TIMEOUT),
            policy: ContentionPolicy::default(),
            checksum: None,
        }
    }

    /// GENIBus tunnelled over TCP, `address` in "host:port" form
    pub fn tcp(mut self, address: &str) -> Self {
        self.transport_type = TransportType::Tcp {
            address: address.to_string(),
        };
        self
    }

    /// RS-485 line on a local serial port
    pub fn serial(mut self, port_name: &str, baud_rate: u32) -> Self {
        self.transport_type = TransportType::Serial {
            port_name: port_name.to_string(),
            baud_rate,
        };
        self
    }

    /// Any other transport, e.g. the in-process simulator
    pub fn transport(mut self, transport: Box<dyn TransportLayer>) -> Self {
        self.transport_type = TransportType::Custom(transport);
        self
    }

    /// Our own bus address
    pub fn source_address(mut self, address: u8) -> Self {
        self.source = Address::new(address);
        self
    }

    pub fn destination(mut self, destination: Address) -> Self {
        self.destination = destination;
        self
    }

    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }

    /// Wait for replies without a deadline
    pub fn no_reply_timeout(mut self) -> Self {
        self.reply_timeout = None;
        self
    }

    pub fn contention_policy(mut self, policy: ContentionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Protect telegrams with a different checksum strategy
    pub fn checksum(mut self, checksum: Arc<dyn ChecksumStrategy>) -> Self {
        self.checksum = Some(checksum);
        self
    }

    /// Build the connection; the transport still has to be opened
    ///
    /// # Errors
    /// - no transport configured
    /// - unparsable TCP address
    /// - source address is the broadcast or connection-request address
    pub fn build(self) -> GeniResult<DynConnection> {
        if self.source.is_reserved() {
            return Err(GeniError::InvalidData(format!(
                "Source address {} is reserved",
                self.source
            )));
        }

        let transport: Box<dyn TransportLayer> = match self.transport_type {
            TransportType::Tcp { address } => Box::new(TcpTransport::from_address(&address)?),
            TransportType::Serial {
                port_name,
                baud_rate,
            } => Box::new(SerialTransport::new(SerialSettings::new(port_name, baud_rate))),
            TransportType::Custom(transport) => transport,
            TransportType::None => {
                return Err(GeniError::InvalidData(
                    "Transport type must be configured (TCP, serial or custom)".to_string(),
                ));
            }
        };

        let config = EngineConfig {
            source: self.source,
            destination: self.destination,
            reply_timeout: self.reply_timeout,
        };
        let codec = match self.checksum {
            Some(checksum) => TelegramCodec::with_checksum(checksum),
            None => TelegramCodec::new(),
        };
        let engine = TransactionEngine::with_codec(transport, config, codec);
        Ok(Connection::new(engine, self.policy))
    }
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genibus_core::ApduClass;
    use genibus_session::Additive16;
    use genibus_simulator::{SimulatedUnit, SimulatorTransport};
    use genibus_transport::StreamAccessor;

    #[test]
    fn test_build_requires_transport() {
        assert!(ConnectionBuilder::new().build().is_err());
        assert!(ConnectionBuilder::new().tcp("nonsense").build().is_err());
        assert!(ConnectionBuilder::new()
            .tcp("127.0.0.1:5000")
            .source_address(255)
            .build()
            .is_err());
    }

    #[tokio::test]
    async fn test_build_tcp() {
        let conn = ConnectionBuilder::new()
            .tcp("127.0.0.1:5000")
            .source_address(0x04)
            .contention_policy(ContentionPolicy::FailFast)
            .build()
            .unwrap();
        assert_eq!(conn.policy(), ContentionPolicy::FailFast);

        let engine = conn.into_engine();
        assert_eq!(engine.source(), Address::new(0x04));
        assert_eq!(engine.destination(), Address::CONNECTION_REQUEST);
        assert!(engine.stream().is_closed());
    }

    #[tokio::test]
    async fn test_build_with_simulator() {
        let unit = Address::new(0x21);
        let conn = ConnectionBuilder::new()
            .transport(Box::new(SimulatorTransport::new(SimulatedUnit::pump(unit))))
            .reply_timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        conn.open().await.unwrap();

        assert_eq!(conn.connect(Duration::from_millis(200)).await.unwrap(), unit);
        let items = conn.get(ApduClass::MeasuredData, &[0x23]).await.unwrap();
        assert_eq!(items[0].value.as_unsigned(), Some(3000));
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_mismatched_checksum_strategy() {
        let conn = ConnectionBuilder::new()
            .transport(Box::new(SimulatorTransport::new(SimulatedUnit::pump(Address::new(0x20)))))
            .checksum(Arc::new(Additive16))
            .reply_timeout(Duration::from_millis(50))
            .build()
            .unwrap();

        // The unit drops telegrams whose checksum it cannot verify.
        let err = conn.get(ApduClass::MeasuredData, &[0x23]).await.unwrap_err();
        assert!(err.is_timeout());
    }
}
