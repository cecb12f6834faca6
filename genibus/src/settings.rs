//! Persistable client settings
//!
//! Applications store these however they like; [`ClientSettings::build`]
//! turns them into a connection.

use genibus_client::{
    ConnectionBuilder, ContentionPolicy, DynConnection, DEFAULT_MASTER_ADDRESS, DEFAULT_REPLY_TIMEOUT,
};
use genibus_core::{Address, GeniResult};
use genibus_simulator::{SimulatedUnit, SimulatorTransport};
use genibus_transport::GENIBUS_BAUD_RATE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the bus is reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConnectionKind {
    /// In-process simulated pump
    Simulator { unit_address: u8 },
    /// GENIBus tunnelled over TCP, "host:port"
    Tcp { address: String },
    /// Local RS-485 adapter
    Serial {
        port: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
}

fn default_baud_rate() -> u32 {
    GENIBUS_BAUD_RATE
}

fn default_source_address() -> u8 {
    DEFAULT_MASTER_ADDRESS
}

fn default_reply_timeout_ms() -> Option<u64> {
    Some(DEFAULT_REPLY_TIMEOUT.as_millis() as u64)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    pub connection: ConnectionKind,
    #[serde(default = "default_source_address")]
    pub source_address: u8,
    /// Reply deadline in milliseconds, `None` waits forever
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: Option<u64>,
    #[serde(default)]
    pub contention: ContentionPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connection: ConnectionKind::Simulator { unit_address: 0x20 },
            source_address: default_source_address(),
            reply_timeout_ms: default_reply_timeout_ms(),
            contention: ContentionPolicy::default(),
        }
    }
}

impl ClientSettings {
    /// A builder preconfigured from these settings
    pub fn builder(&self) -> ConnectionBuilder {
        let builder = match &self.connection {
            ConnectionKind::Simulator { unit_address } => ConnectionBuilder::new().transport(
                Box::new(SimulatorTransport::new(SimulatedUnit::pump(Address::new(*unit_address)))),
            ),
            ConnectionKind::Tcp { address } => ConnectionBuilder::new().tcp(address),
            ConnectionKind::Serial { port, baud_rate } => ConnectionBuilder::new().serial(port, *baud_rate),
        };
        let builder = builder
            .source_address(self.source_address)
            .contention_policy(self.contention);
        match self.reply_timeout_ms {
            Some(ms) => builder.reply_timeout(Duration::from_millis(ms)),
            None => builder.no_reply_timeout(),
        }
    }

    /// Build the connection without opening it
    pub fn build(&self) -> GeniResult<DynConnection> {
        self.builder().build()
    }

    /// Build and open the connection
    pub async fn open_connection(&self) -> GeniResult<DynConnection> {
        let conn = self.build()?;
        conn.open().await?;
        log::info!("Connection opened ({:?})", self.connection);
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genibus_core::ApduClass;

    #[test]
    fn test_parse_with_defaults() {
        let settings: ClientSettings =
            serde_json::from_str(r#"{"connection": {"kind": "serial", "port": "/dev/ttyUSB0"}}"#).unwrap();
        assert_eq!(
            settings.connection,
            ConnectionKind::Serial {
                port: "/dev/ttyUSB0".to_string(),
                baud_rate: 9600
            }
        );
        assert_eq!(settings.source_address, 0x01);
        assert_eq!(settings.reply_timeout_ms, Some(2000));
        assert_eq!(settings.contention, ContentionPolicy::Block);

        let settings: ClientSettings = serde_json::from_str(
            r#"{"connection": {"kind": "tcp", "address": "10.0.0.2:5000"},
                "reply_timeout_ms": null, "contention": "FailFast"}"#,
        )
        .unwrap();
        assert_eq!(settings.reply_timeout_ms, None);
        assert_eq!(settings.contention, ContentionPolicy::FailFast);
        assert!(settings.build().is_ok());
    }

    #[test]
    fn test_invalid_settings_fail_to_build() {
        let settings = ClientSettings {
            source_address: 254,
            ..ClientSettings::default()
        };
        assert!(settings.build().is_err());

        let settings = ClientSettings {
            connection: ConnectionKind::Tcp {
                address: "not an address".to_string(),
            },
            ..ClientSettings::default()
        };
        assert!(settings.build().is_err());
    }

    #[tokio::test]
    async fn test_simulator_connection() {
        let settings = ClientSettings {
            reply_timeout_ms: Some(200),
            ..ClientSettings::default()
        };
        let conn = settings.open_connection().await.unwrap();
        assert_eq!(conn.connect(Duration::from_millis(200)).await.unwrap(), Address::new(0x20));

        let items = conn.get(ApduClass::AsciiStrings, &[8]).await.unwrap();
        assert_eq!(items[0].value.as_text(), Some("UPE 25-60 A"));
    }
}
