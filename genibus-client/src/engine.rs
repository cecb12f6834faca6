//! GENIBus transaction engine
//!
//! One engine drives one request/reply exchange at a time over a byte
//! stream:
//!
//! 1. validate the class/operation pair and the items (nothing is sent on
//!    failure)
//! 2. encode a fresh request telegram and write it
//! 3. read and decode the reply telegram under the reply timeout
//! 4. correlate the reply with the request and check the acknowledgement
//! 5. extract one typed value per requested item
//!
//! Every failure is scoped to the transaction; the engine returns to
//! [`TransactionState::Idle`] and is ready for the next request. Retrying is
//! left to the caller.

use crate::state::TransactionState;
use crate::statistics::TransactionStatistics;
use bytes::BytesMut;
use genibus_application::{decode_items, split_pdu, DataItem, ReplyApdu, ReplyItem, RequestApdu};
use genibus_core::byteops::hex_line;
use genibus_core::{Address, ApduClass, GeniError, GeniResult, Operation, StartDelimiter};
use genibus_session::{DecodedTelegram, TelegramCodec, TelegramReader};
use genibus_transport::StreamAccessor;
use std::time::Duration;

/// Bus address this client uses as source unless configured otherwise
pub const DEFAULT_MASTER_ADDRESS: u8 = 0x01;

/// How long to wait for a complete reply telegram
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// PROTOCOL_DATA items requested when connecting (df_buf_len, unit_bus_mode)
const CONNECT_ITEMS: [u8; 2] = [2, 3];

/// Addressing and timing of an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Our own bus address
    pub source: Address,
    /// Unit addressed by [`TransactionEngine::request`]
    pub destination: Address,
    /// Bound on receiving a whole reply; `None` waits forever
    pub reply_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            source: Address::new(DEFAULT_MASTER_ADDRESS),
            destination: Address::CONNECTION_REQUEST,
            reply_timeout: Some(DEFAULT_REPLY_TIMEOUT),
        }
    }
}

struct Exchange {
    responder: Option<Address>,
    items: Vec<ReplyItem>,
}

/// Request/reply transaction engine
pub struct TransactionEngine<S: StreamAccessor> {
    stream: S,
    codec: TelegramCodec,
    config: EngineConfig,
    state: TransactionState,
    statistics: TransactionStatistics,
    resync: bool,
}

impl<S: StreamAccessor> TransactionEngine<S> {
    pub fn new(stream: S, config: EngineConfig) -> Self {
        Self::with_codec(stream, config, TelegramCodec::new())
    }

    /// Create an engine that frames telegrams with a custom codec
    pub fn with_codec(stream: S, config: EngineConfig, codec: TelegramCodec) -> Self {
        Self {
            stream,
            codec,
            config,
            state: TransactionState::Idle,
            statistics: TransactionStatistics::new(),
            resync: false,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn statistics(&self) -> &TransactionStatistics {
        &self.statistics
    }

    pub fn reset_statistics(&mut self) {
        self.statistics.clear();
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source(&self) -> Address {
        self.config.source
    }

    pub fn destination(&self) -> Address {
        self.config.destination
    }

    pub fn set_destination(&mut self, destination: Address) {
        self.config.destination = destination;
    }

    pub fn set_reply_timeout(&mut self, timeout: Option<Duration>) {
        self.config.reply_timeout = timeout;
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Run one transaction against the configured destination
    pub async fn request(
        &mut self,
        class: ApduClass,
        operation: Operation,
        items: Vec<DataItem>,
    ) -> GeniResult<Vec<ReplyItem>> {
        let destination = self.config.destination;
        self.request_to(destination, class, operation, items).await
    }

    /// Run one transaction against `destination`
    ///
    /// A broadcast request completes as soon as it is written and returns no
    /// items.
    pub async fn request_to(
        &mut self,
        destination: Address,
        class: ApduClass,
        operation: Operation,
        items: Vec<DataItem>,
    ) -> GeniResult<Vec<ReplyItem>> {
        let timeout = self.config.reply_timeout;
        let exchange = self
            .transact(destination, class, operation, items, timeout)
            .await?;
        Ok(exchange.items)
    }

    pub async fn get(&mut self, class: ApduClass, ids: &[u8]) -> GeniResult<Vec<ReplyItem>> {
        self.request(class, Operation::Get, ids.iter().copied().map(DataItem::new).collect())
            .await
    }

    pub async fn set(&mut self, class: ApduClass, items: Vec<DataItem>) -> GeniResult<Vec<ReplyItem>> {
        self.request(class, Operation::Set, items).await
    }

    /// Request scale information for the given items
    pub async fn info(&mut self, class: ApduClass, ids: &[u8]) -> GeniResult<Vec<ReplyItem>> {
        self.request(class, Operation::Info, ids.iter().copied().map(DataItem::new).collect())
            .await
    }

    /// Send commands (SET on COMMANDS, identifiers only)
    pub async fn command(&mut self, ids: &[u8]) -> GeniResult<Vec<ReplyItem>> {
        self.set(ApduClass::Commands, ids.iter().copied().map(DataItem::new).collect())
            .await
    }

    /// Find the unit listening on the connection-request address
    ///
    /// Reads PROTOCOL_DATA from address 254 and adopts the replying unit's
    /// address as the destination for later requests.
    pub async fn connect(&mut self, timeout: Duration) -> GeniResult<Address> {
        let exchange = self
            .transact(
                Address::CONNECTION_REQUEST,
                ApduClass::ProtocolData,
                Operation::Get,
                CONNECT_ITEMS.iter().copied().map(DataItem::new).collect(),
                Some(timeout),
            )
            .await?;

        let unit = exchange.responder.ok_or_else(|| {
            GeniError::ProtocolViolation("Connection request produced no reply".to_string())
        })?;
        log::info!("Connected to GENIBus unit at address {}", unit);
        self.config.destination = unit;
        Ok(unit)
    }

    async fn transact(
        &mut self,
        destination: Address,
        class: ApduClass,
        operation: Operation,
        items: Vec<DataItem>,
        reply_timeout: Option<Duration>,
    ) -> GeniResult<Exchange> {
        self.recover().await;

        let result = self
            .run(destination, class, operation, items, reply_timeout)
            .await;
        match &result {
            Ok(_) => {}
            Err(e) => {
                self.statistics.record_failure(e);
                if matches!(e, GeniError::Timeout | GeniError::Frame(_)) {
                    self.resync = true;
                }
                if e.is_negative_ack() || e.is_frame_error() {
                    log::warn!("{} {} to {} failed: {}", class, operation, destination, e);
                } else {
                    log::debug!("{} {} to {} failed: {}", class, operation, destination, e);
                }
                self.transition(TransactionState::Failed)?;
            }
        }
        self.transition(TransactionState::Idle)?;
        result
    }

    /// Bring the engine back to `Idle` after an abandoned transaction
    async fn recover(&mut self) {
        if self.state != TransactionState::Idle {
            log::warn!(
                "Previous transaction abandoned in state {}, resetting",
                self.state
            );
            self.statistics.increment_abandoned();
            // Forced: the abandoned transaction never reached a terminal state.
            self.state = TransactionState::Idle;
            self.resync = true;
        }

        if self.resync {
            match self.stream.discard_input().await {
                Ok(0) => {}
                Ok(n) => log::debug!("Discarded {} stale bytes", n),
                Err(e) => log::warn!("Failed to discard stale input: {}", e),
            }
            self.resync = false;
        }
    }

    async fn run(
        &mut self,
        destination: Address,
        class: ApduClass,
        operation: Operation,
        items: Vec<DataItem>,
        reply_timeout: Option<Duration>,
    ) -> GeniResult<Exchange> {
        let apdu = RequestApdu::new(class, operation, items)?;
        let mut pdu = BytesMut::new();
        apdu.encode(&mut pdu);
        let telegram = self.codec.encode(
            StartDelimiter::DataRequest,
            destination,
            self.config.source,
            &pdu,
        )?;
        self.transition(TransactionState::Built)?;

        TelegramReader::write_telegram(&mut self.stream, &telegram).await?;
        self.statistics.increment_telegrams_sent();
        self.transition(TransactionState::Sent)?;

        if destination.is_broadcast() {
            self.statistics.increment_broadcasts();
            self.transition(TransactionState::Completed)?;
            return Ok(Exchange {
                responder: None,
                items: Vec::new(),
            });
        }

        self.transition(TransactionState::AwaitingReply)?;
        let raw = TelegramReader::read_telegram(&mut self.stream, reply_timeout).await?;
        let reply = self.codec.decode(&raw, StartDelimiter::DataReply)?;
        self.statistics.increment_replies_received();
        self.transition(TransactionState::Decoded)?;

        let items = self.interpret(destination, &apdu, &reply)?;
        self.transition(TransactionState::Completed)?;
        Ok(Exchange {
            responder: Some(reply.source),
            items,
        })
    }

    fn interpret(
        &self,
        destination: Address,
        request: &RequestApdu,
        reply: &DecodedTelegram,
    ) -> GeniResult<Vec<ReplyItem>> {
        if reply.destination != self.config.source {
            return Err(GeniError::ProtocolViolation(format!(
                "Reply addressed to {}, expected {}",
                reply.destination, self.config.source
            )));
        }
        if reply.source.is_reserved() {
            return Err(GeniError::ProtocolViolation(format!(
                "Reply from reserved address {}",
                reply.source
            )));
        }
        if !destination.is_connection_request() && reply.source != destination {
            return Err(GeniError::ProtocolViolation(format!(
                "Reply from {}, request went to {}",
                reply.source, destination
            )));
        }

        let apdus = split_pdu(&reply.pdu)?;
        let raw = match apdus.as_slice() {
            [raw] => raw,
            [] => {
                return Err(GeniError::ProtocolViolation(
                    "Reply carries no APDU".to_string(),
                ));
            }
            _ => {
                return Err(GeniError::ProtocolViolation(format!(
                    "Reply carries {} APDUs for a single request: {}",
                    apdus.len(),
                    hex_line(&reply.pdu)
                )));
            }
        };
        if raw.class != request.class().value() {
            return Err(GeniError::ProtocolViolation(format!(
                "Reply for class {}, request was {}",
                raw.class,
                request.class()
            )));
        }

        let apdu = ReplyApdu::from_raw(raw)?;
        apdu.check_ack()?;
        decode_items(request.class(), request.operation(), &request.ids(), &apdu.data)
    }

    fn transition(&mut self, next: TransactionState) -> GeniResult<()> {
        self.state.validate_transition(next)?;
        log::trace!("Transaction {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}
