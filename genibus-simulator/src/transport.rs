//! Simulator transport
//!
//! Bytes written by the client are framed into request telegrams and handed
//! to the unit; its replies are queued for the client to read back.

use crate::unit::SimulatedUnit;
use async_trait::async_trait;
use genibus_core::constants::{CRC_LEN, LENGTH, SD_DATA_REQUEST};
use genibus_core::{GeniError, GeniResult, StartDelimiter};
use genibus_session::TelegramCodec;
use genibus_transport::{StreamAccessor, TransportLayer};
use std::collections::VecDeque;
use std::time::Duration;

/// Line fault applied to the next reply the unit sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Flip bits in the reply checksum
    CorruptChecksum,
    /// Swallow the reply entirely
    DropReply,
}

/// A [`SimulatedUnit`] reachable through [`StreamAccessor`]
#[derive(Debug)]
pub struct SimulatorTransport {
    unit: SimulatedUnit,
    codec: TelegramCodec,
    request: Vec<u8>,
    replies: VecDeque<u8>,
    faults: VecDeque<Fault>,
    timeout: Option<Duration>,
    closed: bool,
}

impl SimulatorTransport {
    pub fn new(unit: SimulatedUnit) -> Self {
        Self::with_codec(unit, TelegramCodec::new())
    }

    pub fn with_codec(unit: SimulatedUnit, codec: TelegramCodec) -> Self {
        Self {
            unit,
            codec,
            request: Vec::new(),
            replies: VecDeque::new(),
            faults: VecDeque::new(),
            timeout: None,
            closed: false,
        }
    }

    pub fn unit(&self) -> &SimulatedUnit {
        &self.unit
    }

    pub fn unit_mut(&mut self) -> &mut SimulatedUnit {
        &mut self.unit
    }

    /// Queue a fault; faults are consumed one per reply, oldest first
    pub fn inject_fault(&mut self, fault: Fault) {
        self.faults.push_back(fault);
    }

    /// Bytes waiting to be read by the client
    pub fn pending(&self) -> usize {
        self.replies.len()
    }

    fn process(&mut self) {
        loop {
            // Resynchronise on the request delimiter
            match self.request.iter().position(|&b| b == SD_DATA_REQUEST) {
                Some(0) => {}
                Some(skip) => {
                    self.request.drain(..skip);
                }
                None => {
                    self.request.clear();
                    return;
                }
            }
            if self.request.len() <= LENGTH {
                return;
            }
            let total = LENGTH + 1 + self.request[LENGTH] as usize + CRC_LEN;
            if self.request.len() < total {
                return;
            }
            let raw: Vec<u8> = self.request.drain(..total).collect();
            self.answer(&raw);
        }
    }

    fn answer(&mut self, raw: &[u8]) {
        let telegram = match self.codec.decode(raw, StartDelimiter::DataRequest) {
            Ok(telegram) => telegram,
            Err(e) => {
                log::warn!("Simulator dropped request: {}", e);
                return;
            }
        };
        if !self.unit.accepts(telegram.destination) {
            log::trace!("Simulator ignores telegram to {}", telegram.destination);
            return;
        }

        let pdu = match self.unit.handle_pdu(&telegram.pdu) {
            Ok(pdu) => pdu,
            Err(e) => {
                log::warn!("Simulator cannot answer request: {}", e);
                return;
            }
        };
        if telegram.destination.is_broadcast() {
            return;
        }

        let reply = match self.codec.encode(
            StartDelimiter::DataReply,
            telegram.source,
            self.unit.address(),
            &pdu,
        ) {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("Simulator cannot encode reply: {}", e);
                return;
            }
        };

        let mut bytes = reply.as_bytes().to_vec();
        match self.faults.pop_front() {
            Some(Fault::DropReply) => {
                log::debug!("Simulator drops reply {}", reply);
                return;
            }
            Some(Fault::CorruptChecksum) => {
                if let Some(last) = bytes.last_mut() {
                    *last ^= 0xFF;
                }
            }
            None => {}
        }
        self.replies.extend(bytes);
    }
}

#[async_trait]
impl TransportLayer for SimulatorTransport {
    async fn open(&mut self) -> GeniResult<()> {
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for SimulatorTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> GeniResult<()> {
        self.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> GeniResult<usize> {
        if self.closed {
            return Err(GeniError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Simulator is closed",
            )));
        }
        if self.replies.is_empty() {
            match self.timeout {
                Some(timeout) => {
                    tokio::time::sleep(timeout).await;
                    return Err(GeniError::Timeout);
                }
                None => std::future::pending::<()>().await,
            }
        }

        let n = buf.len().min(self.replies.len());
        for (slot, byte) in buf.iter_mut().zip(self.replies.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn write(&mut self, buf: &[u8]) -> GeniResult<usize> {
        if self.closed {
            return Err(GeniError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Simulator is closed",
            )));
        }
        self.request.extend_from_slice(buf);
        self.process();
        Ok(buf.len())
    }

    async fn flush(&mut self) -> GeniResult<()> {
        Ok(())
    }

    async fn discard_input(&mut self) -> GeniResult<usize> {
        let n = self.replies.len();
        self.replies.clear();
        Ok(n)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> GeniResult<()> {
        self.closed = true;
        self.request.clear();
        self.replies.clear();
        Ok(())
    }
}
