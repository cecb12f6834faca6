//! Transaction statistics collection

use genibus_core::{FrameError, GeniError};

/// Per-engine transaction counters
///
/// Updated by the engine as transactions run; query them at any time to
/// judge line quality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionStatistics {
    /// Request telegrams written to the transport
    pub telegrams_sent: u64,
    /// Reply telegrams that passed framing and checksum checks
    pub replies_received: u64,
    /// Requests sent to the broadcast address
    pub broadcasts: u64,
    pub timeouts: u64,
    pub checksum_errors: u64,
    /// Frame errors other than checksum mismatches
    pub frame_errors: u64,
    pub negative_acks: u64,
    /// Requests rejected before anything was sent
    pub validation_failures: u64,
    pub protocol_violations: u64,
    /// Transactions dropped by the caller while in flight
    pub abandoned: u64,
}

impl TransactionStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all statistics counters
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn increment_telegrams_sent(&mut self) {
        self.telegrams_sent += 1;
    }

    pub fn increment_replies_received(&mut self) {
        self.replies_received += 1;
    }

    pub fn increment_broadcasts(&mut self) {
        self.broadcasts += 1;
    }

    pub fn increment_timeouts(&mut self) {
        self.timeouts += 1;
    }

    pub fn increment_checksum_errors(&mut self) {
        self.checksum_errors += 1;
    }

    pub fn increment_frame_errors(&mut self) {
        self.frame_errors += 1;
    }

    pub fn increment_negative_acks(&mut self) {
        self.negative_acks += 1;
    }

    pub fn increment_validation_failures(&mut self) {
        self.validation_failures += 1;
    }

    pub fn increment_protocol_violations(&mut self) {
        self.protocol_violations += 1;
    }

    pub fn increment_abandoned(&mut self) {
        self.abandoned += 1;
    }

    /// Count a failed transaction under its error kind
    pub fn record_failure(&mut self, error: &GeniError) {
        match error {
            GeniError::Timeout => self.increment_timeouts(),
            GeniError::Frame(FrameError::ChecksumMismatch { .. }) => self.increment_checksum_errors(),
            GeniError::Frame(_) => self.increment_frame_errors(),
            GeniError::NegativeAck { .. } => self.increment_negative_acks(),
            GeniError::Validation(_) => self.increment_validation_failures(),
            GeniError::ProtocolViolation(_) => self.increment_protocol_violations(),
            GeniError::Connection(_) | GeniError::Busy | GeniError::InvalidData(_) => {}
        }
    }

    /// Share of sent telegrams that did not yield a usable reply, in percent
    ///
    /// Broadcasts are excluded; returns 0.0 if nothing was sent.
    pub fn error_rate(&self) -> f64 {
        let directed = self.telegrams_sent.saturating_sub(self.broadcasts);
        if directed == 0 {
            return 0.0;
        }
        let errors = self.timeouts + self.checksum_errors + self.frame_errors + self.protocol_violations;
        (errors as f64 / directed as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genibus_core::{Ack, ApduClass, ValidationError};

    #[test]
    fn test_record_failure_by_kind() {
        let mut stats = TransactionStatistics::new();
        stats.record_failure(&GeniError::Timeout);
        stats.record_failure(&FrameError::ChecksumMismatch { computed: 1, received: 2 }.into());
        stats.record_failure(&FrameError::BadDelimiter { expected: 0x24, actual: 0x27 }.into());
        stats.record_failure(&GeniError::NegativeAck {
            class: ApduClass::MeasuredData,
            ack: Ack::IdUnknown,
        });
        stats.record_failure(&ValidationError::EmptyRequest.into());
        stats.record_failure(&GeniError::ProtocolViolation("x".to_string()));
        stats.record_failure(&GeniError::Busy);

        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.checksum_errors, 1);
        assert_eq!(stats.frame_errors, 1);
        assert_eq!(stats.negative_acks, 1);
        assert_eq!(stats.validation_failures, 1);
        assert_eq!(stats.protocol_violations, 1);

        stats.clear();
        assert_eq!(stats, TransactionStatistics::default());
    }

    #[test]
    fn test_error_rate() {
        let mut stats = TransactionStatistics::new();
        assert_eq!(stats.error_rate(), 0.0);
        for _ in 0..5 {
            stats.increment_telegrams_sent();
        }
        stats.increment_broadcasts();
        stats.increment_timeouts();
        assert_eq!(stats.error_rate(), 25.0);
    }
}
