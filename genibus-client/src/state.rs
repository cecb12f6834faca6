//! Transaction state machine

use genibus_core::{GeniError, GeniResult};
use std::fmt;

/// State of the transaction currently driven by an engine
///
/// # State Transitions
/// ```text
/// Idle -> Built -> Sent -> AwaitingReply -> Decoded -> Completed -> Idle
///                    |                                    ^
///                    +------------ broadcast -------------+
///
/// any of Idle..Decoded -> Failed -> Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// Ready for a new request (initial state)
    #[default]
    Idle,
    /// Request validated and telegram encoded
    Built,
    /// Telegram written to the transport
    Sent,
    /// Waiting for the unit's reply
    AwaitingReply,
    /// Reply telegram received and checksum-validated
    Decoded,
    Completed,
    Failed,
}

impl TransactionState {
    /// A telegram has been built and the transaction has not finished yet
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            TransactionState::Built
                | TransactionState::Sent
                | TransactionState::AwaitingReply
                | TransactionState::Decoded
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionState::Completed | TransactionState::Failed)
    }

    /// Validate state transition
    ///
    /// # Valid Transitions
    /// - `Idle` -> `Built` (request validated and encoded)
    /// - `Built` -> `Sent` (telegram written)
    /// - `Sent` -> `AwaitingReply` (directed request)
    /// - `Sent` -> `Completed` (broadcast, no reply expected)
    /// - `AwaitingReply` -> `Decoded` (reply telegram valid)
    /// - `Decoded` -> `Completed` (reply interpreted)
    /// - `Idle`, `Built`, `Sent`, `AwaitingReply`, `Decoded` -> `Failed`
    /// - `Completed`, `Failed` -> `Idle`
    pub fn validate_transition(&self, new_state: TransactionState) -> GeniResult<()> {
        use TransactionState::*;

        let valid = match (*self, new_state) {
            (Idle, Built) => true,
            (Built, Sent) => true,
            (Sent, AwaitingReply) => true,
            (Sent, Completed) => true,
            (AwaitingReply, Decoded) => true,
            (Decoded, Completed) => true,
            (Idle | Built | Sent | AwaitingReply | Decoded, Failed) => true,
            (Completed | Failed, Idle) => true,
            (Idle, Idle) => true,
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(GeniError::InvalidData(format!(
                "Invalid transaction state transition: {:?} -> {:?}",
                self, new_state
            )))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionState::Idle => "Idle",
            TransactionState::Built => "Built",
            TransactionState::Sent => "Sent",
            TransactionState::AwaitingReply => "AwaitingReply",
            TransactionState::Decoded => "Decoded",
            TransactionState::Completed => "Completed",
            TransactionState::Failed => "Failed",
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
