//! Emitter port - client -> relay の送信口
//!
//! 送信は fire-and-forget。ただし結果は `Delivery` として呼び出し側に返す
//! （黙って捨てない）。

use crate::domain::ClientMessage;
use crate::error::TransportError;

/// Emitter sends one message towards the relay without waiting for a reply.
pub trait Emitter: Send + Sync {
    fn emit(&self, message: ClientMessage) -> Result<(), TransportError>;
}

/// What happened to the broadcast step of a local mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the transport.
    Sent,
    /// Applied locally, but the channel was down. The replica diverges until
    /// the next resync.
    Skipped(TransportError),
    /// Unknown reference: nothing was mutated and nothing was sent.
    NoOp,
}

impl Delivery {
    pub fn from_result(result: Result<(), TransportError>) -> Self {
        match result {
            Ok(()) => Delivery::Sent,
            Err(e) => Delivery::Skipped(e),
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, Delivery::Sent)
    }
}
