//! OfflineEmitter - never connected.

use crate::domain::ClientMessage;
use crate::error::TransportError;
use crate::ports::Emitter;

/// Every emit fails with `Disconnected`; local mutations still apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineEmitter;

impl Emitter for OfflineEmitter {
    fn emit(&self, _message: ClientMessage) -> Result<(), TransportError> {
        Err(TransportError::Disconnected)
    }
}
