//! ChannelEmitter - mpsc::UnboundedSender を Emitter として使う
//!
//! # 学習ポイント
//! - unbounded なので `emit` は同期のまま呼べる（await 不要）
//! - 受信側が drop されたら `send` が失敗する → `Disconnected` に変換

use tokio::sync::mpsc;

use crate::domain::ClientMessage;
use crate::error::TransportError;
use crate::ports::Emitter;

#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl ChannelEmitter {
    pub fn new(tx: mpsc::UnboundedSender<ClientMessage>) -> Self {
        Self { tx }
    }

    /// Emitter plus the receiving end, for wiring a writer task.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<ClientMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Emitter for ChannelEmitter {
    fn emit(&self, message: ClientMessage) -> Result<(), TransportError> {
        self.tx
            .send(message)
            .map_err(|_| TransportError::Disconnected)
    }
}
