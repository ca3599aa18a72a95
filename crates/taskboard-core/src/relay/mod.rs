//! Relay - サーバ側
//!
//! - **coordinator**: 権威ある BoardState と接続中クライアントの一覧
//! - **runtime**: coordinator を 1 タスクで回す（RelayRuntime / RelayHandle）
//! - **net**: 改行区切り JSON の TCP トランスポート

pub mod coordinator;
pub mod net;
pub mod runtime;

pub use self::coordinator::{Coordinator, Outbox, SnapshotPolicy};
pub use self::net::{RemoteLink, connect, serve};
pub use self::runtime::{ClientLink, LinkEmitter, RelayHandle, RelayRuntime};
