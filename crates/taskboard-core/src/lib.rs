//! taskboard-core
//!
//! Replicated task board: clients keep a local replica, a relay keeps the
//! canonical copy and rebroadcasts changes to every connected client.
//!
//! # モジュール構成
//! - **domain**: タスク・メンバー・割り当て・ワイヤイベント
//! - **board**: BoardState（挿入順を保つ 3 つのマップ）
//! - **ports**: Clock / IdGenerator / Emitter
//! - **impls**: Emitter の実装（ChannelEmitter, OfflineEmitter）
//! - **client**: ClientStore（ローカルレプリカ + 送信）
//! - **relay**: Coordinator / RelayRuntime / TCP トランスポート
//! - **views**: 一覧・割り当てパネル・関係図・カレンダー
//! - **seed**: 起動時のサンプルデータ
//! - **config** / **logging**: 設定と tracing の初期化

pub mod board;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod logging;
pub mod ports;
pub mod relay;
pub mod seed;
pub mod views;

pub use board::BoardState;
pub use client::{ClientStore, Created};
pub use config::BoardConfig;
pub use error::{BoardError, TransportError};
pub use ports::Delivery;
pub use relay::{Coordinator, RelayHandle, RelayRuntime, SnapshotPolicy};
