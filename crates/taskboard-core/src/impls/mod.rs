//! Impls - Emitter の実装
//!
//! # 含まれる実装
//! - **ChannelEmitter**: mpsc に流すだけの送信口（TCP クライアントの writer 側が受ける）
//! - **OfflineEmitter**: 常に `Disconnected` を返す。relay なしで store を動かすとき用
//!
//! relay 直結の `LinkEmitter` は `relay::runtime` にある。

pub mod channel;
pub mod offline;

pub use self::channel::ChannelEmitter;
pub use self::offline::OfflineEmitter;
