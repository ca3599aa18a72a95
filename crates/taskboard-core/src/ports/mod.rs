//! Ports - 抽象化レイヤー
//!
//! store と relay が外の世界（時刻、ID、送信路）に触れる口をここに集める。
//! テストでは FixedClock や記録用 Emitter に差し替える。

pub mod clock;
pub mod emitter;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::emitter::{Delivery, Emitter};
pub use self::id_generator::{IdGenerator, TimestampIdGenerator};
