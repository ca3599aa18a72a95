//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **TimestampIdGenerator**: task は `task-<millis>`、client は ULID
//!
//! Task ID は作成時刻から作る。同じミリ秒に 2 回作成された場合は
//! 次の空いているミリ秒にずらして、ローカルでの一意性を保つ。

use std::sync::atomic::{AtomicI64, Ordering};

use ulid::Ulid;

use crate::domain::{ClientId, TaskId};
use crate::ports::Clock;

/// IdGenerator は task / client の ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（relay と client の両方から使う）
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;

    fn generate_client_id(&self) -> ClientId;
}

pub struct TimestampIdGenerator<C> {
    clock: C,
    last_task_millis: AtomicI64,
}

impl<C: Clock> TimestampIdGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            last_task_millis: AtomicI64::new(i64::MIN),
        }
    }
}

impl<C: Clock> IdGenerator for TimestampIdGenerator<C> {
    fn generate_task_id(&self) -> TaskId {
        let now = self.clock.now().timestamp_millis();
        let mut issued = now;
        // fetch_update never fails here: the closure always returns Some.
        let _ = self
            .last_task_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                issued = if now > last { now } else { last + 1 };
                Some(issued)
            });
        TaskId::from_millis(issued)
    }

    fn generate_client_id(&self) -> ClientId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        ClientId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
