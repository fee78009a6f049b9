//! 时钟抽象
//!
//! 已读水位与消息时间都经由这里取时，测试注入手动时钟
//! 以获得确定性的时间推进。

use domain::Timestamp;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// 系统 UTC 时钟
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        time::OffsetDateTime::now_utc()
    }
}
