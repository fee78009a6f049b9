//! 基础设施层
//!
//! 提供存储与事件中继的具体实现：内存存储（单实例与测试）、
//! PostgreSQL 存储（生产持久化）、Redis Pub/Sub 中继（多实例扇出）。

pub mod directory;
pub mod memory;
pub mod postgres;
pub mod redis;
pub mod retry;

pub use directory::{InMemoryBlogDirectory, InMemoryUserDirectory};
pub use memory::MemoryStore;
pub use postgres::{create_pg_pool, PgStorage};
pub use crate::redis::{run_relay, RedisRoomBroadcaster};
pub use retry::{retry_async, Backoff, RetryConfig};
