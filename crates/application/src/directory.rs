//! 外部协作方目录接口
//!
//! 用户与博客都由其他子系统拥有，这里只定义核心所依赖的查询面。
//! 博客查询只用于消息富化，失败时降级而不阻断发送。

use async_trait::async_trait;
use domain::{BlogCard, BlogId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 成员展示所需的用户概要。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("directory unavailable: {message}")]
    Unavailable { message: String },
}

impl DirectoryError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserProfile>, DirectoryError>;
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<UserProfile>, DirectoryError>;
}

#[async_trait]
pub trait BlogDirectory: Send + Sync {
    async fn find_by_id(&self, id: BlogId) -> Result<Option<BlogCard>, DirectoryError>;
}
