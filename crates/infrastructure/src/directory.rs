//! 目录适配器
//!
//! 用户与博客由外部子系统拥有；单实例部署与测试用这里的
//! 内存适配器，生产部署替换为真正的服务客户端。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{BlogCard, BlogId, UserId};
use tokio::sync::RwLock;

use application::directory::{BlogDirectory, DirectoryError, UserDirectory, UserProfile};

#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    profiles: Arc<RwLock<HashMap<UserId, UserProfile>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: UserProfile) {
        self.profiles.write().await.insert(profile.id, profile);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserProfile>, DirectoryError> {
        Ok(self.profiles.read().await.get(&id).cloned())
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<UserProfile>, DirectoryError> {
        let query = query.to_lowercase();
        let guard = self.profiles.read().await;
        let mut matches: Vec<UserProfile> = guard
            .values()
            .filter(|p| p.username.to_lowercase().contains(&query))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.username.cmp(&b.username));
        matches.truncate(limit as usize);
        Ok(matches)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryBlogDirectory {
    cards: Arc<RwLock<HashMap<BlogId, BlogCard>>>,
}

impl InMemoryBlogDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, id: BlogId, card: BlogCard) {
        self.cards.write().await.insert(id, card);
    }
}

#[async_trait]
impl BlogDirectory for InMemoryBlogDirectory {
    async fn find_by_id(&self, id: BlogId) -> Result<Option<BlogCard>, DirectoryError> {
        Ok(self.cards.read().await.get(&id).cloned())
    }
}
