//! 消息实体定义
//!
//! 消息只能通过追加产生，之后仅允许发送者编辑或软删除；
//! 生命周期用单一状态枚举表达，杜绝"删除后再编辑"之类的非法组合。

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{BlogId, MessageContent, MessageId, RoomId, Timestamp, UserId};

/// 博客分享的缓存摘要，由外部博客协作方在发送时解析。
/// 解析失败时整体缺失（优雅降级），消息本身仍然成立。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogCard {
    pub title: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogShare {
    pub blog_id: BlogId,
    pub card: Option<BlogCard>,
}

/// 图片/文件消息的媒体引用。URL 可达性不在此校验。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub url: String,
    pub filename: Option<String>,
    pub size: Option<u64>,
}

impl MediaAttachment {
    pub fn new(
        url: impl Into<String>,
        filename: Option<String>,
        size: Option<u64>,
    ) -> Result<Self, DomainError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(DomainError::invalid_argument("media_url", "cannot be empty"));
        }
        Ok(Self {
            url,
            filename,
            size,
        })
    }
}

/// 消息类型。载荷内嵌在变体中，类型与载荷不可能错配。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image(MediaAttachment),
    File(MediaAttachment),
    Blog(BlogShare),
}

impl MessageKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image(_) => "image",
            Self::File(_) => "file",
            Self::Blog(_) => "blog",
        }
    }
}

/// 消息生命周期状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum MessageState {
    Active,
    Edited { edited_at: Timestamp },
    Deleted { deleted_at: Timestamp },
}

/// 单个用户对消息的表情回应，一人一条，后写覆盖。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub user_id: UserId,
    pub emoji: String,
}

/// 消息实体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: MessageContent,
    pub kind: MessageKind,
    pub reactions: Vec<Reaction>,
    pub state: MessageState,
    /// 创建时间不可变；日志顺序以插入顺序为准
    pub created_at: Timestamp,
}

impl Message {
    pub fn new(
        id: MessageId,
        room_id: RoomId,
        sender_id: UserId,
        content: MessageContent,
        kind: MessageKind,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            room_id,
            sender_id,
            content,
            kind,
            reactions: Vec::new(),
            state: MessageState::Active,
            created_at,
        }
    }

    /// 编辑正文。已删除的消息不可编辑。
    pub fn edit(&mut self, new_content: MessageContent, at: Timestamp) -> Result<(), DomainError> {
        if matches!(self.state, MessageState::Deleted { .. }) {
            return Err(DomainError::OperationNotAllowed);
        }
        self.content = new_content;
        self.state = MessageState::Edited { edited_at: at };
        Ok(())
    }

    /// 软删除：内容保留在服务端，读取路径过滤。重复删除是 no-op。
    pub fn mark_deleted(&mut self, at: Timestamp) {
        if !matches!(self.state, MessageState::Deleted { .. }) {
            self.state = MessageState::Deleted { deleted_at: at };
        }
    }

    /// 表情回应：同一用户后写覆盖。
    pub fn react(&mut self, user_id: UserId, emoji: impl Into<String>) -> Result<(), DomainError> {
        if matches!(self.state, MessageState::Deleted { .. }) {
            return Err(DomainError::OperationNotAllowed);
        }
        let emoji = emoji.into();
        if emoji.trim().is_empty() {
            return Err(DomainError::invalid_argument("emoji", "cannot be empty"));
        }
        match self.reactions.iter_mut().find(|r| r.user_id == user_id) {
            Some(existing) => existing.emoji = emoji,
            None => self.reactions.push(Reaction { user_id, emoji }),
        }
        Ok(())
    }

    /// 撤销本人的表情回应；不存在时是 no-op。
    pub fn remove_reaction(&mut self, user_id: UserId) {
        self.reactions.retain(|r| r.user_id != user_id);
    }

    /// 是否对客户端可见（未被软删除）。
    pub fn is_visible(&self) -> bool {
        !matches!(self.state, MessageState::Deleted { .. })
    }

    pub fn edited_at(&self) -> Option<Timestamp> {
        match self.state {
            MessageState::Edited { edited_at } => Some(edited_at),
            _ => None,
        }
    }

    pub fn deleted_at(&self) -> Option<Timestamp> {
        match self.state {
            MessageState::Deleted { deleted_at } => Some(deleted_at),
            _ => None,
        }
    }
}
