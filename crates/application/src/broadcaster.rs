use async_trait::async_trait;
use domain::{MessageId, Reaction, RoomId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dto::MessageDto;

/// 推送给订阅者的房间事件。事件是建议性的：
/// 权威状态永远来自存储，错过的事件不补发。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomEvent {
    pub room_id: RoomId,
    #[serde(flatten)]
    pub payload: RoomEventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEventPayload {
    MessageReceived {
        message: MessageDto,
    },
    MessageEdited {
        message: MessageDto,
    },
    MessageDeleted {
        message_id: MessageId,
    },
    ReactionUpdated {
        message_id: MessageId,
        reactions: Vec<Reaction>,
    },
    /// 瞬时信号，不落盘；客户端在 3 秒内自行过期
    TypingIndicator {
        user_id: UserId,
        is_typing: bool,
    },
}

impl RoomEvent {
    pub fn message_received(room_id: RoomId, message: MessageDto) -> Self {
        Self {
            room_id,
            payload: RoomEventPayload::MessageReceived { message },
        }
    }

    pub fn message_edited(room_id: RoomId, message: MessageDto) -> Self {
        Self {
            room_id,
            payload: RoomEventPayload::MessageEdited { message },
        }
    }

    pub fn message_deleted(room_id: RoomId, message_id: MessageId) -> Self {
        Self {
            room_id,
            payload: RoomEventPayload::MessageDeleted { message_id },
        }
    }

    pub fn reaction_updated(room_id: RoomId, message_id: MessageId, reactions: Vec<Reaction>) -> Self {
        Self {
            room_id,
            payload: RoomEventPayload::ReactionUpdated {
                message_id,
                reactions,
            },
        }
    }

    pub fn typing(room_id: RoomId, user_id: UserId, is_typing: bool) -> Self {
        Self {
            room_id,
            payload: RoomEventPayload::TypingIndicator { user_id, is_typing },
        }
    }
}

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("broadcast failed: {0}")]
    Failed(String),
}

impl BroadcastError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[async_trait]
pub trait RoomBroadcaster: Send + Sync {
    /// 至多一次、尽力而为的投递。失败不得影响触发它的变更。
    async fn publish(&self, event: RoomEvent) -> Result<(), BroadcastError>;
}
