use domain::{
    Message, MessageId, MessageKind, Participant, ParticipantRole, Reaction, RoomId, RoomKind,
    RoomSettings, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

use crate::directory::UserProfile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: String,
    pub kind: MessageKind,
    pub reactions: Vec<Reaction>,
    pub created_at: Timestamp,
    pub edited_at: Option<Timestamp>,
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            room_id: message.room_id,
            sender_id: message.sender_id,
            content: message.content.as_str().to_owned(),
            kind: message.kind.clone(),
            reactions: message.reactions.clone(),
            created_at: message.created_at,
            edited_at: message.edited_at(),
        }
    }
}

/// 房间列表里展示的最近一条可见消息。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePreviewDto {
    pub sender_id: UserId,
    pub content: String,
    pub kind: String,
    pub created_at: Timestamp,
}

impl From<&Message> for MessagePreviewDto {
    fn from(message: &Message) -> Self {
        Self {
            sender_id: message.sender_id,
            content: message.content.as_str().to_owned(),
            kind: message.kind.label().to_owned(),
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantDto {
    pub user_id: UserId,
    pub role: ParticipantRole,
    pub joined_at: Timestamp,
    pub last_seen_at: Timestamp,
    /// 用户目录不可达时缺失，不阻断房间读取
    pub profile: Option<UserProfile>,
}

impl ParticipantDto {
    pub fn new(participant: &Participant, profile: Option<UserProfile>) -> Self {
        Self {
            user_id: participant.user_id,
            role: participant.role,
            joined_at: participant.joined_at,
            last_seen_at: participant.last_seen_at,
            profile,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub id: RoomId,
    pub kind: RoomKind,
    pub name: Option<String>,
    pub settings: RoomSettings,
    pub participants: Vec<ParticipantDto>,
    pub last_message: Option<MessagePreviewDto>,
    pub unread_count: u64,
    pub last_activity_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDetailDto {
    pub id: RoomId,
    pub kind: RoomKind,
    pub name: Option<String>,
    pub settings: RoomSettings,
    pub participants: Vec<ParticipantDto>,
    /// 非删除消息，按插入顺序
    pub messages: Vec<MessageDto>,
    /// 取房间内容时刻的未读数（随后水位被推进）
    pub unread_count: u64,
    pub last_activity_at: Timestamp,
}
