use serde::{Deserialize, Serialize};

use crate::value_objects::{RoomId, Timestamp, UserId};

/// 成员角色枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "participant_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Member,
    Admin,
    Moderator,
}

impl Default for ParticipantRole {
    fn default() -> Self {
        Self::Member
    }
}

/// 房间成员记录，携带角色与已读水位。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub role: ParticipantRole,
    pub joined_at: Timestamp,
    /// 已读水位：晚于该时刻的他人消息计为未读
    pub last_seen_at: Timestamp,
}

impl Participant {
    pub fn new(room_id: RoomId, user_id: UserId, role: ParticipantRole, joined_at: Timestamp) -> Self {
        Self {
            room_id,
            user_id,
            role,
            joined_at,
            last_seen_at: joined_at,
        }
    }

    /// 推进已读水位。只向前移动，重放旧时间戳是 no-op。
    pub fn mark_seen(&mut self, at: Timestamp) {
        if at > self.last_seen_at {
            self.last_seen_at = at;
        }
    }
}
