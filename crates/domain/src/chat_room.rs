use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{RoomId, Timestamp};

/// 房间类型：一对一私聊或多人群聊。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "room_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Direct,
    Group,
}

/// 房间级开关与上限。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    pub allow_file_sharing: bool,
    pub allow_blog_sharing: bool,
    pub max_participants: u32,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            allow_file_sharing: true,
            allow_blog_sharing: true,
            max_participants: 50,
        }
    }
}

impl RoomSettings {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_participants < 2 {
            return Err(DomainError::invalid_argument(
                "max_participants",
                "must allow at least 2 participants",
            ));
        }
        Ok(())
    }
}

/// 聊天室聚合根。成员与消息记录由仓储单独持有，
/// 房间本身只承载类型、设置与活跃状态。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: RoomId,
    pub kind: RoomKind,
    /// 群聊名称；私聊房间无名称
    pub name: Option<String>,
    pub settings: RoomSettings,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// 最近一条消息的时间，单调不减
    pub last_activity_at: Timestamp,
    pub is_active: bool,
}

impl ChatRoom {
    pub fn new_direct(id: RoomId, created_at: Timestamp) -> Self {
        Self {
            id,
            kind: RoomKind::Direct,
            name: None,
            settings: RoomSettings::default(),
            created_at,
            updated_at: created_at,
            last_activity_at: created_at,
            is_active: true,
        }
    }

    pub fn new_group(
        id: RoomId,
        name: impl Into<String>,
        settings: RoomSettings,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let name = Self::validate_name(name.into())?;
        settings.validate()?;
        Ok(Self {
            id,
            kind: RoomKind::Group,
            name: Some(name),
            settings,
            created_at,
            updated_at: created_at,
            last_activity_at: created_at,
            is_active: true,
        })
    }

    /// 记录最新消息时间。时钟回拨时保持原值，保证单调性。
    pub fn record_activity(&mut self, at: Timestamp) {
        if at > self.last_activity_at {
            self.last_activity_at = at;
        }
        self.updated_at = at.max(self.updated_at);
    }

    pub fn rename(&mut self, name: impl Into<String>, now: Timestamp) -> Result<(), DomainError> {
        if self.kind == RoomKind::Direct {
            return Err(DomainError::OperationNotAllowed);
        }
        self.name = Some(Self::validate_name(name.into())?);
        self.updated_at = now;
        Ok(())
    }

    /// 软删除：房间保留在存储中，但对外等同不存在。
    pub fn deactivate(&mut self, now: Timestamp) {
        self.is_active = false;
        self.updated_at = now;
    }

    fn validate_name(name: String) -> Result<String, DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_argument("name", "cannot be empty"));
        }
        if trimmed.len() > 100 {
            return Err(DomainError::invalid_argument("name", "too long"));
        }
        Ok(trimmed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    fn now() -> Timestamp {
        OffsetDateTime::now_utc()
    }

    #[test]
    fn direct_room_has_no_name() {
        let room = ChatRoom::new_direct(RoomId::from(Uuid::new_v4()), now());
        assert_eq!(room.kind, RoomKind::Direct);
        assert!(room.name.is_none());
        assert!(room.is_active);
    }

    #[test]
    fn group_room_validates_name() {
        let id = RoomId::from(Uuid::new_v4());
        assert!(ChatRoom::new_group(id, "  ", RoomSettings::default(), now()).is_err());
        assert!(ChatRoom::new_group(id, "a".repeat(101), RoomSettings::default(), now()).is_err());

        let room = ChatRoom::new_group(id, " rust talk ", RoomSettings::default(), now()).unwrap();
        assert_eq!(room.name.as_deref(), Some("rust talk"));
    }

    #[test]
    fn settings_require_room_for_two() {
        let settings = RoomSettings {
            max_participants: 1,
            ..RoomSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn activity_is_monotonic() {
        let created = now();
        let mut room = ChatRoom::new_direct(RoomId::from(Uuid::new_v4()), created);

        let later = created + Duration::seconds(5);
        room.record_activity(later);
        assert_eq!(room.last_activity_at, later);

        // 时钟回拨不会倒退
        room.record_activity(created);
        assert_eq!(room.last_activity_at, later);
    }

    #[test]
    fn direct_room_cannot_be_renamed() {
        let mut room = ChatRoom::new_direct(RoomId::from(Uuid::new_v4()), now());
        assert_eq!(
            room.rename("pair", now()),
            Err(DomainError::OperationNotAllowed)
        );
    }

    #[test]
    fn deactivate_is_soft() {
        let mut room = ChatRoom::new_direct(RoomId::from(Uuid::new_v4()), now());
        room.deactivate(now());
        assert!(!room.is_active);
    }
}
