//! 访问守卫
//!
//! 所有变更操作的前置检查：房间存在且活跃、调用者是成员、
//! 角色满足要求。自助退出不受角色限制，由服务层单独放行。

use domain::{ChatRoom, DomainError, Participant, ParticipantRole};

/// 房间缺失或已停用对外一律视为不可达。
pub fn ensure_active(room: Option<ChatRoom>) -> Result<ChatRoom, DomainError> {
    match room {
        None => Err(DomainError::RoomNotFound),
        Some(room) if !room.is_active => Err(DomainError::RoomInactive),
        Some(room) => Ok(room),
    }
}

pub fn ensure_participant(
    participant: Option<Participant>,
) -> Result<Participant, DomainError> {
    participant.ok_or(DomainError::NotParticipant)
}

pub fn ensure_role(
    participant: &Participant,
    allowed: &[ParticipantRole],
) -> Result<(), DomainError> {
    if allowed.contains(&participant.role) {
        Ok(())
    } else {
        Err(DomainError::InsufficientRole)
    }
}

/// 成员管理（拉人/踢人）要求的角色集合。
pub const MANAGE_PARTICIPANTS: &[ParticipantRole] =
    &[ParticipantRole::Admin, ParticipantRole::Moderator];

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{RoomId, Timestamp, UserId};
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn participant(role: ParticipantRole) -> Participant {
        Participant::new(
            RoomId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            role,
            now(),
        )
    }

    fn now() -> Timestamp {
        OffsetDateTime::now_utc()
    }

    #[test]
    fn missing_room_is_not_found() {
        assert_eq!(ensure_active(None), Err(DomainError::RoomNotFound));
    }

    #[test]
    fn inactive_room_is_rejected() {
        let mut room = ChatRoom::new_direct(RoomId::from(Uuid::new_v4()), now());
        room.deactivate(now());
        assert_eq!(ensure_active(Some(room)), Err(DomainError::RoomInactive));
    }

    #[test]
    fn non_participant_is_forbidden() {
        assert_eq!(ensure_participant(None), Err(DomainError::NotParticipant));
    }

    #[test]
    fn member_cannot_manage_participants() {
        let member = participant(ParticipantRole::Member);
        assert_eq!(
            ensure_role(&member, MANAGE_PARTICIPANTS),
            Err(DomainError::InsufficientRole)
        );

        let moderator = participant(ParticipantRole::Moderator);
        assert!(ensure_role(&moderator, MANAGE_PARTICIPANTS).is_ok());
    }
}
