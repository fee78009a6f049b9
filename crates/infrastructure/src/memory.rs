//! 内存存储
//!
//! 单实例部署与测试用的存储实现。整张表由一把读写锁保护，
//! 写锁天然串行化同一房间的变更；消息日志是每房间一个 Vec，
//! 追加顺序即权威顺序。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{
    ChatRoom, Message, MessageId, Participant, RepositoryError, RoomId, RoomKind, UserId,
};
use tokio::sync::RwLock;

use application::repository::{ChatRoomRepository, MessageRepository, ParticipantRepository};

#[derive(Default)]
struct MemoryInner {
    rooms: HashMap<RoomId, ChatRoom>,
    participants: HashMap<RoomId, Vec<Participant>>,
    messages: HashMap<RoomId, Vec<Message>>,
}

/// 同时实现三个仓储接口；克隆共享同一份底层状态。
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatRoomRepository for MemoryStore {
    async fn create(&self, room: ChatRoom) -> Result<ChatRoom, RepositoryError> {
        let mut guard = self.inner.write().await;
        if guard.rooms.contains_key(&room.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn update(&self, room: ChatRoom) -> Result<ChatRoom, RepositoryError> {
        let mut guard = self.inner.write().await;
        if !guard.rooms.contains_key(&room.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError> {
        Ok(self.inner.read().await.rooms.get(&id).cloned())
    }

    async fn find_direct_for_pair(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<ChatRoom>, RepositoryError> {
        let guard = self.inner.read().await;
        for room in guard.rooms.values() {
            if room.kind != RoomKind::Direct || !room.is_active {
                continue;
            }
            let Some(members) = guard.participants.get(&room.id) else {
                continue;
            };
            if members.len() == 2
                && members.iter().any(|m| m.user_id == a)
                && members.iter().any(|m| m.user_id == b)
            {
                return Ok(Some(room.clone()));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl ParticipantRepository for MemoryStore {
    async fn upsert(&self, participant: Participant) -> Result<Participant, RepositoryError> {
        let mut guard = self.inner.write().await;
        let members = guard.participants.entry(participant.room_id).or_default();
        match members
            .iter_mut()
            .find(|m| m.user_id == participant.user_id)
        {
            Some(existing) => *existing = participant.clone(),
            None => members.push(participant.clone()),
        }
        Ok(participant)
    }

    async fn find(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<Option<Participant>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .participants
            .get(&room_id)
            .and_then(|members| members.iter().find(|m| m.user_id == user_id).cloned()))
    }

    async fn remove(&self, room_id: RoomId, user_id: UserId) -> Result<(), RepositoryError> {
        let mut guard = self.inner.write().await;
        if let Some(members) = guard.participants.get_mut(&room_id) {
            members.retain(|m| m.user_id != user_id);
        }
        Ok(())
    }

    async fn list_members(&self, room_id: RoomId) -> Result<Vec<Participant>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .participants
            .get(&room_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_rooms_for_user(&self, user_id: UserId) -> Result<Vec<RoomId>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .participants
            .iter()
            .filter(|(_, members)| members.iter().any(|m| m.user_id == user_id))
            .map(|(room_id, _)| *room_id)
            .collect())
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn append(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut guard = self.inner.write().await;
        guard
            .messages
            .entry(message.room_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn update_message(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut guard = self.inner.write().await;
        let log = guard
            .messages
            .get_mut(&message.room_id)
            .ok_or(RepositoryError::NotFound)?;
        let slot = log
            .iter_mut()
            .find(|m| m.id == message.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = message.clone();
        Ok(message)
    }

    async fn find_message(
        &self,
        room_id: RoomId,
        id: MessageId,
    ) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .messages
            .get(&room_id)
            .and_then(|log| log.iter().find(|m| m.id == id).cloned()))
    }

    async fn list_for_room(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .messages
            .get(&room_id)
            .cloned()
            .unwrap_or_default())
    }
}
