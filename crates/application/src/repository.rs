use async_trait::async_trait;
use domain::{ChatRoom, Message, MessageId, Participant, RepositoryError, RoomId, UserId};

#[async_trait]
pub trait ChatRoomRepository: Send + Sync {
    async fn create(&self, room: ChatRoom) -> Result<ChatRoom, RepositoryError>;
    async fn update(&self, room: ChatRoom) -> Result<ChatRoom, RepositoryError>;
    async fn find_by_id(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError>;
    /// 查找两名用户之间已有的活跃私聊房间（用于私聊去重）。
    async fn find_direct_for_pair(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<ChatRoom>, RepositoryError>;
}

#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    async fn upsert(&self, participant: Participant) -> Result<Participant, RepositoryError>;
    async fn find(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<Option<Participant>, RepositoryError>;
    /// 移除成员；目标不在房间时同样返回 Ok。
    async fn remove(&self, room_id: RoomId, user_id: UserId) -> Result<(), RepositoryError>;
    async fn list_members(&self, room_id: RoomId) -> Result<Vec<Participant>, RepositoryError>;
    async fn list_rooms_for_user(&self, user_id: UserId) -> Result<Vec<RoomId>, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 追加消息。插入顺序即日志顺序，时间戳冲突不改变顺序。
    async fn append(&self, message: Message) -> Result<Message, RepositoryError>;
    /// 覆盖已有消息（编辑、软删除、表情回应）。
    async fn update_message(&self, message: Message) -> Result<Message, RepositoryError>;
    async fn find_message(
        &self,
        room_id: RoomId,
        id: MessageId,
    ) -> Result<Option<Message>, RepositoryError>;
    /// 房间全部消息，按插入顺序，包含墓碑；可见性由调用方过滤。
    async fn list_for_room(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError>;
}
