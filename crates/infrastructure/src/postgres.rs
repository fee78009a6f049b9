//! PostgreSQL 存储
//!
//! 消息日志独立成表，`seq` 单调序列作为插入顺序的权威索引，
//! 时间戳冲突不影响顺序。瞬时失败（连接池超时、IO 错误）
//! 在仓储内部做有界重试后才上抛。

use async_trait::async_trait;
use domain::{
    BlogCard, BlogId, BlogShare, ChatRoom, MediaAttachment, Message, MessageContent, MessageId,
    MessageKind, MessageState, Participant, ParticipantRole, Reaction, RepositoryError, RoomId,
    RoomKind, RoomSettings, UserId,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use application::repository::{ChatRoomRepository, MessageRepository, ParticipantRepository};

use crate::retry::{retry_async, RetryConfig};

pub async fn create_pg_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    let transient = matches!(
        err,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
    );
    if transient {
        RepositoryError::unavailable(err.to_string())
    } else {
        RepositoryError::storage(err.to_string())
    }
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

#[derive(Debug, FromRow)]
struct RoomRecord {
    id: Uuid,
    kind: RoomKind,
    name: Option<String>,
    allow_file_sharing: bool,
    allow_blog_sharing: bool,
    max_participants: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    last_activity_at: OffsetDateTime,
    is_active: bool,
}

impl TryFrom<RoomRecord> for ChatRoom {
    type Error = RepositoryError;

    fn try_from(value: RoomRecord) -> Result<Self, Self::Error> {
        let max_participants = u32::try_from(value.max_participants)
            .map_err(|_| invalid_data("negative max_participants"))?;
        Ok(ChatRoom {
            id: RoomId::from(value.id),
            kind: value.kind,
            name: value.name,
            settings: RoomSettings {
                allow_file_sharing: value.allow_file_sharing,
                allow_blog_sharing: value.allow_blog_sharing,
                max_participants,
            },
            created_at: value.created_at,
            updated_at: value.updated_at,
            last_activity_at: value.last_activity_at,
            is_active: value.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
struct ParticipantRecord {
    room_id: Uuid,
    user_id: Uuid,
    role: ParticipantRole,
    joined_at: OffsetDateTime,
    last_seen_at: OffsetDateTime,
}

impl From<ParticipantRecord> for Participant {
    fn from(value: ParticipantRecord) -> Self {
        Participant {
            room_id: RoomId::from(value.room_id),
            user_id: UserId::from(value.user_id),
            role: value.role,
            joined_at: value.joined_at,
            last_seen_at: value.last_seen_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "message_kind", rename_all = "lowercase")]
enum MessageKindColumn {
    Text,
    Image,
    File,
    Blog,
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    room_id: Uuid,
    sender_id: Uuid,
    content: String,
    kind: MessageKindColumn,
    media_url: Option<String>,
    media_filename: Option<String>,
    media_size: Option<i64>,
    blog_id: Option<Uuid>,
    blog_title: Option<String>,
    blog_excerpt: Option<String>,
    blog_cover_image: Option<String>,
    reactions: serde_json::Value,
    created_at: OffsetDateTime,
    edited_at: Option<OffsetDateTime>,
    deleted_at: Option<OffsetDateTime>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let content =
            MessageContent::new(value.content).map_err(|err| invalid_data(err.to_string()))?;

        let kind = match value.kind {
            MessageKindColumn::Text => MessageKind::Text,
            MessageKindColumn::Image | MessageKindColumn::File => {
                let url = value
                    .media_url
                    .ok_or_else(|| invalid_data("media message without url"))?;
                let attachment = MediaAttachment::new(
                    url,
                    value.media_filename,
                    value.media_size.map(|s| s as u64),
                )
                .map_err(|err| invalid_data(err.to_string()))?;
                if value.kind == MessageKindColumn::Image {
                    MessageKind::Image(attachment)
                } else {
                    MessageKind::File(attachment)
                }
            }
            MessageKindColumn::Blog => {
                let blog_id = value
                    .blog_id
                    .ok_or_else(|| invalid_data("blog message without blog_id"))?;
                let card = value.blog_title.map(|title| BlogCard {
                    title,
                    excerpt: value.blog_excerpt,
                    cover_image: value.blog_cover_image,
                });
                MessageKind::Blog(BlogShare {
                    blog_id: BlogId::from(blog_id),
                    card,
                })
            }
        };

        let reactions: Vec<Reaction> = serde_json::from_value(value.reactions)
            .map_err(|err| invalid_data(err.to_string()))?;

        // 删除优先于编辑：编辑后又删除的消息只保留删除状态
        let state = match (value.deleted_at, value.edited_at) {
            (Some(deleted_at), _) => MessageState::Deleted { deleted_at },
            (None, Some(edited_at)) => MessageState::Edited { edited_at },
            (None, None) => MessageState::Active,
        };

        Ok(Message {
            id: MessageId::from(value.id),
            room_id: RoomId::from(value.room_id),
            sender_id: UserId::from(value.sender_id),
            content,
            kind,
            reactions,
            state,
            created_at: value.created_at,
        })
    }
}

/// 消息实体到列值的拆解，插入与更新共用。
struct MessageColumns {
    kind: MessageKindColumn,
    media_url: Option<String>,
    media_filename: Option<String>,
    media_size: Option<i64>,
    blog_id: Option<Uuid>,
    blog_title: Option<String>,
    blog_excerpt: Option<String>,
    blog_cover_image: Option<String>,
    reactions: serde_json::Value,
    edited_at: Option<OffsetDateTime>,
    deleted_at: Option<OffsetDateTime>,
}

impl MessageColumns {
    fn from_message(message: &Message) -> Result<Self, RepositoryError> {
        let (kind, media_url, media_filename, media_size, blog_id, blog_title, blog_excerpt, blog_cover_image) =
            match &message.kind {
                MessageKind::Text => (MessageKindColumn::Text, None, None, None, None, None, None, None),
                MessageKind::Image(media) => (
                    MessageKindColumn::Image,
                    Some(media.url.clone()),
                    media.filename.clone(),
                    media.size.map(|s| s as i64),
                    None,
                    None,
                    None,
                    None,
                ),
                MessageKind::File(media) => (
                    MessageKindColumn::File,
                    Some(media.url.clone()),
                    media.filename.clone(),
                    media.size.map(|s| s as i64),
                    None,
                    None,
                    None,
                    None,
                ),
                MessageKind::Blog(share) => (
                    MessageKindColumn::Blog,
                    None,
                    None,
                    None,
                    Some(Uuid::from(share.blog_id)),
                    share.card.as_ref().map(|c| c.title.clone()),
                    share.card.as_ref().and_then(|c| c.excerpt.clone()),
                    share.card.as_ref().and_then(|c| c.cover_image.clone()),
                ),
            };

        let reactions = serde_json::to_value(&message.reactions)
            .map_err(|err| invalid_data(err.to_string()))?;

        Ok(Self {
            kind,
            media_url,
            media_filename,
            media_size,
            blog_id,
            blog_title,
            blog_excerpt,
            blog_cover_image,
            reactions,
            edited_at: message.edited_at(),
            deleted_at: message.deleted_at(),
        })
    }
}

const MESSAGE_COLUMNS: &str = "id, room_id, sender_id, content, kind, media_url, media_filename, \
     media_size, blog_id, blog_title, blog_excerpt, blog_cover_image, reactions, created_at, \
     edited_at, deleted_at";

const ROOM_COLUMNS: &str = "id, kind, name, allow_file_sharing, allow_blog_sharing, \
     max_participants, created_at, updated_at, last_activity_at, is_active";

/// PostgreSQL 存储，同时实现三个仓储接口。
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
    retry: RetryConfig,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(pool: PgPool, retry: RetryConfig) -> Self {
        Self { pool, retry }
    }

    async fn create_room_once(&self, room: ChatRoom) -> Result<ChatRoom, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(&format!(
            "INSERT INTO chat_rooms ({ROOM_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {ROOM_COLUMNS}"
        ))
        .bind(Uuid::from(room.id))
        .bind(room.kind)
        .bind(&room.name)
        .bind(room.settings.allow_file_sharing)
        .bind(room.settings.allow_blog_sharing)
        .bind(room.settings.max_participants as i32)
        .bind(room.created_at)
        .bind(room.updated_at)
        .bind(room.last_activity_at)
        .bind(room.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        ChatRoom::try_from(record)
    }

    async fn update_room_once(&self, room: ChatRoom) -> Result<ChatRoom, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(&format!(
            "UPDATE chat_rooms SET name = $2, allow_file_sharing = $3, allow_blog_sharing = $4, \
             max_participants = $5, updated_at = $6, last_activity_at = $7, is_active = $8 \
             WHERE id = $1 RETURNING {ROOM_COLUMNS}"
        ))
        .bind(Uuid::from(room.id))
        .bind(&room.name)
        .bind(room.settings.allow_file_sharing)
        .bind(room.settings.allow_blog_sharing)
        .bind(room.settings.max_participants as i32)
        .bind(room.updated_at)
        .bind(room.last_activity_at)
        .bind(room.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        ChatRoom::try_from(record)
    }

    async fn find_room_once(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(&format!(
            "SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(ChatRoom::try_from).transpose()
    }

    async fn find_direct_once(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<ChatRoom>, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(&format!(
            "SELECT r.id, r.kind, r.name, r.allow_file_sharing, r.allow_blog_sharing, \
             r.max_participants, r.created_at, r.updated_at, r.last_activity_at, r.is_active \
             FROM chat_rooms r \
             JOIN participants pa ON pa.room_id = r.id AND pa.user_id = $1 \
             JOIN participants pb ON pb.room_id = r.id AND pb.user_id = $2 \
             WHERE r.kind = 'direct' AND r.is_active \
             AND (SELECT COUNT(*) FROM participants p WHERE p.room_id = r.id) = 2 \
             LIMIT 1"
        ))
        .bind(Uuid::from(a))
        .bind(Uuid::from(b))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(ChatRoom::try_from).transpose()
    }

    async fn upsert_participant_once(
        &self,
        participant: Participant,
    ) -> Result<Participant, RepositoryError> {
        let record = sqlx::query_as::<_, ParticipantRecord>(
            "INSERT INTO participants (room_id, user_id, role, joined_at, last_seen_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (room_id, user_id) \
             DO UPDATE SET role = EXCLUDED.role, last_seen_at = EXCLUDED.last_seen_at \
             RETURNING room_id, user_id, role, joined_at, last_seen_at",
        )
        .bind(Uuid::from(participant.room_id))
        .bind(Uuid::from(participant.user_id))
        .bind(participant.role)
        .bind(participant.joined_at)
        .bind(participant.last_seen_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(Participant::from(record))
    }

    async fn find_participant_once(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<Option<Participant>, RepositoryError> {
        let record = sqlx::query_as::<_, ParticipantRecord>(
            "SELECT room_id, user_id, role, joined_at, last_seen_at \
             FROM participants WHERE room_id = $1 AND user_id = $2",
        )
        .bind(Uuid::from(room_id))
        .bind(Uuid::from(user_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Participant::from))
    }

    async fn remove_participant_once(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM participants WHERE room_id = $1 AND user_id = $2")
            .bind(Uuid::from(room_id))
            .bind(Uuid::from(user_id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn list_participants_once(
        &self,
        room_id: RoomId,
    ) -> Result<Vec<Participant>, RepositoryError> {
        let records = sqlx::query_as::<_, ParticipantRecord>(
            "SELECT room_id, user_id, role, joined_at, last_seen_at \
             FROM participants WHERE room_id = $1 ORDER BY joined_at ASC",
        )
        .bind(Uuid::from(room_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Participant::from).collect())
    }

    async fn list_rooms_for_user_once(
        &self,
        user_id: UserId,
    ) -> Result<Vec<RoomId>, RepositoryError> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT room_id FROM participants WHERE user_id = $1")
                .bind(Uuid::from(user_id))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        Ok(ids.into_iter().map(RoomId::from).collect())
    }

    async fn append_message_once(&self, message: Message) -> Result<Message, RepositoryError> {
        let columns = MessageColumns::from_message(&message)?;
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "INSERT INTO messages ({MESSAGE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.room_id))
        .bind(Uuid::from(message.sender_id))
        .bind(message.content.as_str())
        .bind(columns.kind)
        .bind(columns.media_url)
        .bind(columns.media_filename)
        .bind(columns.media_size)
        .bind(columns.blog_id)
        .bind(columns.blog_title)
        .bind(columns.blog_excerpt)
        .bind(columns.blog_cover_image)
        .bind(columns.reactions)
        .bind(message.created_at)
        .bind(columns.edited_at)
        .bind(columns.deleted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Message::try_from(record)
    }

    async fn update_message_once(&self, message: Message) -> Result<Message, RepositoryError> {
        let columns = MessageColumns::from_message(&message)?;
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "UPDATE messages SET content = $3, reactions = $4, edited_at = $5, deleted_at = $6 \
             WHERE id = $1 AND room_id = $2 RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.room_id))
        .bind(message.content.as_str())
        .bind(columns.reactions)
        .bind(columns.edited_at)
        .bind(columns.deleted_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Message::try_from(record)
    }

    async fn find_message_once(
        &self,
        room_id: RoomId,
        id: MessageId,
    ) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1 AND room_id = $2"
        ))
        .bind(Uuid::from(id))
        .bind(Uuid::from(room_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Message::try_from).transpose()
    }

    async fn list_messages_once(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE room_id = $1 ORDER BY seq ASC"
        ))
        .bind(Uuid::from(room_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }
}

#[async_trait]
impl ChatRoomRepository for PgStorage {
    async fn create(&self, room: ChatRoom) -> Result<ChatRoom, RepositoryError> {
        retry_async(self.retry.clone(), RepositoryError::is_transient, || {
            self.create_room_once(room.clone())
        })
        .await
    }

    async fn update(&self, room: ChatRoom) -> Result<ChatRoom, RepositoryError> {
        retry_async(self.retry.clone(), RepositoryError::is_transient, || {
            self.update_room_once(room.clone())
        })
        .await
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError> {
        retry_async(self.retry.clone(), RepositoryError::is_transient, || {
            self.find_room_once(id)
        })
        .await
    }

    async fn find_direct_for_pair(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<ChatRoom>, RepositoryError> {
        retry_async(self.retry.clone(), RepositoryError::is_transient, || {
            self.find_direct_once(a, b)
        })
        .await
    }
}

#[async_trait]
impl ParticipantRepository for PgStorage {
    async fn upsert(&self, participant: Participant) -> Result<Participant, RepositoryError> {
        retry_async(self.retry.clone(), RepositoryError::is_transient, || {
            self.upsert_participant_once(participant.clone())
        })
        .await
    }

    async fn find(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<Option<Participant>, RepositoryError> {
        retry_async(self.retry.clone(), RepositoryError::is_transient, || {
            self.find_participant_once(room_id, user_id)
        })
        .await
    }

    async fn remove(&self, room_id: RoomId, user_id: UserId) -> Result<(), RepositoryError> {
        retry_async(self.retry.clone(), RepositoryError::is_transient, || {
            self.remove_participant_once(room_id, user_id)
        })
        .await
    }

    async fn list_members(&self, room_id: RoomId) -> Result<Vec<Participant>, RepositoryError> {
        retry_async(self.retry.clone(), RepositoryError::is_transient, || {
            self.list_participants_once(room_id)
        })
        .await
    }

    async fn list_rooms_for_user(&self, user_id: UserId) -> Result<Vec<RoomId>, RepositoryError> {
        retry_async(self.retry.clone(), RepositoryError::is_transient, || {
            self.list_rooms_for_user_once(user_id)
        })
        .await
    }
}

#[async_trait]
impl MessageRepository for PgStorage {
    async fn append(&self, message: Message) -> Result<Message, RepositoryError> {
        retry_async(self.retry.clone(), RepositoryError::is_transient, || {
            self.append_message_once(message.clone())
        })
        .await
    }

    async fn update_message(&self, message: Message) -> Result<Message, RepositoryError> {
        retry_async(self.retry.clone(), RepositoryError::is_transient, || {
            self.update_message_once(message.clone())
        })
        .await
    }

    async fn find_message(
        &self,
        room_id: RoomId,
        id: MessageId,
    ) -> Result<Option<Message>, RepositoryError> {
        retry_async(self.retry.clone(), RepositoryError::is_transient, || {
            self.find_message_once(room_id, id)
        })
        .await
    }

    async fn list_for_room(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError> {
        retry_async(self.retry.clone(), RepositoryError::is_transient, || {
            self.list_messages_once(room_id)
        })
        .await
    }
}
