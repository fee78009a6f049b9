//! 聊天用例服务
//!
//! 控制流程统一为：取房间 → 访问守卫 → 变更 → 持久化 → 尽力广播。
//! 广播失败绝不使触发它的变更失败。

use std::sync::Arc;

use domain::{
    unread_count, BlogId, BlogShare, ChatRoom, DomainError, MediaAttachment, Message,
    MessageContent, MessageId, MessageKind, Participant, ParticipantRole, RoomId, RoomKind,
    RoomSettings, UserId,
};
use uuid::Uuid;

use crate::{
    access,
    broadcaster::{RoomBroadcaster, RoomEvent},
    clock::Clock,
    directory::{BlogDirectory, UserDirectory, UserProfile},
    dto::{MessageDto, MessagePreviewDto, ParticipantDto, RoomDetailDto, RoomSummaryDto},
    error::ApplicationError,
    repository::{ChatRoomRepository, MessageRepository, ParticipantRepository},
};

#[derive(Debug, Clone)]
pub struct CreateRoomRequest {
    pub kind: RoomKind,
    pub initiator_id: Uuid,
    /// 除发起者以外的成员
    pub participant_ids: Vec<Uuid>,
    pub name: Option<String>,
    pub settings: Option<RoomSettings>,
}

/// 消息载荷的外部输入形态；在服务内转换为带校验的 `MessageKind`。
#[derive(Debug, Clone)]
pub enum MessagePayload {
    Text,
    Image {
        url: String,
        filename: Option<String>,
        size: Option<u64>,
    },
    File {
        url: String,
        filename: Option<String>,
        size: Option<u64>,
    },
    Blog {
        blog_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub payload: MessagePayload,
}

#[derive(Debug, Clone)]
pub struct EditMessageRequest {
    pub room_id: Uuid,
    pub message_id: Uuid,
    pub editor_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct DeleteMessageRequest {
    pub room_id: Uuid,
    pub message_id: Uuid,
    pub requester_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct AddParticipantRequest {
    pub room_id: Uuid,
    pub actor_id: Uuid,
    pub user_id: Uuid,
    pub role: ParticipantRole,
}

#[derive(Debug, Clone)]
pub struct RemoveParticipantRequest {
    pub room_id: Uuid,
    pub actor_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct ReactRequest {
    pub room_id: Uuid,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub emoji: String,
}

pub struct ChatServiceDependencies {
    pub room_repository: Arc<dyn ChatRoomRepository>,
    pub participant_repository: Arc<dyn ParticipantRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub user_directory: Arc<dyn UserDirectory>,
    pub blog_directory: Arc<dyn BlogDirectory>,
    pub clock: Arc<dyn Clock>,
    pub broadcaster: Arc<dyn RoomBroadcaster>,
}

pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    /// 变更操作共用的前置检查：房间活跃且调用者在房间内。
    async fn guard(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<(ChatRoom, Participant), ApplicationError> {
        let room = access::ensure_active(self.deps.room_repository.find_by_id(room_id).await?)?;
        let participant = access::ensure_participant(
            self.deps.participant_repository.find(room_id, user_id).await?,
        )?;
        Ok((room, participant))
    }

    pub async fn create_room(
        &self,
        request: CreateRoomRequest,
    ) -> Result<ChatRoom, ApplicationError> {
        let initiator = UserId::from(request.initiator_id);
        let mut others: Vec<UserId> = Vec::new();
        for id in request.participant_ids {
            let id = UserId::from(id);
            if id != initiator && !others.contains(&id) {
                others.push(id);
            }
        }

        match request.kind {
            RoomKind::Direct => self.create_direct_room(initiator, others).await,
            RoomKind::Group => {
                self.create_group_room(initiator, others, request.name, request.settings)
                    .await
            }
        }
    }

    async fn create_direct_room(
        &self,
        initiator: UserId,
        others: Vec<UserId>,
    ) -> Result<ChatRoom, ApplicationError> {
        if others.len() != 1 {
            return Err(DomainError::invalid_argument(
                "participants",
                "direct rooms require exactly one other participant",
            )
            .into());
        }
        let other = others[0];

        // 同一对用户之间复用已有私聊房间
        if let Some(existing) = self
            .deps
            .room_repository
            .find_direct_for_pair(initiator, other)
            .await?
        {
            return Ok(existing);
        }

        let now = self.deps.clock.now();
        let room = ChatRoom::new_direct(RoomId::from(Uuid::new_v4()), now);
        let room = self.deps.room_repository.create(room).await?;

        self.deps
            .participant_repository
            .upsert(Participant::new(
                room.id,
                initiator,
                ParticipantRole::Admin,
                now,
            ))
            .await?;
        self.deps
            .participant_repository
            .upsert(Participant::new(room.id, other, ParticipantRole::Member, now))
            .await?;

        Ok(room)
    }

    async fn create_group_room(
        &self,
        initiator: UserId,
        others: Vec<UserId>,
        name: Option<String>,
        settings: Option<RoomSettings>,
    ) -> Result<ChatRoom, ApplicationError> {
        let name = name.ok_or_else(|| {
            DomainError::invalid_argument("name", "group rooms require a name")
        })?;
        if others.is_empty() {
            return Err(DomainError::invalid_argument(
                "participants",
                "group rooms require at least one other participant",
            )
            .into());
        }

        let settings = settings.unwrap_or_default();
        if 1 + others.len() as u32 > settings.max_participants {
            return Err(DomainError::invalid_argument(
                "participants",
                "participant count exceeds max_participants",
            )
            .into());
        }

        let now = self.deps.clock.now();
        let room = ChatRoom::new_group(RoomId::from(Uuid::new_v4()), name, settings, now)?;
        let room = self.deps.room_repository.create(room).await?;

        self.deps
            .participant_repository
            .upsert(Participant::new(
                room.id,
                initiator,
                ParticipantRole::Admin,
                now,
            ))
            .await?;
        for user_id in others {
            self.deps
                .participant_repository
                .upsert(Participant::new(
                    room.id,
                    user_id,
                    ParticipantRole::Member,
                    now,
                ))
                .await?;
        }

        Ok(room)
    }

    /// 用户的活跃房间列表，按最近活动倒序，附未读数与最近一条可见消息。
    pub async fn list_rooms(&self, user_id: Uuid) -> Result<Vec<RoomSummaryDto>, ApplicationError> {
        let user_id = UserId::from(user_id);
        let room_ids = self
            .deps
            .participant_repository
            .list_rooms_for_user(user_id)
            .await?;

        let mut summaries = Vec::with_capacity(room_ids.len());
        for room_id in room_ids {
            let Some(room) = self.deps.room_repository.find_by_id(room_id).await? else {
                continue;
            };
            if !room.is_active {
                continue;
            }

            let participants = self
                .deps
                .participant_repository
                .list_members(room.id)
                .await?;
            let Some(me) = participants.iter().find(|p| p.user_id == user_id) else {
                continue;
            };

            let messages = self.deps.message_repository.list_for_room(room.id).await?;
            let last_message = messages
                .iter()
                .rev()
                .find(|m| m.is_visible())
                .map(MessagePreviewDto::from);
            let unread = unread_count(&messages, me) as u64;

            summaries.push(RoomSummaryDto {
                id: room.id,
                kind: room.kind,
                name: room.name.clone(),
                settings: room.settings.clone(),
                participants: self.participant_dtos(&participants).await,
                last_message,
                unread_count: unread,
                last_activity_at: room.last_activity_at,
            });
        }

        summaries.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(summaries)
    }

    /// 房间详情：非删除消息按插入顺序返回，同时惰性推进调用者的已读水位。
    /// 返回的 `unread_count` 是推进水位之前的值。
    pub async fn get_room(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<RoomDetailDto, ApplicationError> {
        let room_id = RoomId::from(room_id);
        let user_id = UserId::from(user_id);
        let (room, mut me) = self.guard(room_id, user_id).await?;

        let participants = self
            .deps
            .participant_repository
            .list_members(room.id)
            .await?;
        let messages = self.deps.message_repository.list_for_room(room.id).await?;

        let unread = unread_count(&messages, &me) as u64;
        let visible: Vec<MessageDto> = messages
            .iter()
            .filter(|m| m.is_visible())
            .map(MessageDto::from)
            .collect();

        me.mark_seen(self.deps.clock.now());
        self.deps.participant_repository.upsert(me).await?;

        Ok(RoomDetailDto {
            id: room.id,
            kind: room.kind,
            name: room.name.clone(),
            settings: room.settings.clone(),
            participants: self.participant_dtos(&participants).await,
            messages: visible,
            unread_count: unread,
            last_activity_at: room.last_activity_at,
        })
    }

    pub async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let room_id = RoomId::from(request.room_id);
        let sender_id = UserId::from(request.sender_id);
        let (mut room, _) = self.guard(room_id, sender_id).await?;

        let content = MessageContent::new(request.content)?;
        let kind = self.resolve_payload(&room, request.payload).await?;
        let now = self.deps.clock.now();

        let message = Message::new(
            MessageId::from(Uuid::new_v4()),
            room_id,
            sender_id,
            content,
            kind,
            now,
        );
        let stored = self.deps.message_repository.append(message).await?;

        room.record_activity(stored.created_at);
        self.deps.room_repository.update(room).await?;

        self.publish_best_effort(RoomEvent::message_received(
            room_id,
            MessageDto::from(&stored),
        ))
        .await;

        Ok(stored)
    }

    /// 载荷校验与富化。博客解析失败是降级而不是错误：
    /// 消息照常追加，只是没有缓存摘要。
    async fn resolve_payload(
        &self,
        room: &ChatRoom,
        payload: MessagePayload,
    ) -> Result<MessageKind, ApplicationError> {
        match payload {
            MessagePayload::Text => Ok(MessageKind::Text),
            MessagePayload::Image { url, filename, size } => {
                if !room.settings.allow_file_sharing {
                    return Err(DomainError::invalid_argument(
                        "kind",
                        "file sharing is disabled for this room",
                    )
                    .into());
                }
                Ok(MessageKind::Image(MediaAttachment::new(url, filename, size)?))
            }
            MessagePayload::File { url, filename, size } => {
                if !room.settings.allow_file_sharing {
                    return Err(DomainError::invalid_argument(
                        "kind",
                        "file sharing is disabled for this room",
                    )
                    .into());
                }
                Ok(MessageKind::File(MediaAttachment::new(url, filename, size)?))
            }
            MessagePayload::Blog { blog_id } => {
                if !room.settings.allow_blog_sharing {
                    return Err(DomainError::invalid_argument(
                        "kind",
                        "blog sharing is disabled for this room",
                    )
                    .into());
                }
                let blog_id = BlogId::from(blog_id);
                let card = match self.deps.blog_directory.find_by_id(blog_id).await {
                    Ok(Some(card)) => Some(card),
                    Ok(None) => {
                        tracing::warn!(
                            room_id = %room.id,
                            blog_id = %blog_id,
                            "shared blog not found, appending without cached card"
                        );
                        None
                    }
                    Err(err) => {
                        tracing::warn!(
                            room_id = %room.id,
                            blog_id = %blog_id,
                            error = %err,
                            "blog lookup degraded, appending without cached card"
                        );
                        None
                    }
                };
                Ok(MessageKind::Blog(BlogShare { blog_id, card }))
            }
        }
    }

    pub async fn edit_message(
        &self,
        request: EditMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let room_id = RoomId::from(request.room_id);
        let editor_id = UserId::from(request.editor_id);
        self.guard(room_id, editor_id).await?;

        let mut message = self
            .find_visible_message(room_id, MessageId::from(request.message_id))
            .await?;
        if message.sender_id != editor_id {
            return Err(DomainError::NotMessageSender.into());
        }

        let content = MessageContent::new(request.content)?;
        message.edit(content, self.deps.clock.now())?;
        let stored = self.deps.message_repository.update_message(message).await?;

        self.publish_best_effort(RoomEvent::message_edited(
            room_id,
            MessageDto::from(&stored),
        ))
        .await;

        Ok(stored)
    }

    pub async fn delete_message(
        &self,
        request: DeleteMessageRequest,
    ) -> Result<(), ApplicationError> {
        let room_id = RoomId::from(request.room_id);
        let requester_id = UserId::from(request.requester_id);
        self.guard(room_id, requester_id).await?;

        let mut message = self
            .find_visible_message(room_id, MessageId::from(request.message_id))
            .await?;
        if message.sender_id != requester_id {
            return Err(DomainError::NotMessageSender.into());
        }

        let message_id = message.id;
        message.mark_deleted(self.deps.clock.now());
        self.deps.message_repository.update_message(message).await?;

        self.publish_best_effort(RoomEvent::message_deleted(room_id, message_id))
            .await;

        Ok(())
    }

    pub async fn add_participant(
        &self,
        request: AddParticipantRequest,
    ) -> Result<Participant, ApplicationError> {
        let room_id = RoomId::from(request.room_id);
        let actor_id = UserId::from(request.actor_id);
        let user_id = UserId::from(request.user_id);

        let (room, actor) = self.guard(room_id, actor_id).await?;
        access::ensure_role(&actor, access::MANAGE_PARTICIPANTS)?;

        // 已是成员：no-op，返回现状
        if let Some(existing) = self.deps.participant_repository.find(room_id, user_id).await? {
            return Ok(existing);
        }

        let members = self
            .deps
            .participant_repository
            .list_members(room_id)
            .await?;
        match room.kind {
            RoomKind::Direct => {
                if members.len() >= 2 {
                    return Err(DomainError::invalid_argument(
                        "participants",
                        "direct rooms are limited to two participants",
                    )
                    .into());
                }
            }
            RoomKind::Group => {
                if members.len() as u32 >= room.settings.max_participants {
                    return Err(DomainError::invalid_argument(
                        "participants",
                        "room is full",
                    )
                    .into());
                }
            }
        }

        let participant = Participant::new(room_id, user_id, request.role, self.deps.clock.now());
        Ok(self.deps.participant_repository.upsert(participant).await?)
    }

    /// 停用房间（软删除）。房间保留在存储中，此后对外等同不存在。
    pub async fn deactivate_room(
        &self,
        room_id: Uuid,
        actor_id: Uuid,
    ) -> Result<(), ApplicationError> {
        let room_id = RoomId::from(room_id);
        let actor_id = UserId::from(actor_id);

        let (mut room, actor) = self.guard(room_id, actor_id).await?;
        access::ensure_role(&actor, &[ParticipantRole::Admin])?;

        room.deactivate(self.deps.clock.now());
        self.deps.room_repository.update(room).await?;
        Ok(())
    }

    pub async fn remove_participant(
        &self,
        request: RemoveParticipantRequest,
    ) -> Result<(), ApplicationError> {
        let room_id = RoomId::from(request.room_id);
        let actor_id = UserId::from(request.actor_id);
        let user_id = UserId::from(request.user_id);

        let (_, actor) = self.guard(room_id, actor_id).await?;
        // 自助退出不受角色限制
        if actor_id != user_id {
            access::ensure_role(&actor, access::MANAGE_PARTICIPANTS)?;
        }

        // 清空房间也不自动停用，停用是独立的显式操作
        self.deps.participant_repository.remove(room_id, user_id).await?;
        Ok(())
    }

    /// 将成员的已读水位推进到当前时刻。非成员调用是 no-op。
    pub async fn mark_as_read(&self, room_id: Uuid, user_id: Uuid) -> Result<(), ApplicationError> {
        let room_id = RoomId::from(room_id);
        let user_id = UserId::from(user_id);
        access::ensure_active(self.deps.room_repository.find_by_id(room_id).await?)?;

        let Some(mut participant) =
            self.deps.participant_repository.find(room_id, user_id).await?
        else {
            return Ok(());
        };

        participant.mark_seen(self.deps.clock.now());
        self.deps.participant_repository.upsert(participant).await?;
        Ok(())
    }

    pub async fn react_to_message(
        &self,
        request: ReactRequest,
    ) -> Result<Message, ApplicationError> {
        let room_id = RoomId::from(request.room_id);
        let user_id = UserId::from(request.user_id);
        self.guard(room_id, user_id).await?;

        let mut message = self
            .find_visible_message(room_id, MessageId::from(request.message_id))
            .await?;
        message.react(user_id, request.emoji)?;
        let stored = self.deps.message_repository.update_message(message).await?;

        self.publish_best_effort(RoomEvent::reaction_updated(
            room_id,
            stored.id,
            stored.reactions.clone(),
        ))
        .await;

        Ok(stored)
    }

    pub async fn remove_reaction(
        &self,
        room_id: Uuid,
        message_id: Uuid,
        user_id: Uuid,
    ) -> Result<Message, ApplicationError> {
        let room_id = RoomId::from(room_id);
        let user_id = UserId::from(user_id);
        self.guard(room_id, user_id).await?;

        let mut message = self
            .find_visible_message(room_id, MessageId::from(message_id))
            .await?;
        message.remove_reaction(user_id);
        let stored = self.deps.message_repository.update_message(message).await?;

        self.publish_best_effort(RoomEvent::reaction_updated(
            room_id,
            stored.id,
            stored.reactions.clone(),
        ))
        .await;

        Ok(stored)
    }

    /// 搜索可发起会话的用户，排除调用者自己。
    pub async fn search_users(
        &self,
        caller_id: Uuid,
        query: &str,
        limit: u32,
    ) -> Result<Vec<UserProfile>, ApplicationError> {
        if query.trim().is_empty() {
            return Err(DomainError::invalid_argument("q", "cannot be empty").into());
        }
        let caller_id = UserId::from(caller_id);
        let profiles = self.deps.user_directory.search(query, limit).await?;
        Ok(profiles.into_iter().filter(|p| p.id != caller_id).collect())
    }

    /// 墓碑对客户端读路径不可见，这里统一按不存在处理。
    async fn find_visible_message(
        &self,
        room_id: RoomId,
        message_id: MessageId,
    ) -> Result<Message, ApplicationError> {
        let message = self
            .deps
            .message_repository
            .find_message(room_id, message_id)
            .await?
            .ok_or(DomainError::MessageNotFound)?;
        if !message.is_visible() {
            return Err(DomainError::MessageNotFound.into());
        }
        Ok(message)
    }

    async fn participant_dtos(&self, participants: &[Participant]) -> Vec<ParticipantDto> {
        let mut dtos = Vec::with_capacity(participants.len());
        for participant in participants {
            let profile = match self.deps.user_directory.find_by_id(participant.user_id).await {
                Ok(profile) => profile,
                Err(err) => {
                    tracing::warn!(
                        user_id = %participant.user_id,
                        error = %err,
                        "user directory lookup degraded"
                    );
                    None
                }
            };
            dtos.push(ParticipantDto::new(participant, profile));
        }
        dtos
    }

    async fn publish_best_effort(&self, event: RoomEvent) {
        let room_id = event.room_id;
        if let Err(err) = self.deps.broadcaster.publish(event).await {
            tracing::warn!(room_id = %room_id, error = %err, "room event broadcast failed");
        }
    }
}
