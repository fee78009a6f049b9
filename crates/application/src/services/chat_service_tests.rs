//! 聊天服务单元测试
//!
//! 使用内存伪实现覆盖房间创建、消息追加顺序、未读水位、
//! 权限拒绝与博客分享降级等核心行为。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domain::{
    BlogCard, BlogId, ChatRoom, DomainError, Message, MessageId, MessageKind, Participant,
    ParticipantRole, RepositoryError, RoomId, RoomKind, Timestamp, UserId,
};
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::clock::Clock;
use crate::directory::{BlogDirectory, DirectoryError, UserDirectory, UserProfile};
use crate::error::ApplicationError;
use crate::local_broadcast::LocalRoomBroadcaster;
use crate::repository::{ChatRoomRepository, MessageRepository, ParticipantRepository};
use crate::services::chat_service::{
    AddParticipantRequest, ChatService, ChatServiceDependencies, CreateRoomRequest,
    DeleteMessageRequest, EditMessageRequest, MessagePayload, ReactRequest,
    RemoveParticipantRequest, SendMessageRequest,
};

#[derive(Default)]
struct StoreInner {
    rooms: HashMap<RoomId, ChatRoom>,
    participants: HashMap<RoomId, Vec<Participant>>,
    messages: HashMap<RoomId, Vec<Message>>,
}

#[derive(Clone, Default)]
struct TestStore {
    inner: Arc<RwLock<StoreInner>>,
}

#[async_trait]
impl ChatRoomRepository for TestStore {
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
            if let Some(members) = guard.participants.get(&room.id) {
                if members.len() == 2
                    && members.iter().any(|m| m.user_id == a)
                    && members.iter().any(|m| m.user_id == b)
                {
                    return Ok(Some(room.clone()));
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl ParticipantRepository for TestStore {
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
impl MessageRepository for TestStore {
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

/// 可手动推进的测试时钟
struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(OffsetDateTime::now_utc()),
        })
    }

    fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
struct StaticUserDirectory {
    profiles: HashMap<UserId, UserProfile>,
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserProfile>, DirectoryError> {
        Ok(self.profiles.get(&id).cloned())
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<UserProfile>, DirectoryError> {
        let query = query.to_lowercase();
        Ok(self
            .profiles
            .values()
            .filter(|p| p.username.to_lowercase().contains(&query))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

/// 每个测试用固定应答的博客目录
struct StubBlogDirectory {
    response: Result<Option<BlogCard>, DirectoryError>,
}

#[async_trait]
impl BlogDirectory for StubBlogDirectory {
    async fn find_by_id(&self, _id: BlogId) -> Result<Option<BlogCard>, DirectoryError> {
        self.response.clone()
    }
}

struct TestContext {
    service: Arc<ChatService>,
    store: TestStore,
    clock: Arc<ManualClock>,
}

fn context() -> TestContext {
    context_with_blog(Ok(Some(BlogCard {
        title: "Borrow Checker Notes".to_owned(),
        excerpt: Some("ownership in practice".to_owned()),
        cover_image: None,
    })))
}

fn context_with_blog(response: Result<Option<BlogCard>, DirectoryError>) -> TestContext {
    let store = TestStore::default();
    let clock = ManualClock::new();
    let service = ChatService::new(ChatServiceDependencies {
        room_repository: Arc::new(store.clone()),
        participant_repository: Arc::new(store.clone()),
        message_repository: Arc::new(store.clone()),
        user_directory: Arc::new(StaticUserDirectory::default()),
        blog_directory: Arc::new(StubBlogDirectory { response }),
        clock: clock.clone(),
        broadcaster: Arc::new(LocalRoomBroadcaster::default()),
    });
    TestContext {
        service: Arc::new(service),
        store,
        clock,
    }
}

fn direct_request(initiator: Uuid, other: Uuid) -> CreateRoomRequest {
    CreateRoomRequest {
        kind: RoomKind::Direct,
        initiator_id: initiator,
        participant_ids: vec![other],
        name: None,
        settings: None,
    }
}

fn text_message(room_id: Uuid, sender_id: Uuid, content: &str) -> SendMessageRequest {
    SendMessageRequest {
        room_id,
        sender_id,
        content: content.to_owned(),
        payload: MessagePayload::Text,
    }
}

#[tokio::test]
async fn direct_room_has_exactly_two_participants() {
    let ctx = context();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    let room = ctx.service.create_room(direct_request(a, b)).await.unwrap();
    assert_eq!(room.kind, RoomKind::Direct);

    let members = ctx.store.list_members(room.id)
        .await
        .unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn direct_room_rejects_third_participant() {
    let ctx = context();
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let room = ctx.service.create_room(direct_request(a, b)).await.unwrap();

    let result = ctx
        .service
        .add_participant(AddParticipantRequest {
            room_id: Uuid::from(room.id),
            actor_id: a,
            user_id: c,
            role: ParticipantRole::Member,
        })
        .await;

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::InvalidArgument { .. }))
    ));
    let members = ctx.store.list_members(room.id).await.unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn direct_room_creation_is_deduplicated() {
    let ctx = context();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    let first = ctx.service.create_room(direct_request(a, b)).await.unwrap();
    // 对调发起方也命中同一个房间
    let second = ctx.service.create_room(direct_request(b, a)).await.unwrap();
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn direct_room_requires_exactly_one_other() {
    let ctx = context();
    let a = Uuid::new_v4();

    let result = ctx
        .service
        .create_room(CreateRoomRequest {
            kind: RoomKind::Direct,
            initiator_id: a,
            participant_ids: vec![],
            name: None,
            settings: None,
        })
        .await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::InvalidArgument { .. }))
    ));

    // 自己和自己不算一对
    let result = ctx
        .service
        .create_room(direct_request(a, a))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn group_room_requires_name() {
    let ctx = context();
    let result = ctx
        .service
        .create_room(CreateRoomRequest {
            kind: RoomKind::Group,
            initiator_id: Uuid::new_v4(),
            participant_ids: vec![Uuid::new_v4()],
            name: None,
            settings: None,
        })
        .await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::InvalidArgument { .. }))
    ));
}

#[tokio::test]
async fn sequential_appends_preserve_call_order_and_activity() {
    let ctx = context();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let room = ctx.service.create_room(direct_request(a, b)).await.unwrap();
    let room_id = Uuid::from(room.id);

    for i in 0..5 {
        ctx.clock.advance(Duration::milliseconds(10));
        ctx.service
            .send_message(text_message(room_id, a, &format!("m{}", i)))
            .await
            .unwrap();
    }

    let log = ctx.store.list_for_room(room.id).await.unwrap();
    let contents: Vec<&str> = log.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["m0", "m1", "m2", "m3", "m4"]);

    let stored_room = ctx.store.find_by_id(room.id).await.unwrap().unwrap();
    assert_eq!(stored_room.last_activity_at, log.last().unwrap().created_at);
}

#[tokio::test]
async fn concurrent_appends_lose_nothing_and_keep_stable_order() {
    let ctx = context();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let room = ctx.service.create_room(direct_request(a, b)).await.unwrap();
    let room_id = Uuid::from(room.id);

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let service = ctx.service.clone();
            tokio::spawn(async move {
                service
                    .send_message(text_message(room_id, a, &format!("c{}", i)))
                    .await
                    .unwrap()
            })
        })
        .collect();
    futures::future::join_all(tasks).await;

    let first_read = ctx.store.list_for_room(room.id).await.unwrap();
    let second_read = ctx.store.list_for_room(room.id).await.unwrap();
    assert_eq!(first_read.len(), 20);
    // 两次读取之间顺序不会漂移
    let ids_a: Vec<_> = first_read.iter().map(|m| m.id).collect();
    let ids_b: Vec<_> = second_read.iter().map(|m| m.id).collect();
    assert_eq!(ids_a, ids_b);

    let stored_room = ctx.store.find_by_id(room.id).await.unwrap().unwrap();
    assert_eq!(
        stored_room.last_activity_at,
        first_read.iter().map(|m| m.created_at).max().unwrap()
    );
}

#[tokio::test]
async fn only_sender_may_edit_or_delete() {
    let ctx = context();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let room = ctx.service.create_room(direct_request(a, b)).await.unwrap();
    let room_id = Uuid::from(room.id);

    let message = ctx
        .service
        .send_message(text_message(room_id, a, "mine"))
        .await
        .unwrap();
    let message_id = Uuid::from(message.id);

    let edit = ctx
        .service
        .edit_message(EditMessageRequest {
            room_id,
            message_id,
            editor_id: b,
            content: "hijacked".to_owned(),
        })
        .await;
    assert!(matches!(
        edit,
        Err(ApplicationError::Domain(DomainError::NotMessageSender))
    ));

    let delete = ctx
        .service
        .delete_message(DeleteMessageRequest {
            room_id,
            message_id,
            requester_id: b,
        })
        .await;
    assert!(matches!(
        delete,
        Err(ApplicationError::Domain(DomainError::NotMessageSender))
    ));

    // 消息保持原样
    let stored = ctx
        .store
        .find_message(room.id, message.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.content.as_str(), "mine");
    assert!(stored.is_visible());
}

#[tokio::test]
async fn soft_deleted_messages_are_filtered_from_reads() {
    let ctx = context();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let room = ctx.service.create_room(direct_request(a, b)).await.unwrap();
    let room_id = Uuid::from(room.id);

    let mut sent = Vec::new();
    for i in 0..3 {
        ctx.clock.advance(Duration::milliseconds(10));
        sent.push(
            ctx.service
                .send_message(text_message(room_id, a, &format!("m{}", i)))
                .await
                .unwrap(),
        );
    }

    ctx.service
        .delete_message(DeleteMessageRequest {
            room_id,
            message_id: Uuid::from(sent[1].id),
            requester_id: a,
        })
        .await
        .unwrap();

    let detail = ctx.service.get_room(room_id, a).await.unwrap();
    let contents: Vec<&str> = detail.messages.iter().map(|m| m.content.as_str()).collect();
    // 剩余两条保持原有相对顺序
    assert_eq!(contents, vec!["m0", "m2"]);
}

#[tokio::test]
async fn unread_count_follows_watermark() {
    let ctx = context();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let room = ctx.service.create_room(direct_request(a, b)).await.unwrap();
    let room_id = Uuid::from(room.id);

    // A 发一条，B 读到未读 1；A 自己未读 0
    ctx.clock.advance(Duration::seconds(1));
    ctx.service
        .send_message(text_message(room_id, a, "hi"))
        .await
        .unwrap();

    let b_detail = ctx.service.get_room(room_id, b).await.unwrap();
    assert_eq!(b_detail.messages.len(), 1);
    assert_eq!(b_detail.unread_count, 1);

    let a_rooms = ctx.service.list_rooms(a).await.unwrap();
    assert_eq!(a_rooms[0].unread_count, 0);

    // 显式标记已读后归零
    ctx.clock.advance(Duration::seconds(1));
    ctx.service.mark_as_read(room_id, b).await.unwrap();
    let b_rooms = ctx.service.list_rooms(b).await.unwrap();
    assert_eq!(b_rooms[0].unread_count, 0);

    // 此后的新消息重新计入
    ctx.clock.advance(Duration::seconds(1));
    ctx.service
        .send_message(text_message(room_id, a, "again"))
        .await
        .unwrap();
    let b_rooms = ctx.service.list_rooms(b).await.unwrap();
    assert_eq!(b_rooms[0].unread_count, 1);
}

#[tokio::test]
async fn mark_as_read_is_noop_for_non_participants() {
    let ctx = context();
    let (a, b, stranger) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let room = ctx.service.create_room(direct_request(a, b)).await.unwrap();

    assert!(ctx
        .service
        .mark_as_read(Uuid::from(room.id), stranger)
        .await
        .is_ok());
    let members = ctx.store.list_members(room.id).await.unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn non_participant_cannot_send() {
    let ctx = context();
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let room = ctx.service.create_room(direct_request(a, b)).await.unwrap();
    let room_id = Uuid::from(room.id);

    let result = ctx
        .service
        .send_message(text_message(room_id, c, "let me in"))
        .await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::NotParticipant))
    ));

    let log = ctx.store.list_for_room(room.id).await.unwrap();
    assert!(log.is_empty());
}

#[tokio::test]
async fn blog_share_survives_failed_lookup() {
    // 目录查不到：消息仍然追加，摘要缺失
    let ctx = context_with_blog(Ok(None));
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let room = ctx.service.create_room(direct_request(a, b)).await.unwrap();

    let message = ctx
        .service
        .send_message(SendMessageRequest {
            room_id: Uuid::from(room.id),
            sender_id: a,
            content: "worth a read".to_owned(),
            payload: MessagePayload::Blog {
                blog_id: Uuid::new_v4(),
            },
        })
        .await
        .unwrap();

    match &message.kind {
        MessageKind::Blog(share) => assert!(share.card.is_none()),
        other => panic!("expected blog message, got {:?}", other),
    }
}

#[tokio::test]
async fn blog_share_survives_directory_outage() {
    let ctx = context_with_blog(Err(DirectoryError::unavailable("blog service down")));
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let room = ctx.service.create_room(direct_request(a, b)).await.unwrap();

    let message = ctx
        .service
        .send_message(SendMessageRequest {
            room_id: Uuid::from(room.id),
            sender_id: a,
            content: "worth a read".to_owned(),
            payload: MessagePayload::Blog {
                blog_id: Uuid::new_v4(),
            },
        })
        .await
        .unwrap();

    assert!(matches!(
        &message.kind,
        MessageKind::Blog(share) if share.card.is_none()
    ));
}

#[tokio::test]
async fn blog_share_caches_card_on_success() {
    let ctx = context();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let room = ctx.service.create_room(direct_request(a, b)).await.unwrap();

    let message = ctx
        .service
        .send_message(SendMessageRequest {
            room_id: Uuid::from(room.id),
            sender_id: a,
            content: "worth a read".to_owned(),
            payload: MessagePayload::Blog {
                blog_id: Uuid::new_v4(),
            },
        })
        .await
        .unwrap();

    match &message.kind {
        MessageKind::Blog(share) => {
            let card = share.card.as_ref().expect("card should be cached");
            assert_eq!(card.title, "Borrow Checker Notes");
        }
        other => panic!("expected blog message, got {:?}", other),
    }
}

#[tokio::test]
async fn reactions_are_last_write_wins_at_service_level() {
    let ctx = context();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let room = ctx.service.create_room(direct_request(a, b)).await.unwrap();
    let room_id = Uuid::from(room.id);

    let message = ctx
        .service
        .send_message(text_message(room_id, a, "react to me"))
        .await
        .unwrap();
    let message_id = Uuid::from(message.id);

    ctx.service
        .react_to_message(ReactRequest {
            room_id,
            message_id,
            user_id: b,
            emoji: "👍".to_owned(),
        })
        .await
        .unwrap();
    let updated = ctx
        .service
        .react_to_message(ReactRequest {
            room_id,
            message_id,
            user_id: b,
            emoji: "❤️".to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(updated.reactions.len(), 1);
    assert_eq!(updated.reactions[0].emoji, "❤️");

    let cleared = ctx
        .service
        .remove_reaction(room_id, message_id, b)
        .await
        .unwrap();
    assert!(cleared.reactions.is_empty());
}

#[tokio::test]
async fn member_cannot_remove_others_but_may_leave() {
    let ctx = context();
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let room = ctx
        .service
        .create_room(CreateRoomRequest {
            kind: RoomKind::Group,
            initiator_id: a,
            participant_ids: vec![b, c],
            name: Some("team".to_owned()),
            settings: None,
        })
        .await
        .unwrap();
    let room_id = Uuid::from(room.id);

    // 普通成员踢人被拒
    let result = ctx
        .service
        .remove_participant(RemoveParticipantRequest {
            room_id,
            actor_id: b,
            user_id: c,
        })
        .await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::InsufficientRole))
    ));

    // 自助退出不受角色限制
    ctx.service
        .remove_participant(RemoveParticipantRequest {
            room_id,
            actor_id: b,
            user_id: b,
        })
        .await
        .unwrap();

    let members = ctx.store.list_members(room.id).await.unwrap();
    assert_eq!(members.len(), 2);
    // 清空成员也不会自动停用房间
    let stored_room = ctx.store.find_by_id(room.id).await.unwrap().unwrap();
    assert!(stored_room.is_active);
}

#[tokio::test]
async fn add_participant_is_noop_when_already_present() {
    let ctx = context();
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let room = ctx
        .service
        .create_room(CreateRoomRequest {
            kind: RoomKind::Group,
            initiator_id: a,
            participant_ids: vec![b, c],
            name: Some("team".to_owned()),
            settings: None,
        })
        .await
        .unwrap();

    let existing = ctx
        .service
        .add_participant(AddParticipantRequest {
            room_id: Uuid::from(room.id),
            actor_id: a,
            user_id: b,
            role: ParticipantRole::Moderator,
        })
        .await
        .unwrap();

    // 返回现有记录，角色不被改写
    assert_eq!(existing.role, ParticipantRole::Member);
    let members = ctx.store.list_members(room.id).await.unwrap();
    assert_eq!(members.len(), 3);
}

#[tokio::test]
async fn deactivated_room_is_unreachable() {
    let ctx = context();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let room = ctx.service.create_room(direct_request(a, b)).await.unwrap();
    let room_id = Uuid::from(room.id);

    // 普通成员不能停用
    let result = ctx.service.deactivate_room(room_id, b).await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::InsufficientRole))
    ));

    ctx.service.deactivate_room(room_id, a).await.unwrap();

    // 停用后对外等同不存在，房间本身仍保留在存储中
    let result = ctx.service.get_room(room_id, a).await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::RoomInactive))
    ));
    let stored = ctx.store.find_by_id(room.id).await.unwrap().unwrap();
    assert!(!stored.is_active);

    // 列表里也不再出现
    let rooms = ctx.service.list_rooms(a).await.unwrap();
    assert!(rooms.is_empty());
}

#[tokio::test]
async fn content_length_is_enforced() {
    let ctx = context();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let room = ctx.service.create_room(direct_request(a, b)).await.unwrap();

    let result = ctx
        .service
        .send_message(text_message(Uuid::from(room.id), a, &"x".repeat(2001)))
        .await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::InvalidArgument { .. }))
    ));
}
