use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::services::{
    AddParticipantRequest, CreateRoomRequest, DeleteMessageRequest, EditMessageRequest,
    MessagePayload, ReactRequest, RemoveParticipantRequest, SendMessageRequest,
};
use application::{MessageDto, RoomDetailDto, RoomSummaryDto, UserProfile};
use domain::{ChatRoom, Participant, ParticipantRole, RoomKind, RoomSettings};

use crate::{error::ApiError, state::AppState, ws};

#[derive(Debug, Deserialize)]
struct CreateRoomPayload {
    initiator_id: Uuid,
    kind: RoomKind,
    participants: Vec<Uuid>,
    name: Option<String>,
    settings: Option<RoomSettings>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendMessagePayload {
    pub sender_id: Uuid,
    pub content: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    pub media_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub blog_id: Option<Uuid>,
}

fn default_kind() -> String {
    "text".to_owned()
}

/// 消息类型按字符串接收再手工校验，未知类型返回 VALIDATION_ERROR
/// 而不是反序列化失败。
pub(crate) fn resolve_payload(payload: &SendMessagePayload) -> Result<MessagePayload, ApiError> {
    match payload.kind.as_str() {
        "text" => Ok(MessagePayload::Text),
        "image" | "file" => {
            let url = payload
                .media_url
                .clone()
                .ok_or_else(|| ApiError::validation("media_url is required for media messages"))?;
            let filename = payload.file_name.clone();
            let size = payload.file_size;
            if payload.kind == "image" {
                Ok(MessagePayload::Image { url, filename, size })
            } else {
                Ok(MessagePayload::File { url, filename, size })
            }
        }
        "blog" => {
            let blog_id = payload
                .blog_id
                .ok_or_else(|| ApiError::validation("blog_id is required for blog messages"))?;
            Ok(MessagePayload::Blog { blog_id })
        }
        other => Err(ApiError::validation(format!(
            "unknown message kind: {}",
            other
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    user_id: Uuid,
    q: String,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EditMessagePayload {
    editor_id: Uuid,
    content: String,
}

#[derive(Debug, Deserialize)]
struct DeleteMessagePayload {
    requester_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct AddParticipantPayload {
    actor_id: Uuid,
    user_id: Uuid,
    role: Option<ParticipantRole>,
}

#[derive(Debug, Deserialize)]
struct ActorPayload {
    actor_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ReactPayload {
    user_id: Uuid,
    emoji: String,
}

#[derive(Debug, Deserialize)]
struct UnreactPayload {
    user_id: Uuid,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/chat", chat_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(list_rooms).post(create_room))
        .route(
            "/rooms/{room_id}",
            get(get_room).delete(deactivate_room),
        )
        .route("/rooms/{room_id}/read", post(mark_as_read))
        .route(
            "/rooms/{room_id}/messages",
            post(send_message),
        )
        .route(
            "/rooms/{room_id}/messages/{message_id}",
            put(edit_message).delete(delete_message),
        )
        .route(
            "/rooms/{room_id}/messages/{message_id}/reactions",
            post(react).delete(unreact),
        )
        .route("/rooms/{room_id}/participants", post(add_participant))
        .route(
            "/rooms/{room_id}/participants/{user_id}",
            axum::routing::delete(remove_participant),
        )
        .route("/search", get(search_users))
        .route("/ws", get(ws::websocket_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<RoomSummaryDto>>, ApiError> {
    let rooms = state.chat_service.list_rooms(query.user_id).await?;
    Ok(Json(rooms))
}

async fn create_room(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoomPayload>,
) -> Result<(StatusCode, Json<ChatRoom>), ApiError> {
    let room = state
        .chat_service
        .create_room(CreateRoomRequest {
            kind: payload.kind,
            initiator_id: payload.initiator_id,
            participant_ids: payload.participants,
            name: payload.name,
            settings: payload.settings,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(room)))
}

async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<Json<RoomDetailDto>, ApiError> {
    let detail = state.chat_service.get_room(room_id, query.user_id).await?;
    Ok(Json(detail))
}

async fn deactivate_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<ActorPayload>,
) -> Result<StatusCode, ApiError> {
    state
        .chat_service
        .deactivate_room(room_id, payload.actor_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_as_read(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<UserQuery>,
) -> Result<StatusCode, ApiError> {
    state
        .chat_service
        .mark_as_read(room_id, payload.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn send_message(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let message_payload = resolve_payload(&payload)?;
    let message = state
        .chat_service
        .send_message(SendMessageRequest {
            room_id,
            sender_id: payload.sender_id,
            content: payload.content,
            payload: message_payload,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(MessageDto::from(&message))))
}

async fn edit_message(
    State(state): State<AppState>,
    Path((room_id, message_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<EditMessagePayload>,
) -> Result<Json<MessageDto>, ApiError> {
    let message = state
        .chat_service
        .edit_message(EditMessageRequest {
            room_id,
            message_id,
            editor_id: payload.editor_id,
            content: payload.content,
        })
        .await?;

    Ok(Json(MessageDto::from(&message)))
}

async fn delete_message(
    State(state): State<AppState>,
    Path((room_id, message_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<DeleteMessagePayload>,
) -> Result<StatusCode, ApiError> {
    state
        .chat_service
        .delete_message(DeleteMessageRequest {
            room_id,
            message_id,
            requester_id: payload.requester_id,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn react(
    State(state): State<AppState>,
    Path((room_id, message_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ReactPayload>,
) -> Result<Json<MessageDto>, ApiError> {
    let message = state
        .chat_service
        .react_to_message(ReactRequest {
            room_id,
            message_id,
            user_id: payload.user_id,
            emoji: payload.emoji,
        })
        .await?;

    Ok(Json(MessageDto::from(&message)))
}

async fn unreact(
    State(state): State<AppState>,
    Path((room_id, message_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UnreactPayload>,
) -> Result<Json<MessageDto>, ApiError> {
    let message = state
        .chat_service
        .remove_reaction(room_id, message_id, payload.user_id)
        .await?;

    Ok(Json(MessageDto::from(&message)))
}

async fn add_participant(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<AddParticipantPayload>,
) -> Result<Json<Participant>, ApiError> {
    let participant = state
        .chat_service
        .add_participant(AddParticipantRequest {
            room_id,
            actor_id: payload.actor_id,
            user_id: payload.user_id,
            role: payload.role.unwrap_or(ParticipantRole::Member),
        })
        .await?;

    Ok(Json(participant))
}

async fn remove_participant(
    State(state): State<AppState>,
    Path((room_id, user_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ActorPayload>,
) -> Result<StatusCode, ApiError> {
    state
        .chat_service
        .remove_participant(RemoveParticipantRequest {
            room_id,
            actor_id: payload.actor_id,
            user_id,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let limit = query.limit.unwrap_or(10).min(50);
    let users = state
        .chat_service
        .search_users(query.user_id, &query.q, limit)
        .await?;

    Ok(Json(users))
}
