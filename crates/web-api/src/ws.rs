//! WebSocket 实时通道
//!
//! 每个连接维护自己的订阅房间集合（subscribe/unsubscribe 幂等）。
//! 事件至多一次、尽力投递；断线重连后不补发，持久历史只能
//! 通过房间读取接口取回。

use std::collections::HashSet;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use application::{services::SendMessageRequest, RoomBroadcaster, RoomEvent, RoomEventPayload};
use domain::{RoomId, UserId};

use crate::{
    error::ApiError,
    routes::{resolve_payload, SendMessagePayload},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// 上游网关预认证后的用户身份
    user_id: Uuid,
}

/// 客户端帧
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    Subscribe {
        room_id: Uuid,
    },
    Unsubscribe {
        room_id: Uuid,
    },
    Send {
        room_id: Uuid,
        content: String,
        #[serde(default)]
        kind: Option<String>,
        media_url: Option<String>,
        file_name: Option<String>,
        file_size: Option<u64>,
        blog_id: Option<Uuid>,
    },
    Typing {
        room_id: Uuid,
        is_typing: bool,
    },
}

/// 服务端推送的非事件帧
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerFrame {
    Error { code: String, message: String },
}

impl ServerFrame {
    fn from_api_error(error: ApiError) -> Self {
        Self::Error {
            code: error.code().to_owned(),
            message: error.message().to_owned(),
        }
    }
}

pub async fn websocket_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, UserId::from(query.user_id)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: UserId) {
    let mut events = state.broadcaster.subscribe();
    let (mut sender, mut incoming) = socket.split();
    let mut subscriptions: HashSet<RoomId> = HashSet::new();

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // 落后的订阅者丢失事件，不补发
                        tracing::debug!(user_id = %user_id, skipped, "websocket subscriber lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if !subscriptions.contains(&event.room_id) {
                    continue;
                }
                // 自己的输入提示不回显
                if matches!(
                    &event.payload,
                    RoomEventPayload::TypingIndicator { user_id: typist, .. } if *typist == user_id
                ) {
                    continue;
                }
                let payload = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to serialize websocket payload");
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            message = incoming.next() => {
                let Some(Ok(message)) = message else { break };
                match message {
                    WsMessage::Text(text) => {
                        let reply = match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(frame) => {
                                handle_frame(&state, &mut subscriptions, user_id, frame).await
                            }
                            Err(err) => Some(ServerFrame::Error {
                                code: "MALFORMED_FRAME".to_owned(),
                                message: err.to_string(),
                            }),
                        };
                        if let Some(reply) = reply {
                            let payload = match serde_json::to_string(&reply) {
                                Ok(json) => json,
                                Err(_) => continue,
                            };
                            if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    WsMessage::Close(_) => break,
                    // Ping/Pong 由 axum 自动应答
                    _ => {}
                }
            }
        }
    }

    tracing::debug!(user_id = %user_id, "websocket connection closed");
}

async fn handle_frame(
    state: &AppState,
    subscriptions: &mut HashSet<RoomId>,
    user_id: UserId,
    frame: ClientFrame,
) -> Option<ServerFrame> {
    match frame {
        ClientFrame::Subscribe { room_id } => {
            subscriptions.insert(RoomId::from(room_id));
            None
        }
        ClientFrame::Unsubscribe { room_id } => {
            subscriptions.remove(&RoomId::from(room_id));
            None
        }
        ClientFrame::Send {
            room_id,
            content,
            kind,
            media_url,
            file_name,
            file_size,
            blog_id,
        } => {
            let payload = SendMessagePayload {
                sender_id: Uuid::from(user_id),
                content,
                kind: kind.unwrap_or_else(|| "text".to_owned()),
                media_url,
                file_name,
                file_size,
                blog_id,
            };
            let message_payload = match resolve_payload(&payload) {
                Ok(message_payload) => message_payload,
                Err(err) => return Some(ServerFrame::from_api_error(err)),
            };
            let result = state
                .chat_service
                .send_message(SendMessageRequest {
                    room_id,
                    sender_id: payload.sender_id,
                    content: payload.content,
                    payload: message_payload,
                })
                .await;
            match result {
                // 成功时事件经广播器送达订阅者，这里不另行确认
                Ok(_) => None,
                Err(err) => Some(ServerFrame::from_api_error(ApiError::from(err))),
            }
        }
        ClientFrame::Typing { room_id, is_typing } => {
            let event = RoomEvent::typing(RoomId::from(room_id), user_id, is_typing);
            if let Err(err) = state.broadcaster.publish(event).await {
                tracing::warn!(error = %err, "typing indicator publish failed");
            }
            None
        }
    }
}
