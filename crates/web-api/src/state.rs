use std::sync::Arc;

use application::{ChatService, LocalRoomBroadcaster};

#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ChatService>,
    /// WebSocket 端订阅事件用的本地广播器
    pub broadcaster: Arc<LocalRoomBroadcaster>,
}

impl AppState {
    pub fn new(chat_service: Arc<ChatService>, broadcaster: Arc<LocalRoomBroadcaster>) -> Self {
        Self {
            chat_service,
            broadcaster,
        }
    }
}
