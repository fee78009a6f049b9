// 单实例进程内广播器
use async_trait::async_trait;
use domain::RoomId;
use tokio::sync::broadcast;

use crate::broadcaster::{BroadcastError, RoomBroadcaster, RoomEvent};

#[derive(Clone)]
pub struct LocalRoomBroadcaster {
    sender: broadcast::Sender<RoomEvent>,
}

impl LocalRoomBroadcaster {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.sender.subscribe()
    }

    /// 将一路订阅收窄到单个房间。
    pub fn subscribe_room(&self, room_id: RoomId) -> RoomEventStream {
        RoomEventStream::new(self.sender.subscribe(), room_id)
    }
}

impl Default for LocalRoomBroadcaster {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl RoomBroadcaster for LocalRoomBroadcaster {
    async fn publish(&self, event: RoomEvent) -> Result<(), BroadcastError> {
        // 没有活跃订阅者时 send 返回 Err，这不是投递失败
        let _ = self.sender.send(event);
        Ok(())
    }
}

/// 过滤出单个房间事件的消息流
pub struct RoomEventStream {
    receiver: broadcast::Receiver<RoomEvent>,
    room_id: RoomId,
}

impl RoomEventStream {
    pub fn new(receiver: broadcast::Receiver<RoomEvent>, room_id: RoomId) -> Self {
        Self { receiver, room_id }
    }

    /// 下一条属于该房间的事件；通道关闭时返回 None。
    /// 落后于通道容量的接收端会丢失事件（Lagged），继续接收后续事件。
    pub async fn recv(&mut self) -> Option<RoomEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if event.room_id == self.room_id {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
