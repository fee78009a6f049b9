//! Redis 事件中继
//!
//! 多实例部署时把房间事件发布到 Redis 频道，其他实例订阅后
//! 注入各自的本地广播器。事件是建议性的，中继失败只记日志。

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;

use application::{
    broadcaster::{BroadcastError, RoomBroadcaster, RoomEvent},
    LocalRoomBroadcaster,
};

/// 把事件发布到 Redis 频道的广播器。
/// 本地投递由 `run_relay` 回注完成，发布方不直接写内存通道。
#[derive(Clone)]
pub struct RedisRoomBroadcaster {
    connection: redis::aio::ConnectionManager,
    channel: String,
}

impl RedisRoomBroadcaster {
    pub async fn connect(url: &str, channel: impl Into<String>) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_connection_manager().await?;
        Ok(Self {
            connection,
            channel: channel.into(),
        })
    }
}

#[async_trait]
impl RoomBroadcaster for RedisRoomBroadcaster {
    async fn publish(&self, event: RoomEvent) -> Result<(), BroadcastError> {
        let payload = serde_json::to_string(&event)
            .map_err(|err| BroadcastError::failed(err.to_string()))?;
        let mut connection = self.connection.clone();
        connection
            .publish::<_, _, ()>(&self.channel, payload)
            .await
            .map_err(|err| BroadcastError::failed(err.to_string()))?;
        Ok(())
    }
}

/// 订阅 Redis 频道并把事件注入本地广播器。
/// 本实例发布的事件同样经由频道回注，每个实例恰好投递一次。
/// 作为后台任务运行；连接断开时返回错误交由调用方决定是否重启。
pub async fn run_relay(
    url: &str,
    channel: &str,
    local: LocalRoomBroadcaster,
) -> Result<(), redis::RedisError> {
    let client = redis::Client::open(url)?;
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;
    tracing::info!(channel, "redis relay subscribed");

    let mut stream = pubsub.on_message();
    while let Some(message) = stream.next().await {
        let payload: String = match message.get_payload() {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "unreadable relay payload, skipping");
                continue;
            }
        };
        match serde_json::from_str::<RoomEvent>(&payload) {
            Ok(event) => {
                // 本地没有订阅者时 publish 也是 Ok
                let _ = local.publish(event).await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "malformed relay event, skipping");
            }
        }
    }

    Ok(())
}
