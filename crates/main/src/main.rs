//! 主应用程序入口
//!
//! 组装存储、目录、广播器与聊天服务，启动 Axum Web API。

use std::sync::Arc;

use application::{
    repository::{ChatRoomRepository, MessageRepository, ParticipantRepository},
    services::{ChatService, ChatServiceDependencies},
    Clock, LocalRoomBroadcaster, RoomBroadcaster, SystemClock,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, run_relay, InMemoryBlogDirectory, InMemoryUserDirectory, MemoryStore,
    PgStorage, RedisRoomBroadcaster,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env();
    config.validate()?;

    let local_broadcaster = Arc::new(LocalRoomBroadcaster::new(config.broadcast.capacity));

    // 配置了 Redis 时事件统一走频道扇出：本实例发布的事件
    // 也经中继回注本地广播器，保证每实例恰好投递一次
    let broadcaster: Arc<dyn RoomBroadcaster> = match &config.broadcast.redis_url {
        Some(redis_url) => {
            let remote = RedisRoomBroadcaster::connect(
                redis_url,
                config.broadcast.redis_channel.clone(),
            )
            .await?;

            let relay_url = redis_url.clone();
            let relay_channel = config.broadcast.redis_channel.clone();
            let relay_local = local_broadcaster.as_ref().clone();
            tokio::spawn(async move {
                if let Err(err) = run_relay(&relay_url, &relay_channel, relay_local).await {
                    tracing::error!(error = %err, "redis relay stopped");
                }
            });

            Arc::new(remote)
        }
        None => local_broadcaster.clone() as Arc<dyn RoomBroadcaster>,
    };

    // 配置了 DATABASE_URL 走 PostgreSQL，否则退回内存存储
    let (room_repository, participant_repository, message_repository): (
        Arc<dyn ChatRoomRepository>,
        Arc<dyn ParticipantRepository>,
        Arc<dyn MessageRepository>,
    ) = match &config.database.url {
        Some(url) => {
            tracing::info!(
                "connecting database: {}",
                url.split('@').next_back().unwrap_or("unknown")
            );
            let pool = create_pg_pool(url, config.database.max_connections).await?;
            sqlx::migrate!("../../migrations").run(&pool).await?;

            let storage = PgStorage::new(pool);
            (
                Arc::new(storage.clone()),
                Arc::new(storage.clone()),
                Arc::new(storage),
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, falling back to in-memory store");
            let store = MemoryStore::new();
            (
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                Arc::new(store),
            )
        }
    };

    // 用户与博客目录：单实例用内存适配器，接入真实子系统时替换
    let user_directory = Arc::new(InMemoryUserDirectory::new());
    let blog_directory = Arc::new(InMemoryBlogDirectory::new());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let chat_service = ChatService::new(ChatServiceDependencies {
        room_repository,
        participant_repository,
        message_repository,
        user_directory,
        blog_directory,
        clock,
        broadcaster,
    });

    let state = AppState::new(Arc::new(chat_service), local_broadcaster);
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("chat server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
