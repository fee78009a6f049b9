//! HTTP / WebSocket 传输层
//!
//! 对外暴露聊天服务的请求响应接口与实时通道。
//! 调用者身份（user_id/sender_id）由上游网关预认证后随请求传入。

pub mod error;
pub mod routes;
pub mod state;
pub mod ws;

pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
