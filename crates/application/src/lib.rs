//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，处理输入校验、访问控制、
//! 以及对外部协作方（用户/博客目录、消息广播、存储）的抽象。

pub mod access;
pub mod broadcaster;
pub mod clock;
pub mod directory;
pub mod dto;
pub mod error;
pub mod local_broadcast;
pub mod repository;
pub mod services;

pub use broadcaster::{BroadcastError, RoomBroadcaster, RoomEvent, RoomEventPayload};
pub use clock::{Clock, SystemClock};
pub use directory::{BlogDirectory, DirectoryError, UserDirectory, UserProfile};
pub use dto::{MessageDto, MessagePreviewDto, ParticipantDto, RoomDetailDto, RoomSummaryDto};
pub use error::ApplicationError;
pub use local_broadcast::{LocalRoomBroadcaster, RoomEventStream};
pub use repository::{ChatRoomRepository, MessageRepository, ParticipantRepository};
pub use services::{ChatService, ChatServiceDependencies};
