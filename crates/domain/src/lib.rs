//! 聊天室同步服务核心领域模型
//!
//! 包含房间、成员、消息等核心实体，以及已读水位的派生逻辑。

pub mod chat_room;
pub mod errors;
pub mod message;
pub mod participant;
pub mod read_state;
pub mod value_objects;

pub use chat_room::{ChatRoom, RoomKind, RoomSettings};
pub use errors::{DomainError, RepositoryError};
pub use message::{
    BlogCard, BlogShare, MediaAttachment, Message, MessageKind, MessageState, Reaction,
};
pub use participant::{Participant, ParticipantRole};
pub use read_state::unread_count;
pub use value_objects::{BlogId, MessageContent, MessageId, RoomId, Timestamp, UserId};
