//! 领域错误定义
//!
//! 区分校验失败、资源缺失与权限不足三类终态错误，
//! 以及存储层的瞬时与永久失败。

use thiserror::Error;

/// 领域错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 输入校验失败
    #[error("invalid argument: {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 房间不存在
    #[error("room not found")]
    RoomNotFound,

    /// 房间已停用（对外与不存在同样处理）
    #[error("room is inactive")]
    RoomInactive,

    /// 消息不存在
    #[error("message not found")]
    MessageNotFound,

    /// 调用者不是房间成员
    #[error("user is not a participant of the room")]
    NotParticipant,

    /// 角色不满足操作要求
    #[error("insufficient role for this operation")]
    InsufficientRole,

    /// 只有发送者本人可以编辑或删除消息
    #[error("only the sender may modify this message")]
    NotMessageSender,

    /// 不符合当前状态的操作
    #[error("operation not allowed")]
    OperationNotAllowed,
}

impl DomainError {
    /// 创建校验错误
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 存储层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// 记录不存在
    #[error("record not found")]
    NotFound,

    /// 唯一性冲突
    #[error("record already exists")]
    Conflict,

    /// 瞬时失败，调用方可退避重试
    #[error("store temporarily unavailable: {message}")]
    Unavailable { message: String },

    /// 永久性存储错误
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// 是否为可重试的瞬时失败
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
