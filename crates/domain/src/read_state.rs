//! 未读数派生
//!
//! 未读数在读取时重新计算而不是增量维护；消息日志由 API 边界分页约束，
//! 线性扫描足够。

use crate::message::Message;
use crate::participant::Participant;

/// 某成员在房间内的未读消息数：
/// 他人发送、未删除、且晚于该成员已读水位的消息。
pub fn unread_count(messages: &[Message], participant: &Participant) -> usize {
    messages
        .iter()
        .filter(|m| {
            m.sender_id != participant.user_id
                && m.is_visible()
                && m.created_at > participant.last_seen_at
        })
        .count()
}
