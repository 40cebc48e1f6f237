//! Voice Queries - 语音会话查询

use crate::domain::playback::GuildId;

/// 查询指定 guild 的会话状态
#[derive(Debug, Clone)]
pub struct GetSessionStatusQuery {
    pub guild_id: GuildId,
}
