//! Voice Query Handlers

use std::sync::Arc;

use crate::application::queries::GetSessionStatusQuery;
use crate::domain::playback::{ChannelId, GuildId};
use crate::infrastructure::memory::SessionRegistry;

/// 会话状态响应
#[derive(Debug, Clone)]
pub struct SessionStatusResponse {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub connection_state: String,
    /// 排队条目数（不含正在播放的条目）
    pub queued_items: usize,
    pub drain_active: bool,
}

/// GetSessionStatus Handler
pub struct GetSessionStatusHandler {
    registry: Arc<SessionRegistry>,
}

impl GetSessionStatusHandler {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, query: GetSessionStatusQuery) -> Option<SessionStatusResponse> {
        let session = self.registry.get(query.guild_id)?;

        Some(SessionStatusResponse {
            guild_id: session.guild_id,
            channel_id: session.channel_id,
            connection_state: session.state().as_str().to_string(),
            queued_items: session.queue.len().await,
            drain_active: session.queue.is_draining(),
        })
    }
}
