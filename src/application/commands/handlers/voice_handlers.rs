//! Voice Command Handlers
//!
//! 命令前端消费的四个写操作处理器，委托给注册表 / 队列 / 播放处理器

use std::sync::Arc;

use crate::application::commands::{
    EnqueueOutcome, EnqueuePlaybackCommand, JoinChannelCommand, JoinOutcome, LeaveChannelCommand,
    LeaveOutcome, SkipOutcome, SkipPlaybackCommand,
};
use crate::application::error::JoinError;
use crate::domain::playback::QueueItem;
use crate::infrastructure::memory::SessionRegistry;
use crate::infrastructure::worker::PlaybackWorker;

/// JoinChannel Handler - 加入或迁移语音频道
pub struct JoinChannelHandler {
    registry: Arc<SessionRegistry>,
}

impl JoinChannelHandler {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, command: JoinChannelCommand) -> Result<JoinOutcome, JoinError> {
        self.registry
            .join(command.guild_id, command.channel_id)
            .await
    }
}

/// LeaveChannel Handler - 离开语音频道（幂等）
pub struct LeaveChannelHandler {
    registry: Arc<SessionRegistry>,
}

impl LeaveChannelHandler {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, command: LeaveChannelCommand) -> LeaveOutcome {
        self.registry.leave(command.guild_id).await
    }
}

/// EnqueuePlayback Handler - 入队播放条目
pub struct EnqueuePlaybackHandler {
    registry: Arc<SessionRegistry>,
    worker: Arc<PlaybackWorker>,
}

impl EnqueuePlaybackHandler {
    pub fn new(registry: Arc<SessionRegistry>, worker: Arc<PlaybackWorker>) -> Self {
        Self { registry, worker }
    }

    pub async fn handle(&self, command: EnqueuePlaybackCommand) -> EnqueueOutcome {
        let Some(session) = self.registry.get(command.guild_id) else {
            tracing::debug!(
                guild_id = %command.guild_id,
                "Enqueue without session, dropping"
            );
            return EnqueueOutcome::NoSession;
        };

        let kind = command.payload.kind();
        let item = QueueItem::new(command.guild_id, command.payload);
        let item_id = item.item_id;

        // 会话在取出后被并发 leave 关闭时，队列会拒绝条目
        if !session.queue.clone().enqueue(item, self.worker.clone()).await {
            return EnqueueOutcome::NoSession;
        }

        tracing::info!(
            guild_id = %command.guild_id,
            item_id = %item_id,
            kind = kind,
            "Playback item queued"
        );

        EnqueueOutcome::Queued
    }
}

/// SkipPlayback Handler - 跳过当前播放条目
pub struct SkipPlaybackHandler {
    registry: Arc<SessionRegistry>,
}

impl SkipPlaybackHandler {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, command: SkipPlaybackCommand) -> SkipOutcome {
        match self.registry.get(command.guild_id) {
            Some(session) => session.queue.skip().await,
            None => SkipOutcome::NothingToSkip,
        }
    }
}
