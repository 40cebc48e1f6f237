//! Session Registry - 进程级语音会话注册表
//!
//! 每个 guild 至多一个会话；这是核心唯一的全局共享可变结构。
//! 频道迁移通过整体替换存储的会话值（compare-and-swap）完成，
//! 与并发 leave 的竞争失败重试一次后以 ConcurrencyConflict 上报。

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::application::commands::{JoinOutcome, LeaveOutcome};
use crate::application::error::JoinError;
use crate::application::ports::{
    AudioSink, OutputStreamSpec, VoiceConnection, VoiceTransportPort,
};
use crate::domain::playback::{ChannelId, ConnectionState, GuildId};
use crate::infrastructure::memory::PlaybackQueue;

/// 每 guild 会话聚合
///
/// 重连时整体替换：新连接、清空的输出设备槽、原队列
pub struct VoiceSession {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub connection: Arc<dyn VoiceConnection>,
    pub output_spec: OutputStreamSpec,
    /// 输出设备，按连接惰性创建一次，本会话独占
    pub output: Mutex<Option<Box<dyn AudioSink>>>,
    pub queue: Arc<PlaybackQueue>,
}

impl VoiceSession {
    /// 当前连接状态
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }
}

/// 会话注册表
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<VoiceSession>>,
    transport: Arc<dyn VoiceTransportPort>,
    output_spec: OutputStreamSpec,
}

/// CAS 失败后的重试次数上限
const SWAP_ATTEMPTS: usize = 2;

impl SessionRegistry {
    pub fn new(transport: Arc<dyn VoiceTransportPort>, output_spec: OutputStreamSpec) -> Self {
        Self {
            sessions: DashMap::new(),
            transport,
            output_spec,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 获取 guild 的会话
    pub fn get(&self, guild_id: GuildId) -> Option<Arc<VoiceSession>> {
        self.sessions.get(&guild_id).map(|entry| entry.value().clone())
    }

    /// 当前注册的会话数
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// 加入或迁移到语音频道
    ///
    /// - 无会话: 连接并注册
    /// - 已连接到同一频道: 不做任何事，返回 AlreadyConnected
    /// - 其他情况: 重连，整体替换存储的会话（新连接 + 空输出槽 + 原队列）
    pub async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<JoinOutcome, JoinError> {
        for attempt in 0..SWAP_ATTEMPTS {
            let existing = self.sessions.get(&guild_id).map(|entry| entry.value().clone());

            if let Some(session) = &existing {
                if session.channel_id == channel_id
                    && session.connection.state() == ConnectionState::Connected
                {
                    tracing::debug!(
                        guild_id = %guild_id,
                        channel_id = %channel_id,
                        "Already connected to requested channel"
                    );
                    return Ok(JoinOutcome::AlreadyConnected);
                }
            }

            // 连接失败只影响这一次 join，不留下半成品会话
            let connection = self.transport.connect(guild_id, channel_id).await?;

            let queue = match &existing {
                Some(session) => session.queue.clone(),
                None => PlaybackQueue::new(guild_id).arc(),
            };

            let replacement = Arc::new(VoiceSession {
                guild_id,
                channel_id,
                connection,
                output_spec: self.output_spec.clone(),
                output: Mutex::new(None),
                queue,
            });

            // 对存储值做比较并交换；分片锁不跨 await 持有
            let (installed, displaced) = match self.sessions.entry(guild_id) {
                Entry::Occupied(mut slot) => match &existing {
                    Some(previous) if Arc::ptr_eq(slot.get(), previous) => {
                        let old = slot.insert(replacement.clone());
                        (true, Some(old))
                    }
                    _ => (false, None),
                },
                Entry::Vacant(slot) => {
                    if existing.is_some() {
                        // 观察到的会话已被并发 leave 移除，其队列已关闭，不能再挂载
                        (false, None)
                    } else {
                        slot.insert(replacement.clone());
                        (true, None)
                    }
                }
            };

            if installed {
                if let Some(old) = displaced {
                    old.connection.dispose().await;
                    tracing::info!(
                        guild_id = %guild_id,
                        from_channel = %old.channel_id,
                        to_channel = %channel_id,
                        "Voice session moved"
                    );
                } else {
                    tracing::info!(
                        guild_id = %guild_id,
                        channel_id = %channel_id,
                        "Voice session joined"
                    );
                }
                return Ok(JoinOutcome::Joined);
            }

            // 落败方释放自己刚建的连接后重试
            replacement.connection.dispose().await;
            tracing::debug!(
                guild_id = %guild_id,
                attempt = attempt,
                "Session swap lost the race, retrying"
            );
        }

        Err(JoinError::ConcurrencyConflict { guild_id })
    }

    /// 离开语音频道（幂等）
    ///
    /// 关闭队列（终止其 drain 任务）并释放连接
    pub async fn leave(&self, guild_id: GuildId) -> LeaveOutcome {
        match self.sessions.remove(&guild_id) {
            Some((_, session)) => {
                session.queue.close().await;
                session.connection.dispose().await;
                tracing::info!(guild_id = %guild_id, "Voice session left");
                LeaveOutcome::Left
            }
            None => LeaveOutcome::NotJoined,
        }
    }
}
