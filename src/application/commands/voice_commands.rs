//! Voice Commands - 语音会话命令
//!
//! 命令前端消费的四个写操作；结果用命名变体表达，不用裸 Option

use crate::domain::playback::{ChannelId, GuildId, PlaybackPayload};

/// 加入（或迁移到）语音频道
#[derive(Debug, Clone)]
pub struct JoinChannelCommand {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
}

/// join 结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// 新建连接或完成频道迁移
    Joined,
    /// 已连接到目标频道，未做任何事
    AlreadyConnected,
}

/// 离开语音频道（幂等）
#[derive(Debug, Clone)]
pub struct LeaveChannelCommand {
    pub guild_id: GuildId,
}

/// leave 结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left,
    /// 本来就没有会话
    NotJoined,
}

/// 入队一个播放条目
#[derive(Debug, Clone)]
pub struct EnqueuePlaybackCommand {
    pub guild_id: GuildId,
    pub payload: PlaybackPayload,
}

/// enqueue 结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    /// 该 guild 没有会话，条目被丢弃
    NoSession,
}

/// 跳过当前播放条目
#[derive(Debug, Clone)]
pub struct SkipPlaybackCommand {
    pub guild_id: GuildId,
}

/// skip 结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipOutcome {
    /// 已取消当前条目；排队中的条目不受影响
    Skipped,
    /// 没有正在播放的条目
    NothingToSkip,
}
