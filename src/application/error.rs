//! 应用层错误定义

use thiserror::Error;

use crate::application::ports::ConnectionError;
use crate::domain::playback::GuildId;

/// join 请求错误
///
/// 连接建立失败只影响触发它的那一次 join；
/// 频道迁移的 CAS 连续两次失败后以 ConcurrencyConflict 上报
#[derive(Debug, Error)]
pub enum JoinError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Concurrent session update lost the race for guild {guild_id}")]
    ConcurrencyConflict { guild_id: GuildId },
}
