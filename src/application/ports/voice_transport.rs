//! Voice Transport Port - 语音传输层抽象
//!
//! 连接握手、加密与底层帧传输由外部传输层实现，
//! 核心只消费 connect / open_output / dispose 三个能力

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::playback::{ChannelId, ConnectionState, GuildId};

/// 连接错误
///
/// 只对触发它的那一次 join 致命
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Connection refused: {0}")]
    Refused(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Connection already closed")]
    Closed,
}

/// 输出设备错误
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Device write failed: {0}")]
    Write(String),

    #[error("Device flush failed: {0}")]
    Flush(String),
}

/// 输出流混合模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// 纯语音优化
    Voice,
    /// 音乐优化
    Music,
    /// 混合内容
    #[default]
    Mixed,
}

/// 输出流参数
#[derive(Debug, Clone)]
pub struct OutputStreamSpec {
    pub mode: OutputMode,
    /// 设备内部缓冲大小（字节）
    pub buffer_bytes: usize,
    /// 单帧时长（毫秒）
    pub frame_ms: u32,
}

impl Default for OutputStreamSpec {
    fn default() -> Self {
        Self {
            mode: OutputMode::Mixed,
            buffer_bytes: 98304,
            frame_ms: 200,
        }
    }
}

/// 可写音频设备
///
/// 由所属会话独占；flush 排空设备内部缓冲
#[async_trait]
pub trait AudioSink: Send {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), OutputError>;

    async fn flush(&mut self) -> Result<(), OutputError>;
}

/// 活动语音连接
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// 当前连接状态
    fn state(&self) -> ConnectionState;

    /// 按给定参数打开输出设备
    ///
    /// 每条连接只应打开一次，设备随连接替换而作废
    fn open_output(&self, spec: &OutputStreamSpec) -> Result<Box<dyn AudioSink>, ConnectionError>;

    /// 释放连接（幂等）
    async fn dispose(&self);
}

/// Voice Transport Port
#[async_trait]
pub trait VoiceTransportPort: Send + Sync {
    /// 连接到指定 guild 的语音频道
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, ConnectionError>;
}
