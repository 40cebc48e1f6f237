//! Playback Context - Value Objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// 服务器（guild）唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuildId(u64);

impl GuildId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 语音频道唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(u64);

impl ChannelId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 语音连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// 握手进行中
    Connecting,
    /// 已连接
    Connected,
    /// 已断开
    Disconnected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 合成音频编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncoding {
    /// 原始 WAV
    #[default]
    Wav,
    /// MP3
    Mp3,
}

impl AudioEncoding {
    /// 文件扩展名，供解码探测使用
    pub fn extension(&self) -> &'static str {
        match self {
            AudioEncoding::Wav => "wav",
            AudioEncoding::Mp3 => "mp3",
        }
    }
}

impl std::fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for AudioEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wav" => Ok(AudioEncoding::Wav),
            "mp3" => Ok(AudioEncoding::Mp3),
            _ => Err(format!("unsupported audio encoding: {}", s)),
        }
    }
}

/// 合成音色配置
///
/// 送给 TTS 服务的 voice/locale/encoding 参数组合
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpeechVoice {
    /// 语言区域代码
    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// 音色名称
    #[serde(default = "default_voice_name")]
    pub name: String,

    /// 请求的音频编码
    #[serde(default)]
    pub encoding: AudioEncoding,
}

fn default_language_code() -> String {
    "en-AU".to_string()
}

fn default_voice_name() -> String {
    "en-AU-Neural2-A".to_string()
}

impl Default for SpeechVoice {
    fn default() -> Self {
        Self {
            language_code: default_language_code(),
            name: default_voice_name(),
            encoding: AudioEncoding::default(),
        }
    }
}

/// 播放载荷
///
/// Speech 走合成缓存，Clip 直接读本地音频文件
#[derive(Debug, Clone)]
pub enum PlaybackPayload {
    /// 待合成的文本
    Speech { text: String },
    /// 本地音频文件
    Clip { path: PathBuf },
}

impl PlaybackPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            PlaybackPayload::Speech { .. } => "speech",
            PlaybackPayload::Clip { .. } => "clip",
        }
    }
}

/// 队列条目
///
/// 入队后不可变
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub item_id: Uuid,
    pub guild_id: GuildId,
    pub payload: PlaybackPayload,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn new(guild_id: GuildId, payload: PlaybackPayload) -> Self {
        Self {
            item_id: Uuid::new_v4(),
            guild_id,
            payload,
            enqueued_at: Utc::now(),
        }
    }
}
