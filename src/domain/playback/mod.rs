//! Playback Context - 语音播放限界上下文
//!
//! 职责:
//! - 服务器 / 频道标识
//! - 连接状态与音色配置
//! - 队列条目定义

mod value_objects;

pub use value_objects::{
    AudioEncoding, ChannelId, ConnectionState, GuildId, PlaybackPayload, QueueItem, SpeechVoice,
};
