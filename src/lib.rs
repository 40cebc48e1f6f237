//! Guildvox - 每 guild 语音播放核心
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Playback Context: 语音播放上下文
//!
//! 应用层 (application/):
//! - Ports: 端口定义（VoiceTransport, TtsEngine, SpeechCache, AudioDecoder）
//! - Services: SpeechSynthesizer（内容寻址合成缓存）, StreamPipeline（解码/重采样/分块写出）
//! - Commands: join / leave / enqueue / skip 命令处理器
//! - Queries: 会话状态查询处理器
//!
//! 基础设施层 (infrastructure/):
//! - Memory: SessionRegistry, PlaybackQueue 内存状态
//! - Worker: PlaybackWorker 播放条目处理
//! - Persistence: Sled 合成缓存
//! - Adapters: TTS Client, 音频解码器, 环回传输

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod telemetry;

pub use config::{load_config, AppConfig};
