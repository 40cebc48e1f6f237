//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（VoiceTransport、TtsEngine、SpeechCache、AudioDecoder）
//! - services: 端口之上的编排服务（SpeechSynthesizer、StreamPipeline）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;
pub mod services;

// Re-exports
pub use commands::{
    // Voice commands
    EnqueueOutcome,
    EnqueuePlaybackCommand,
    JoinChannelCommand,
    JoinOutcome,
    LeaveChannelCommand,
    LeaveOutcome,
    SkipOutcome,
    SkipPlaybackCommand,
    // Handlers
    handlers::{
        EnqueuePlaybackHandler, JoinChannelHandler, LeaveChannelHandler, SkipPlaybackHandler,
    },
};

pub use error::JoinError;

pub use ports::{
    // Audio decoder
    AudioDecoderPort,
    DecodeError,
    DecodedAudio,
    // Speech cache
    normalize_speech_text,
    speech_cache_key,
    CacheError,
    CacheMetadata,
    CacheStats,
    SpeechCachePort,
    // TTS engine
    SynthesisError,
    SynthesisRequest,
    SynthesisResponse,
    TtsEnginePort,
    // Voice transport
    AudioSink,
    ConnectionError,
    OutputError,
    OutputMode,
    OutputStreamSpec,
    VoiceConnection,
    VoiceTransportPort,
};

pub use queries::{
    handlers::{GetSessionStatusHandler, SessionStatusResponse},
    GetSessionStatusQuery,
};

pub use services::{SpeechSynthesizer, StreamError, StreamOutcome, StreamPipeline, StreamTarget};
