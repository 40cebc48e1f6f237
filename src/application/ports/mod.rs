//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_decoder;
mod speech_cache;
mod tts_engine;
mod voice_transport;

pub use audio_decoder::{AudioDecoderPort, DecodeError, DecodedAudio};
pub use speech_cache::{
    normalize_speech_text, speech_cache_key, CacheError, CacheMetadata, CacheStats,
    SpeechCachePort,
};
pub use tts_engine::{SynthesisError, SynthesisRequest, SynthesisResponse, TtsEnginePort};
pub use voice_transport::{
    AudioSink, ConnectionError, OutputError, OutputMode, OutputStreamSpec, VoiceConnection,
    VoiceTransportPort,
};
