//! Sled Persistence - 合成音频缓存

mod speech_cache;

pub use speech_cache::{SledCacheConfig, SledSpeechCache};
