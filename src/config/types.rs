//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

use crate::application::ports::{OutputMode, OutputStreamSpec};
use crate::application::services::StreamTarget;
use crate::domain::playback::{AudioEncoding, SpeechVoice};

/// 应用主配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// TTS 引擎配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 合成音色配置
    #[serde(default)]
    pub speech: SpeechConfig,

    /// 输出流配置
    #[serde(default)]
    pub stream: StreamConfig,

    /// 合成缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tts: TtsConfig::default(),
            speech: SpeechConfig::default(),
            stream: StreamConfig::default(),
            cache: CacheConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// TTS 引擎配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    /// TTS 服务基础 URL
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 瞬时失败的最大重试次数
    #[serde(default)]
    pub max_retries: u32,
}

fn default_tts_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_tts_timeout() -> u64 {
    120
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            url: default_tts_url(),
            timeout_secs: default_tts_timeout(),
            max_retries: 0,
        }
    }
}

/// 合成音色配置
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    /// 语言区域代码
    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// 音色名称
    #[serde(default = "default_voice_name")]
    pub voice_name: String,

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

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language_code: default_language_code(),
            voice_name: default_voice_name(),
            encoding: AudioEncoding::default(),
        }
    }
}

impl SpeechConfig {
    /// 构造送给合成服务的音色值对象
    pub fn voice(&self) -> SpeechVoice {
        SpeechVoice {
            language_code: self.language_code.clone(),
            name: self.voice_name.clone(),
            encoding: self.encoding,
        }
    }
}

/// 输出流配置
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// 目标采样率（Hz）
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// 目标声道数
    #[serde(default = "default_channels")]
    pub channels: u8,

    /// 单次设备写入的块大小（字节）
    #[serde(default = "default_chunk_bytes")]
    pub chunk_bytes: usize,

    /// 设备内部缓冲大小（字节）
    #[serde(default = "default_buffer_bytes")]
    pub buffer_bytes: usize,

    /// 单帧时长（毫秒）
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u32,

    /// 输出流混合模式
    #[serde(default)]
    pub mode: OutputMode,
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_channels() -> u8 {
    2 // 立体声
}

fn default_chunk_bytes() -> usize {
    1920
}

fn default_buffer_bytes() -> usize {
    98304
}

fn default_frame_ms() -> u32 {
    200
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            chunk_bytes: default_chunk_bytes(),
            buffer_bytes: default_buffer_bytes(),
            frame_ms: default_frame_ms(),
            mode: OutputMode::default(),
        }
    }
}

impl StreamConfig {
    /// 打开输出设备的参数
    pub fn output_spec(&self) -> OutputStreamSpec {
        OutputStreamSpec {
            mode: self.mode,
            buffer_bytes: self.buffer_bytes,
            frame_ms: self.frame_ms,
        }
    }

    /// 流水线的目标 PCM 格式
    pub fn target(&self) -> StreamTarget {
        StreamTarget {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

/// 合成缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Sled 数据库路径
    #[serde(default = "default_cache_db_path")]
    pub db_path: String,
}

fn default_cache_db_path() -> String {
    "data/speech.sled".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: default_cache_db_path(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.tts.url, "http://localhost:8000");
        assert_eq!(config.speech.language_code, "en-AU");
        assert_eq!(config.speech.voice_name, "en-AU-Neural2-A");
        assert_eq!(config.stream.sample_rate, 48000);
        assert_eq!(config.stream.chunk_bytes, 1920);
        assert_eq!(config.cache.db_path, "data/speech.sled");
    }

    #[test]
    fn test_stream_output_spec() {
        let config = StreamConfig::default();
        let spec = config.output_spec();
        assert_eq!(spec.mode, OutputMode::Mixed);
        assert_eq!(spec.buffer_bytes, 98304);
        assert_eq!(spec.frame_ms, 200);
    }

    #[test]
    fn test_stream_target() {
        let config = StreamConfig::default();
        let target = config.target();
        assert_eq!(target.sample_rate, 48000);
        assert_eq!(target.channels, 2);
    }

    #[test]
    fn test_speech_voice_from_config() {
        let config = SpeechConfig::default();
        let voice = config.voice();
        assert_eq!(voice.language_code, "en-AU");
        assert_eq!(voice.name, "en-AU-Neural2-A");
        assert_eq!(voice.encoding, AudioEncoding::Wav);
    }
}
