//! Audio Decoder Port - 音频解码抽象
//!
//! 把容器格式（WAV / MP3）解码为交织 f32 PCM，具体实现基于 symphonia

use thiserror::Error;

use crate::domain::playback::AudioEncoding;

/// 解码错误
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Decoding error: {0}")]
    Decoding(String),
}

/// 解码结果
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// 交织 f32 样本
    pub samples: Vec<f32>,
    /// 采样率
    pub sample_rate: u32,
    /// 声道数
    pub channels: u8,
}

impl DecodedAudio {
    /// 音频时长（毫秒）
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / (self.sample_rate as u64 * self.channels as u64)
    }
}

/// Audio Decoder Port
///
/// 解码是纯 CPU 操作，接口保持同步
pub trait AudioDecoderPort: Send + Sync {
    /// 解码音频字节
    ///
    /// `encoding` 作为容器探测提示
    fn decode(&self, data: &[u8], encoding: AudioEncoding) -> Result<DecodedAudio, DecodeError>;
}
