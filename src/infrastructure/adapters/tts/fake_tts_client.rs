//! Fake TTS Client - 用于测试的 TTS 客户端
//!
//! 按文本确定性地生成 WAV（音调由文本哈希决定），不实际调用 TTS 服务。
//! 统计调用次数与并发峰值，可脚本化注入失败。

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use crate::application::ports::{
    SynthesisError, SynthesisRequest, SynthesisResponse, TtsEnginePort,
};

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    /// 模拟的合成延迟
    pub latency: Duration,
    /// 生成音频的采样率
    pub sample_rate: u32,
    /// 生成音频的时长（毫秒）
    pub duration_ms: u64,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            sample_rate: 22050,
            duration_ms: 250,
        }
    }
}

/// Fake TTS Client
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_budget: AtomicU32,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        Self {
            config,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fail_budget: AtomicU32::new(0),
        }
    }

    /// 让接下来的 n 次合成请求失败
    pub fn fail_next(&self, n: u32) {
        self.fail_budget.store(n, Ordering::SeqCst);
    }

    /// 已收到的合成请求数（含失败的请求）
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 同时在途请求的峰值
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// 为给定文本生成确定性 WAV（单声道 16 位正弦音）
    pub fn render_wav(&self, text: &str) -> Vec<u8> {
        let digest = md5::compute(text.as_bytes());
        // 哈希前两字节映射到 200-800 Hz
        let seed = u16::from_be_bytes([digest.0[0], digest.0[1]]);
        let frequency = 200.0 + (seed % 600) as f32;

        let sample_rate = self.config.sample_rate;
        let num_samples = (sample_rate as u64 * self.config.duration_ms / 1000) as usize;
        let data_size = num_samples * 2;

        let mut wav = Vec::with_capacity(44 + data_size);
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&((36 + data_size) as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
        wav.extend_from_slice(&1u16.to_le_bytes()); // 单声道
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());

        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(data_size as u32).to_le_bytes());
        for i in 0..num_samples {
            let t = i as f32 / sample_rate as f32;
            let sample = (t * frequency * 2.0 * std::f32::consts::PI).sin() * 0.3;
            wav.extend_from_slice(&((sample * 32767.0) as i16).to_le_bytes());
        }

        wav
    }
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    async fn synthesize(
        &self,
        request: SynthesisRequest,
    ) -> Result<SynthesisResponse, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        let result = if self
            .fail_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            Err(SynthesisError::Service("scripted failure".to_string()))
        } else {
            tracing::debug!(
                text_len = request.text.len(),
                voice = %request.voice.name,
                "FakeTtsClient: rendering deterministic audio"
            );
            Ok(SynthesisResponse {
                audio_data: self.render_wav(&request.text),
                duration_ms: Some(self.config.duration_ms),
                sample_rate: Some(self.config.sample_rate),
            })
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
