//! Stream Pipeline - 解码 / 重采样 / 分块写出
//!
//! 把音频源解码为 PCM，重采样到传输层固定格式，按固定块写入输出设备。
//! 取消只在块边界检查；正常完成、取消、写失败都要先排空设备缓冲再返回，
//! 避免残留音频混进下一个条目。

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    AudioDecoderPort, AudioSink, DecodeError, DecodedAudio, OutputError,
};
use crate::domain::playback::AudioEncoding;

/// 流错误
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Output failed: {0}")]
    Output(#[from] OutputError),
}

/// 单次播放结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// 完整写出
    Completed,
    /// 在块边界被取消
    Cancelled,
}

/// 传输层要求的固定输出格式（16 位小端 PCM）
#[derive(Debug, Clone, Copy)]
pub struct StreamTarget {
    pub sample_rate: u32,
    pub channels: u8,
}

impl Default for StreamTarget {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
        }
    }
}

/// 流水线
pub struct StreamPipeline {
    decoder: Arc<dyn AudioDecoderPort>,
    target: StreamTarget,
    chunk_bytes: usize,
}

impl StreamPipeline {
    pub fn new(decoder: Arc<dyn AudioDecoderPort>, target: StreamTarget, chunk_bytes: usize) -> Self {
        Self {
            decoder,
            target,
            chunk_bytes,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 播放一个音频源
    pub async fn play(
        &self,
        source: &[u8],
        encoding: AudioEncoding,
        sink: &mut dyn AudioSink,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, StreamError> {
        let decoded = self.decoder.decode(source, encoding)?;
        let pcm = self.reformat(&decoded);

        let mut outcome = StreamOutcome::Completed;
        let mut write_error: Option<OutputError> = None;

        for chunk in pcm.chunks(self.chunk_bytes) {
            // 取消只在块边界生效
            if cancel.is_cancelled() {
                outcome = StreamOutcome::Cancelled;
                break;
            }
            if let Err(e) = sink.write(chunk).await {
                write_error = Some(e);
                break;
            }
        }

        // 无论如何都排空设备缓冲
        let flush_result = sink.flush().await;

        if let Some(e) = write_error {
            return Err(StreamError::Output(e));
        }
        flush_result?;

        tracing::debug!(
            bytes = pcm.len(),
            duration_ms = decoded.duration_ms(),
            outcome = ?outcome,
            "Stream finished"
        );

        Ok(outcome)
    }

    /// 重混声道、重采样并转 16 位小端
    fn reformat(&self, decoded: &DecodedAudio) -> Vec<u8> {
        let remixed = remix_channels(&decoded.samples, decoded.channels, self.target.channels);
        let resampled = resample(
            &remixed,
            decoded.sample_rate,
            self.target.sample_rate,
            self.target.channels,
        );

        let mut bytes = Vec::with_capacity(resampled.len() * 2);
        for &sample in &resampled {
            let clamped = sample.clamp(-1.0, 1.0);
            let value = (clamped * 32767.0) as i16;
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }
}

/// 声道重混
///
/// 多转一取平均，一转多复制
fn remix_channels(samples: &[f32], from: u8, to: u8) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }

    let from = from as usize;
    let to = to as usize;
    let frames = samples.len() / from;
    let mut remixed = Vec::with_capacity(frames * to);

    for frame in 0..frames {
        let base = frame * from;
        if to == 1 {
            let sum: f32 = samples[base..base + from].iter().sum();
            remixed.push(sum / from as f32);
        } else {
            for ch in 0..to {
                remixed.push(samples[base + ch.min(from - 1)]);
            }
        }
    }

    remixed
}

/// 线性插值重采样
fn resample(samples: &[f32], from_rate: u32, to_rate: u32, channels: u8) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || channels == 0 {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let channel_count = channels as usize;
    let frame_count = samples.len() / channel_count;
    if frame_count == 0 {
        return Vec::new();
    }
    let new_frame_count = (frame_count as f64 * ratio) as usize;
    let mut resampled = Vec::with_capacity(new_frame_count * channel_count);

    for i in 0..new_frame_count {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos as usize;
        let frac = src_pos - src_idx as f64;

        for ch in 0..channel_count {
            let idx0 = src_idx * channel_count + ch;
            let idx1 = ((src_idx + 1).min(frame_count - 1)) * channel_count + ch;

            let s0 = samples.get(idx0).copied().unwrap_or(0.0);
            let s1 = samples.get(idx1).copied().unwrap_or(s0);

            resampled.push(s0 + (s1 - s0) * frac as f32);
        }
    }

    resampled
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 返回固定样本的解码器
    struct StubDecoder {
        sample_rate: u32,
        channels: u8,
        frames: usize,
    }

    impl AudioDecoderPort for StubDecoder {
        fn decode(
            &self,
            _data: &[u8],
            _encoding: AudioEncoding,
        ) -> Result<DecodedAudio, DecodeError> {
            Ok(DecodedAudio {
                samples: vec![0.5; self.frames * self.channels as usize],
                sample_rate: self.sample_rate,
                channels: self.channels,
            })
        }
    }

    /// 失败解码器
    struct FailingDecoder;

    impl AudioDecoderPort for FailingDecoder {
        fn decode(
            &self,
            _data: &[u8],
            _encoding: AudioEncoding,
        ) -> Result<DecodedAudio, DecodeError> {
            Err(DecodeError::InvalidInput("not audio".to_string()))
        }
    }

    /// 记录写入的 sink，可在第 N 次写入时取消 token
    struct RecordingSink {
        written: Vec<u8>,
        writes: usize,
        flushes: Arc<AtomicUsize>,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    impl RecordingSink {
        fn new(flushes: Arc<AtomicUsize>) -> Self {
            Self {
                written: Vec::new(),
                writes: 0,
                flushes,
                cancel_after: None,
            }
        }
    }

    #[async_trait]
    impl AudioSink for RecordingSink {
        async fn write(&mut self, chunk: &[u8]) -> Result<(), OutputError> {
            self.written.extend_from_slice(chunk);
            self.writes += 1;
            if let Some((after, token)) = &self.cancel_after {
                if self.writes >= *after {
                    token.cancel();
                }
            }
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), OutputError> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn pipeline(frames: usize, sample_rate: u32, channels: u8) -> StreamPipeline {
        StreamPipeline::new(
            Arc::new(StubDecoder {
                sample_rate,
                channels,
                frames,
            }),
            StreamTarget::default(),
            1920,
        )
    }

    #[tokio::test]
    async fn test_play_writes_all_target_bytes() {
        // 1 秒 24kHz 单声道 → 1 秒 48kHz 立体声 16 位
        let pipeline = pipeline(24000, 24000, 1);
        let flushes = Arc::new(AtomicUsize::new(0));
        let mut sink = RecordingSink::new(flushes.clone());

        let outcome = pipeline
            .play(b"x", AudioEncoding::Wav, &mut sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(sink.written.len(), 48000 * 2 * 2);
        assert_eq!(flushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_chunk_writes_nothing() {
        let pipeline = pipeline(48000, 48000, 2);
        let flushes = Arc::new(AtomicUsize::new(0));
        let mut sink = RecordingSink::new(flushes.clone());
        let token = CancellationToken::new();
        token.cancel();

        let outcome = pipeline
            .play(b"x", AudioEncoding::Wav, &mut sink, &token)
            .await
            .unwrap();

        assert_eq!(outcome, StreamOutcome::Cancelled);
        assert!(sink.written.is_empty());
        // 取消路径同样排空缓冲
        assert_eq!(flushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_mid_stream_stops_at_chunk_boundary() {
        let pipeline = pipeline(48000, 48000, 2);
        let flushes = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let mut sink = RecordingSink::new(flushes.clone());
        sink.cancel_after = Some((3, token.clone()));

        let outcome = pipeline
            .play(b"x", AudioEncoding::Wav, &mut sink, &token)
            .await
            .unwrap();

        assert_eq!(outcome, StreamOutcome::Cancelled);
        // 恰好写满触发取消的那个块
        assert_eq!(sink.written.len(), 3 * 1920);
        assert_eq!(flushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_decode_failure_surfaces() {
        let pipeline = StreamPipeline::new(Arc::new(FailingDecoder), StreamTarget::default(), 1920);
        let flushes = Arc::new(AtomicUsize::new(0));
        let mut sink = RecordingSink::new(flushes.clone());

        let result = pipeline
            .play(b"x", AudioEncoding::Wav, &mut sink, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(StreamError::Decode(_))));
    }

    #[test]
    fn test_remix_mono_to_stereo_duplicates() {
        let out = remix_channels(&[0.1, 0.2], 1, 2);
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_remix_stereo_to_mono_averages() {
        let out = remix_channels(&[0.2, 0.4], 2, 1);
        assert!((out[0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_resample_doubles_frames() {
        let out = resample(&[0.0, 1.0, 0.0, 1.0], 24000, 48000, 2);
        assert_eq!(out.len(), 8);
    }
}
