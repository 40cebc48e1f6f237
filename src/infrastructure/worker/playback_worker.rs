//! Playback Worker - 单条目播放处理
//!
//! drain 循环对每个出队条目调用一次 process：
//! 播放时刻从注册表解析会话（频道迁移后自然落到新连接上），
//! 合成或读取音频，按连接惰性打开输出设备，经流水线写出。

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{ConnectionError, SynthesisError};
use crate::application::services::{SpeechSynthesizer, StreamError, StreamOutcome, StreamPipeline};
use crate::domain::playback::{AudioEncoding, GuildId, PlaybackPayload, QueueItem};
use crate::infrastructure::memory::SessionRegistry;

/// 单条目播放错误
///
/// 任何变体都只丢弃当前条目，不中断所属 guild 的 drain 循环
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("No active session for guild {0}")]
    SessionGone(GuildId),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("Output device unavailable: {0}")]
    Output(#[from] ConnectionError),

    #[error("Clip unavailable: {path}: {reason}")]
    Clip { path: PathBuf, reason: String },
}

/// 单条目播放结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Cancelled,
}

/// 播放处理器
pub struct PlaybackWorker {
    registry: Arc<SessionRegistry>,
    synthesizer: Arc<SpeechSynthesizer>,
    pipeline: Arc<StreamPipeline>,
}

impl PlaybackWorker {
    pub fn new(
        registry: Arc<SessionRegistry>,
        synthesizer: Arc<SpeechSynthesizer>,
        pipeline: Arc<StreamPipeline>,
    ) -> Self {
        Self {
            registry,
            synthesizer,
            pipeline,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 处理一个队列条目
    pub async fn process(
        &self,
        item: &QueueItem,
        cancel: &CancellationToken,
    ) -> Result<PlaybackOutcome, PlaybackError> {
        let session = self
            .registry
            .get(item.guild_id)
            .ok_or(PlaybackError::SessionGone(item.guild_id))?;

        let (audio, encoding) = match &item.payload {
            PlaybackPayload::Speech { text } => {
                let audio = self.synthesizer.get_or_synthesize(text).await?;
                (audio, self.synthesizer.voice().encoding)
            }
            PlaybackPayload::Clip { path } => {
                let audio = tokio::fs::read(path).await.map_err(|e| PlaybackError::Clip {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                let encoding = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(|ext| ext.parse().ok())
                    .unwrap_or(AudioEncoding::Wav);
                (audio, encoding)
            }
        };

        // 合成期间到达的 skip 在这里生效
        if cancel.is_cancelled() {
            return Ok(PlaybackOutcome::Cancelled);
        }

        let mut output = session.output.lock().await;
        let sink = match &mut *output {
            Some(sink) => sink,
            slot => {
                // 每条连接只打开一次，连接替换后由新会话重新打开
                let device = session.connection.open_output(&session.output_spec)?;
                tracing::debug!(guild_id = %item.guild_id, "Output device opened");
                slot.insert(device)
            }
        };

        let outcome = self
            .pipeline
            .play(&audio, encoding, sink.as_mut(), cancel)
            .await?;

        Ok(match outcome {
            StreamOutcome::Completed => PlaybackOutcome::Completed,
            StreamOutcome::Cancelled => PlaybackOutcome::Cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::{EnqueueOutcome, SkipOutcome};
    use crate::application::ports::OutputStreamSpec;
    use crate::application::services::StreamTarget;
    use crate::domain::playback::{ChannelId, SpeechVoice};
    use crate::infrastructure::adapters::{
        FakeTtsClient, FakeTtsClientConfig, LoopbackVoiceTransport, SymphoniaDecoder,
    };
    use crate::infrastructure::persistence::sled::{SledCacheConfig, SledSpeechCache};
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::time::timeout;

    struct Harness {
        registry: Arc<SessionRegistry>,
        worker: Arc<PlaybackWorker>,
        transport: Arc<LoopbackVoiceTransport>,
        engine: Arc<FakeTtsClient>,
        _dir: tempfile::TempDir,
    }

    fn harness_with_engine(engine_config: FakeTtsClientConfig) -> Harness {
        let dir = tempdir().unwrap();
        let transport = Arc::new(LoopbackVoiceTransport::new());
        let registry =
            SessionRegistry::new(transport.clone(), OutputStreamSpec::default()).arc();
        let cache = SledSpeechCache::new(&SledCacheConfig {
            db_path: dir.path().join("cache.sled").to_string_lossy().to_string(),
        })
        .unwrap()
        .arc();
        let engine = Arc::new(FakeTtsClient::new(engine_config));
        let synthesizer =
            SpeechSynthesizer::new(cache, engine.clone(), SpeechVoice::default()).arc();
        let pipeline =
            StreamPipeline::new(Arc::new(SymphoniaDecoder::new()), StreamTarget::default(), 1920)
                .arc();
        let worker = PlaybackWorker::new(registry.clone(), synthesizer, pipeline).arc();
        Harness {
            registry,
            worker,
            transport,
            engine,
            _dir: dir,
        }
    }

    fn harness() -> Harness {
        harness_with_engine(FakeTtsClientConfig::default())
    }

    async fn enqueue_speech(h: &Harness, guild: GuildId, text: &str) -> EnqueueOutcome {
        let session = match h.registry.get(guild) {
            Some(session) => session,
            None => return EnqueueOutcome::NoSession,
        };
        let item = QueueItem::new(
            guild,
            PlaybackPayload::Speech {
                text: text.to_string(),
            },
        );
        if session.queue.clone().enqueue(item, h.worker.clone()).await {
            EnqueueOutcome::Queued
        } else {
            EnqueueOutcome::NoSession
        }
    }

    async fn wait_drained(h: &Harness, guild: GuildId) {
        let session = h.registry.get(guild).expect("session");
        timeout(Duration::from_secs(5), session.queue.wait_idle())
            .await
            .expect("drain did not stop");
    }

    #[tokio::test]
    async fn test_end_to_end_speech_playback() {
        let h = harness();
        let guild = GuildId::new(1);

        h.registry.join(guild, ChannelId::new(10)).await.unwrap();
        assert_eq!(enqueue_speech(&h, guild, "hello world").await, EnqueueOutcome::Queued);

        wait_drained(&h, guild).await;

        let session = h.registry.get(guild).expect("session survives playback");
        // 合成恰好一次，音频写到了输出设备，队列排空，drain 停止
        assert_eq!(h.engine.call_count(), 1);
        assert!(h.transport.written_bytes() > 0);
        assert!(session.queue.is_empty().await);
        assert!(!session.queue.is_draining());
        assert_eq!(session.state(), crate::domain::playback::ConnectionState::Connected);
        // 排空设备缓冲恰好一次
        assert_eq!(h.transport.flush_count(), 1);
    }

    #[tokio::test]
    async fn test_repeat_text_served_from_cache() {
        let h = harness();
        let guild = GuildId::new(1);

        h.registry.join(guild, ChannelId::new(10)).await.unwrap();
        enqueue_speech(&h, guild, "hello world").await;
        wait_drained(&h, guild).await;
        let first_bytes = h.transport.take_written();

        enqueue_speech(&h, guild, "Hello World  ").await;
        wait_drained(&h, guild).await;
        let second_bytes = h.transport.take_written();

        // 归一化后命中缓存：不再调用合成服务，输出字节一致
        assert_eq!(h.engine.call_count(), 1);
        assert_eq!(first_bytes, second_bytes);
    }

    #[tokio::test]
    async fn test_enqueue_without_session_is_noop() {
        let h = harness();
        let outcome = enqueue_speech(&h, GuildId::new(9), "hello").await;
        assert_eq!(outcome, EnqueueOutcome::NoSession);
        assert_eq!(h.engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_skip_with_no_active_item() {
        let h = harness();
        let guild = GuildId::new(1);
        h.registry.join(guild, ChannelId::new(10)).await.unwrap();

        let session = h.registry.get(guild).unwrap();
        assert_eq!(session.queue.skip().await, SkipOutcome::NothingToSkip);
        // 无状态变化
        assert!(session.queue.is_empty().await);
        assert!(!session.queue.is_draining());
    }

    #[tokio::test]
    async fn test_skip_cancels_only_active_item() {
        // 慢合成，保证 skip 落在第一个条目上
        let h = harness_with_engine(FakeTtsClientConfig {
            latency: Duration::from_millis(300),
            ..FakeTtsClientConfig::default()
        });
        let guild = GuildId::new(1);
        h.registry.join(guild, ChannelId::new(10)).await.unwrap();
        let session = h.registry.get(guild).unwrap();

        enqueue_speech(&h, guild, "first").await;
        enqueue_speech(&h, guild, "second").await;

        // 等 drain 把第一个条目取为活动条目
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(session.queue.skip().await, SkipOutcome::Skipped);

        wait_drained(&h, guild).await;

        // 两个条目都合成过（取消发生在合成之后），但只有第二个写出了音频
        assert_eq!(h.engine.call_count(), 2);
        assert!(h.transport.written_bytes() > 0);
        assert!(session.queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_item_does_not_stop_drain() {
        let h = harness();
        let guild = GuildId::new(1);
        h.registry.join(guild, ChannelId::new(10)).await.unwrap();
        h.engine.fail_next(1);

        enqueue_speech(&h, guild, "doomed").await;
        enqueue_speech(&h, guild, "survivor").await;
        wait_drained(&h, guild).await;

        // 第一个条目被丢弃，第二个正常播放
        assert_eq!(h.engine.call_count(), 2);
        assert!(h.transport.written_bytes() > 0);
        let session = h.registry.get(guild).unwrap();
        assert!(session.queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_single_drain_under_concurrent_producers() {
        let h = harness();
        let guild = GuildId::new(1);
        h.registry.join(guild, ChannelId::new(10)).await.unwrap();

        let mut producers = Vec::new();
        for i in 0..8 {
            let h_registry = h.registry.clone();
            let h_worker = h.worker.clone();
            producers.push(tokio::spawn(async move {
                let session = h_registry.get(guild).expect("session");
                let item = QueueItem::new(
                    guild,
                    PlaybackPayload::Speech {
                        text: format!("line {}", i),
                    },
                );
                session.queue.clone().enqueue(item, h_worker).await
            }));
        }
        for producer in producers {
            assert!(producer.await.unwrap());
        }

        wait_drained(&h, guild).await;

        // 合成从未并发 → 每 guild 至多一个 drain 任务
        assert_eq!(h.engine.max_concurrency(), 1);
        assert_eq!(h.engine.call_count(), 8);
        assert!(!h.registry.get(guild).unwrap().queue.is_draining());
    }

    #[tokio::test]
    async fn test_reconnect_reopens_output_device() {
        let h = harness();
        let guild = GuildId::new(1);

        h.registry.join(guild, ChannelId::new(10)).await.unwrap();
        enqueue_speech(&h, guild, "one").await;
        wait_drained(&h, guild).await;
        assert_eq!(h.transport.open_count(), 1);

        // 迁移频道后设备按需重新打开
        h.registry.join(guild, ChannelId::new(20)).await.unwrap();
        enqueue_speech(&h, guild, "two").await;
        wait_drained(&h, guild).await;
        assert_eq!(h.transport.open_count(), 2);

        // 同一连接内设备复用
        enqueue_speech(&h, guild, "three").await;
        wait_drained(&h, guild).await;
        assert_eq!(h.transport.open_count(), 2);
    }

    #[tokio::test]
    async fn test_leave_terminates_drain() {
        let h = harness_with_engine(FakeTtsClientConfig {
            latency: Duration::from_millis(200),
            ..FakeTtsClientConfig::default()
        });
        let guild = GuildId::new(1);
        h.registry.join(guild, ChannelId::new(10)).await.unwrap();
        let session = h.registry.get(guild).unwrap();

        enqueue_speech(&h, guild, "one").await;
        enqueue_speech(&h, guild, "two").await;
        enqueue_speech(&h, guild, "three").await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        h.registry.leave(guild).await;

        timeout(Duration::from_secs(5), session.queue.wait_idle())
            .await
            .expect("drain did not stop after leave");

        // 排队条目被丢弃，旧队列拒绝新条目
        assert!(session.queue.is_empty().await);
        let late = QueueItem::new(
            guild,
            PlaybackPayload::Speech {
                text: "late".to_string(),
            },
        );
        assert!(!session.queue.clone().enqueue(late, h.worker.clone()).await);
    }

    #[tokio::test]
    async fn test_clip_payload_plays_local_file() {
        let h = harness();
        let guild = GuildId::new(1);
        h.registry.join(guild, ChannelId::new(10)).await.unwrap();

        // 借 fake 引擎生成一个合法 WAV 文件
        let wav = h.engine.render_wav("clip content");
        let path = h._dir.path().join("clip.wav");
        std::fs::write(&path, &wav).unwrap();

        let session = h.registry.get(guild).unwrap();
        let item = QueueItem::new(guild, PlaybackPayload::Clip { path });
        session.queue.clone().enqueue(item, h.worker.clone()).await;
        wait_drained(&h, guild).await;

        assert!(h.transport.written_bytes() > 0);
        // clip 不经过合成服务
        assert_eq!(h.engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_clip_is_dropped() {
        let h = harness();
        let guild = GuildId::new(1);
        h.registry.join(guild, ChannelId::new(10)).await.unwrap();

        let session = h.registry.get(guild).unwrap();
        let item = QueueItem::new(
            guild,
            PlaybackPayload::Clip {
                path: h._dir.path().join("missing.wav"),
            },
        );
        session.queue.clone().enqueue(item, h.worker.clone()).await;
        wait_drained(&h, guild).await;

        assert_eq!(h.transport.written_bytes(), 0);
        assert!(session.queue.is_empty().await);
    }
}
