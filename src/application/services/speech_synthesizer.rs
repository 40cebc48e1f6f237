//! Speech Synthesizer - 内容寻址的合成服务
//!
//! 归一化文本 → 内容哈希 → 缓存读取，未命中时调用外部 TTS 并回填。
//! 相同 key 的并发请求可能重复调用合成服务（见 DESIGN.md），
//! 重复写入内容寻址条目是安全的。

use std::sync::Arc;

use crate::application::ports::{
    normalize_speech_text, speech_cache_key, CacheMetadata, SpeechCachePort, SynthesisError,
    SynthesisRequest, TtsEnginePort,
};
use crate::domain::playback::SpeechVoice;

/// 合成服务
pub struct SpeechSynthesizer {
    cache: Arc<dyn SpeechCachePort>,
    engine: Arc<dyn TtsEnginePort>,
    voice: SpeechVoice,
}

impl SpeechSynthesizer {
    pub fn new(
        cache: Arc<dyn SpeechCachePort>,
        engine: Arc<dyn TtsEnginePort>,
        voice: SpeechVoice,
    ) -> Self {
        Self {
            cache,
            engine,
            voice,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 配置的音色
    pub fn voice(&self) -> &SpeechVoice {
        &self.voice
    }

    /// 获取或合成音频
    ///
    /// 缓存读写失败只降级为日志告警，不影响本次播放
    pub async fn get_or_synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let normalized = normalize_speech_text(text);
        if normalized.is_empty() {
            return Err(SynthesisError::EmptyInput);
        }

        let cache_key = speech_cache_key(&normalized);

        match self.cache.get(&cache_key).await {
            Ok(Some(audio)) => {
                tracing::debug!(cache_key = %cache_key, "Speech cache hit");
                return Ok(audio);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(cache_key = %cache_key, error = %e, "Speech cache read failed, synthesizing");
            }
        }

        let response = self
            .engine
            .synthesize(SynthesisRequest {
                text: normalized,
                voice: self.voice.clone(),
            })
            .await?;

        let metadata = CacheMetadata {
            content_hash: cache_key.clone(),
            voice_name: self.voice.name.clone(),
        };

        if let Err(e) = self
            .cache
            .put(&cache_key, response.audio_data.clone(), metadata)
            .await
        {
            tracing::warn!(cache_key = %cache_key, error = %e, "Speech cache write failed");
        }

        tracing::info!(
            cache_key = %cache_key,
            audio_size = response.audio_data.len(),
            duration_ms = ?response.duration_ms,
            "Speech synthesized"
        );

        Ok(response.audio_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::{FakeTtsClient, FakeTtsClientConfig};
    use crate::infrastructure::persistence::sled::{SledCacheConfig, SledSpeechCache};
    use tempfile::tempdir;

    fn build_synthesizer(dir: &std::path::Path) -> (SpeechSynthesizer, Arc<FakeTtsClient>) {
        let cache = SledSpeechCache::new(&SledCacheConfig {
            db_path: dir.join("cache.sled").to_string_lossy().to_string(),
        })
        .unwrap()
        .arc();
        let engine = Arc::new(FakeTtsClient::new(FakeTtsClientConfig::default()));
        let synthesizer =
            SpeechSynthesizer::new(cache, engine.clone(), SpeechVoice::default());
        (synthesizer, engine)
    }

    #[tokio::test]
    async fn test_second_call_hits_cache() {
        let dir = tempdir().unwrap();
        let (synthesizer, engine) = build_synthesizer(dir.path());

        let first = synthesizer.get_or_synthesize("hello world").await.unwrap();
        let second = synthesizer.get_or_synthesize("hello world").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.call_count(), 1);
    }

    #[tokio::test]
    async fn test_normalization_shares_cache_entry() {
        let dir = tempdir().unwrap();
        let (synthesizer, engine) = build_synthesizer(dir.path());

        let first = synthesizer.get_or_synthesize("Hello World").await.unwrap();
        let second = synthesizer
            .get_or_synthesize("  hello world  ")
            .await
            .unwrap();

        // 归一化后相同 → 字节一致且只合成一次
        assert_eq!(first, second);
        assert_eq!(engine.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let dir = tempdir().unwrap();
        let (synthesizer, engine) = build_synthesizer(dir.path());

        let result = synthesizer.get_or_synthesize("   ").await;
        assert!(matches!(result, Err(SynthesisError::EmptyInput)));
        assert_eq!(engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces() {
        let dir = tempdir().unwrap();
        let (synthesizer, engine) = build_synthesizer(dir.path());
        engine.fail_next(1);

        let result = synthesizer.get_or_synthesize("hello").await;
        assert!(matches!(result, Err(SynthesisError::Service(_))));

        // 失败不留缓存条目，下一次重新合成
        let ok = synthesizer.get_or_synthesize("hello").await;
        assert!(ok.is_ok());
        assert_eq!(engine.call_count(), 2);
    }
}
