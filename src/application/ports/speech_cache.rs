//! Speech Cache Port - 合成音频内容寻址缓存
//!
//! 定义合成缓存的抽象接口，具体实现使用 Sled
//!
//! - 缓存 key: md5(归一化文本)
//! - 条目写入后不可变，重复写入同一 key 必须安全

use async_trait::async_trait;
use thiserror::Error;

/// 缓存错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// 缓存元数据
#[derive(Debug, Clone)]
pub struct CacheMetadata {
    /// 归一化文本的内容哈希（与缓存 key 相同）
    pub content_hash: String,
    /// 合成时使用的音色名称
    pub voice_name: String,
}

/// 缓存统计信息
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub hit_count: u64,
    pub miss_count: u64,
}

/// Speech Cache Port
#[async_trait]
pub trait SpeechCachePort: Send + Sync {
    /// 存储合成音频
    ///
    /// 同一 key 的并发写入以后写为准，内容寻址下两者字节一致
    async fn put(
        &self,
        cache_key: &str,
        audio_data: Vec<u8>,
        metadata: CacheMetadata,
    ) -> Result<(), CacheError>;

    /// 根据缓存 key 获取合成音频
    async fn get(&self, cache_key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// 检查缓存是否存在
    async fn exists(&self, cache_key: &str) -> Result<bool, CacheError>;

    /// 获取缓存统计信息
    async fn stats(&self) -> CacheStats;
}

/// 文本归一化
///
/// 去首尾空白并大小写折叠；@提及 之类的清理由命令前端负责
pub fn normalize_speech_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// 生成缓存 key
///
/// 对归一化文本取 md5 十六进制
pub fn speech_cache_key(normalized: &str) -> String {
    let digest = md5::compute(normalized.as_bytes());
    format!("{:x}", digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_folds_case() {
        assert_eq!(normalize_speech_text("  Hello World "), "hello world");
        assert_eq!(normalize_speech_text("hello world"), "hello world");
    }

    #[test]
    fn test_cache_key_stable_for_same_normalized_text() {
        let a = speech_cache_key(&normalize_speech_text("Hello World"));
        let b = speech_cache_key(&normalize_speech_text("  hello world  "));
        assert_eq!(a, b);
        // md5 十六进制固定 32 字符
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_cache_key_differs_for_different_text() {
        assert_ne!(speech_cache_key("hello"), speech_cache_key("world"));
    }
}
