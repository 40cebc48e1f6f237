//! Sled-based Speech Cache Implementation
//!
//! 内容寻址的合成音频缓存。条目写入后不可变，无淘汰；
//! 同一 key 的并发写入以后写为准（内容寻址下字节一致，覆盖安全）。

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{CacheError, CacheMetadata, CacheStats, SpeechCachePort};

/// 条目 key 前缀
const ENTRY_PREFIX: &str = "speech:";

/// Sled 缓存配置
#[derive(Debug, Clone)]
pub struct SledCacheConfig {
    /// 数据库路径
    pub db_path: String,
}

impl Default for SledCacheConfig {
    fn default() -> Self {
        Self {
            db_path: "data/speech.sled".to_string(),
        }
    }
}

/// 内部缓存条目
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InternalCacheEntry {
    audio_data: Vec<u8>,
    size_bytes: u64,
    content_hash: String,
    voice_name: String,
    created_at: i64,
}

/// Sled 合成缓存
pub struct SledSpeechCache {
    db: Db,
    current_size: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl SledSpeechCache {
    /// 创建缓存实例
    pub fn new(config: &SledCacheConfig) -> Result<Self, CacheError> {
        let db = sled::open(&config.db_path)
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let current_size = Self::calculate_total_size(&db)?;

        tracing::info!(
            db_path = %config.db_path,
            current_size = current_size,
            "SledSpeechCache initialized"
        );

        Ok(Self {
            db,
            current_size: AtomicU64::new(current_size),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        })
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 计算数据库中所有条目的总大小
    fn calculate_total_size(db: &Db) -> Result<u64, CacheError> {
        let mut total = 0u64;
        for item in db.scan_prefix(ENTRY_PREFIX) {
            let (_, value) = item.map_err(|e| CacheError::Database(e.to_string()))?;
            if let Ok(entry) = bincode::deserialize::<InternalCacheEntry>(&value) {
                total += entry.size_bytes;
            }
        }
        Ok(total)
    }

    /// 刷新数据库
    pub fn flush(&self) -> Result<(), CacheError> {
        self.db
            .flush()
            .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(())
    }

    fn entry_key(cache_key: &str) -> String {
        format!("{}{}", ENTRY_PREFIX, cache_key)
    }
}

#[async_trait]
impl SpeechCachePort for SledSpeechCache {
    async fn put(
        &self,
        cache_key: &str,
        audio_data: Vec<u8>,
        metadata: CacheMetadata,
    ) -> Result<(), CacheError> {
        let size = audio_data.len() as u64;

        let entry = InternalCacheEntry {
            audio_data,
            size_bytes: size,
            content_hash: metadata.content_hash,
            voice_name: metadata.voice_name,
            created_at: Utc::now().timestamp(),
        };

        let entry_bytes = bincode::serialize(&entry)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        let previous = self
            .db
            .insert(Self::entry_key(cache_key), entry_bytes)
            .map_err(|e| CacheError::Database(e.to_string()))?;

        // 覆盖写只计入净增量
        let previous_size = previous
            .and_then(|v| bincode::deserialize::<InternalCacheEntry>(&v).ok())
            .map(|e| e.size_bytes)
            .unwrap_or(0);
        self.current_size.fetch_add(size, Ordering::Relaxed);
        self.current_size.fetch_sub(previous_size, Ordering::Relaxed);

        tracing::debug!(cache_key = %cache_key, size_bytes = size, "Speech audio cached");

        Ok(())
    }

    async fn get(&self, cache_key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match self.db.get(Self::entry_key(cache_key)) {
            Ok(Some(data)) => {
                let entry: InternalCacheEntry = bincode::deserialize(&data)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?;
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.audio_data))
            }
            Ok(None) => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(e) => Err(CacheError::Database(e.to_string())),
        }
    }

    async fn exists(&self, cache_key: &str) -> Result<bool, CacheError> {
        self.db
            .contains_key(Self::entry_key(cache_key))
            .map_err(|e| CacheError::Database(e.to_string()))
    }

    async fn stats(&self) -> CacheStats {
        let total_entries = self.db.scan_prefix(ENTRY_PREFIX).count();

        CacheStats {
            total_entries,
            total_size_bytes: self.current_size.load(Ordering::Relaxed),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn cache(dir: &std::path::Path) -> SledSpeechCache {
        SledSpeechCache::new(&SledCacheConfig {
            db_path: dir.join("test.sled").to_string_lossy().to_string(),
        })
        .unwrap()
    }

    fn metadata(hash: &str) -> CacheMetadata {
        CacheMetadata {
            content_hash: hash.to_string(),
            voice_name: "en-AU-Neural2-A".to_string(),
        }
    }

    #[tokio::test]
    async fn test_put_get_exists() {
        let dir = tempdir().unwrap();
        let cache = cache(dir.path());

        let audio = vec![1, 2, 3, 4, 5];
        cache.put("abc", audio.clone(), metadata("abc")).await.unwrap();

        let result = cache.get("abc").await.unwrap();
        assert_eq!(result, Some(audio));
        assert!(cache.exists("abc").await.unwrap());

        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_size_bytes, 5);
        assert_eq!(stats.hit_count, 1);
    }

    #[tokio::test]
    async fn test_miss_is_counted() {
        let dir = tempdir().unwrap();
        let cache = cache(dir.path());

        assert_eq!(cache.get("nope").await.unwrap(), None);
        assert!(!cache.exists("nope").await.unwrap());

        let stats = cache.stats().await;
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.hit_count, 0);
    }

    #[tokio::test]
    async fn test_overwrite_same_key_is_safe() {
        let dir = tempdir().unwrap();
        let cache = cache(dir.path());

        cache.put("k", vec![1, 2, 3], metadata("k")).await.unwrap();
        cache.put("k", vec![1, 2, 3], metadata("k")).await.unwrap();

        let stats = cache.stats().await;
        // 覆盖不重复计大小
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_size_bytes, 3);
    }

    #[tokio::test]
    async fn test_size_recovered_after_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.sled").to_string_lossy().to_string();

        {
            let cache = SledSpeechCache::new(&SledCacheConfig {
                db_path: path.clone(),
            })
            .unwrap();
            cache.put("k", vec![0; 128], metadata("k")).await.unwrap();
            cache.flush().unwrap();
        }

        // 重开后从磁盘恢复大小统计
        let reopened = SledSpeechCache::new(&SledCacheConfig { db_path: path }).unwrap();
        let stats = reopened.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_size_bytes, 128);
    }
}
