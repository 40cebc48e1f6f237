//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `GUILDVOX_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `GUILDVOX_TTS__URL=http://tts-server:8000`
/// - `GUILDVOX_SPEECH__VOICE_NAME=en-AU-Neural2-B`
/// - `GUILDVOX_STREAM__CHUNK_BYTES=3840`
/// - `GUILDVOX_CACHE__DB_PATH=/data/speech.sled`
///
/// # 返回
/// - `Ok(AppConfig)` - 成功加载的配置
/// - `Err(ConfigError)` - 加载失败
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("tts.url", "http://localhost:8000")?
        .set_default("tts.timeout_secs", 120)?
        .set_default("tts.max_retries", 0)?
        .set_default("speech.language_code", "en-AU")?
        .set_default("speech.voice_name", "en-AU-Neural2-A")?
        .set_default("speech.encoding", "wav")?
        .set_default("stream.sample_rate", 48000)?
        .set_default("stream.channels", 2)?
        .set_default("stream.chunk_bytes", 1920)?
        .set_default("stream.buffer_bytes", 98304)?
        .set_default("stream.frame_ms", 200)?
        .set_default("stream.mode", "mixed")?
        .set_default("cache.db_path", "data/speech.sled")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        // 搜索默认配置文件
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 前缀: GUILDVOX_
    // 层级分隔符: __ (双下划线)
    // 例如: GUILDVOX_TTS__URL=http://tts-server:8000
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix("GUILDVOX")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. 构建配置
    let config = builder.build()?;

    // 5. 反序列化为 AppConfig
    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    // 6. 验证配置
    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    // 验证 TTS URL
    if config.tts.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "TTS URL cannot be empty".to_string(),
        ));
    }

    // 验证流参数
    if config.stream.sample_rate == 0 {
        return Err(ConfigError::ValidationError(
            "Stream sample rate cannot be 0".to_string(),
        ));
    }
    if config.stream.channels == 0 {
        return Err(ConfigError::ValidationError(
            "Stream channel count cannot be 0".to_string(),
        ));
    }
    if config.stream.chunk_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "Stream chunk size cannot be 0".to_string(),
        ));
    }
    if config.stream.frame_ms == 0 {
        return Err(ConfigError::ValidationError(
            "Stream frame duration cannot be 0".to_string(),
        ));
    }

    // 验证缓存路径
    if config.cache.db_path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Cache database path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("TTS URL: {}", config.tts.url);
    tracing::info!("TTS Timeout: {}s", config.tts.timeout_secs);
    tracing::info!("TTS Max Retries: {}", config.tts.max_retries);
    tracing::info!(
        "Speech Voice: {} ({})",
        config.speech.voice_name,
        config.speech.language_code
    );
    tracing::info!("Speech Encoding: {}", config.speech.encoding);
    tracing::info!(
        "Stream Target: {} Hz / {} ch, chunk {} bytes",
        config.stream.sample_rate,
        config.stream.channels,
        config.stream.chunk_bytes
    );
    tracing::info!(
        "Output Device: {:?}, buffer {} bytes, frame {} ms",
        config.stream.mode,
        config.stream.buffer_bytes,
        config.stream.frame_ms
    );
    tracing::info!("Cache Database: {}", config.cache.db_path);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.tts.url, "http://localhost:8000");
        assert_eq!(config.stream.sample_rate, 48000);
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_empty_tts_url() {
        let mut config = AppConfig::default();
        config.tts.url = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_chunk() {
        let mut config = AppConfig::default();
        config.stream.chunk_bytes = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_cache_path() {
        let mut config = AppConfig::default();
        config.cache.db_path = String::new();
        assert!(validate_config(&config).is_err());
    }
}
