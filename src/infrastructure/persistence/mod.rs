//! Persistence Layer - 数据持久化
//!
//! Sled 合成缓存实现

pub mod sled;

pub use self::sled::SledSpeechCache;
