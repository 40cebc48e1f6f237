//! Domain Layer - 领域层
//!
//! 单一限界上下文:
//! - Playback Context: 语音播放

pub mod playback;
