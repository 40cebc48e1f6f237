//! Memory Layer - In-Memory State Management
//!
//! 实现 SessionRegistry 与 PlaybackQueue，管理语音会话与播放队列的内存状态

mod playback_queue;
mod session_registry;

pub use playback_queue::PlaybackQueue;
pub use session_registry::{SessionRegistry, VoiceSession};
