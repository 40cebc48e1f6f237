//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod adapters;
pub mod memory;
pub mod persistence;
pub mod worker;

pub use memory::{PlaybackQueue, SessionRegistry, VoiceSession};
pub use persistence::sled::SledSpeechCache;
pub use worker::{PlaybackError, PlaybackOutcome, PlaybackWorker};
