//! Worker Layer - 播放条目处理

mod playback_worker;

pub use playback_worker::{PlaybackError, PlaybackOutcome, PlaybackWorker};
