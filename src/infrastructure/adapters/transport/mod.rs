//! Transport Adapter - 环回语音传输实现

mod loopback;

pub use loopback::{LoopbackConnection, LoopbackVoiceTransport};
