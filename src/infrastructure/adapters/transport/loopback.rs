//! Loopback Transport - 进程内环回传输
//!
//! 捕获写入输出设备的 PCM 并统计 connect / open / flush 次数，
//! 可脚本化拒绝连接。与 FakeTtsClient 一样随库内置，供测试驱动完整链路。

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::application::ports::{
    AudioSink, ConnectionError, OutputError, OutputStreamSpec, VoiceConnection, VoiceTransportPort,
};
use crate::domain::playback::{ChannelId, ConnectionState, GuildId};

/// 传输级共享状态：捕获缓冲与计数器
#[derive(Default)]
struct LoopbackState {
    written: Mutex<Vec<u8>>,
    connects: AtomicUsize,
    opens: AtomicUsize,
    flushes: AtomicUsize,
    refuse_budget: AtomicU32,
}

impl LoopbackState {
    fn written(&self) -> MutexGuard<'_, Vec<u8>> {
        // 捕获缓冲被污染时恢复内容而不是传播 panic
        self.written.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// 环回语音传输
pub struct LoopbackVoiceTransport {
    state: Arc<LoopbackState>,
}

impl LoopbackVoiceTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(LoopbackState::default()),
        }
    }

    /// 拒绝接下来的 n 次连接请求
    pub fn refuse_next(&self, n: u32) {
        self.state.refuse_budget.store(n, Ordering::SeqCst);
    }

    /// 成功建立的连接数
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// 打开过的输出设备数
    pub fn open_count(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    /// 设备缓冲被排空的次数
    pub fn flush_count(&self) -> usize {
        self.state.flushes.load(Ordering::SeqCst)
    }

    /// 当前已捕获的音频字节数
    pub fn written_bytes(&self) -> usize {
        self.state.written().len()
    }

    /// 取走并清空已捕获的音频
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut *self.state.written())
    }
}

impl Default for LoopbackVoiceTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoiceTransportPort for LoopbackVoiceTransport {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, ConnectionError> {
        let refused = self
            .state
            .refuse_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(ConnectionError::Refused(format!(
                "channel {} unavailable",
                channel_id
            )));
        }

        self.state.connects.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(guild_id = %guild_id, channel_id = %channel_id, "Loopback connection established");

        Ok(Arc::new(LoopbackConnection {
            state: self.state.clone(),
            disposed: AtomicBool::new(false),
        }))
    }
}

/// 环回连接
pub struct LoopbackConnection {
    state: Arc<LoopbackState>,
    disposed: AtomicBool,
}

#[async_trait]
impl VoiceConnection for LoopbackConnection {
    fn state(&self) -> ConnectionState {
        if self.disposed.load(Ordering::Acquire) {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Connected
        }
    }

    fn open_output(&self, _spec: &OutputStreamSpec) -> Result<Box<dyn AudioSink>, ConnectionError> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(ConnectionError::Closed);
        }
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(LoopbackSink {
            state: self.state.clone(),
        }))
    }

    async fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}

/// 环回输出设备
struct LoopbackSink {
    state: Arc<LoopbackState>,
}

#[async_trait]
impl AudioSink for LoopbackSink {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), OutputError> {
        self.state.written().extend_from_slice(chunk);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), OutputError> {
        self.state.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
