//! Playback Queue - 每 guild 播放队列与 drain 调度
//!
//! 多生产者单消费者 FIFO。drain 任务在首次入队时惰性启动，
//! 观察到队列为空即退出，空闲期间不占任何后台资源。
//! 每个条目拥有独立的取消范围；skip 只作用于当前条目。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::commands::SkipOutcome;
use crate::domain::playback::{GuildId, QueueItem};
use crate::infrastructure::worker::{PlaybackOutcome, PlaybackWorker};

/// 每 guild 播放队列
pub struct PlaybackQueue {
    guild_id: GuildId,
    items: Mutex<VecDeque<QueueItem>>,
    /// drain 任务存在性的原子检查置位
    drain_running: AtomicBool,
    /// leave 之后置位；关闭的队列不再接受条目，drain 随即退出
    closed: AtomicBool,
    /// 当前条目的取消范围；条目间不复用
    active: Mutex<Option<CancellationToken>>,
    /// 当前 drain 任务句柄，供关停方等待
    drain_handle: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackQueue {
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            items: Mutex::new(VecDeque::new()),
            drain_running: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            active: Mutex::new(None),
            drain_handle: Mutex::new(None),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 入队；如无 drain 任务在跑则启动一个
    ///
    /// 返回 false 表示队列已关闭，条目被丢弃
    pub async fn enqueue(self: Arc<Self>, item: QueueItem, worker: Arc<PlaybackWorker>) -> bool {
        if self.closed.load(Ordering::Acquire) {
            tracing::debug!(guild_id = %self.guild_id, item_id = %item.item_id, "Queue closed, dropping item");
            return false;
        }

        self.items.lock().await.push_back(item);

        if self
            .drain_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let handle = tokio::spawn(self.clone().drain(worker));
            // 被替换的句柄只可能属于一个已释放标志、即将退出的任务
            *self.drain_handle.lock().await = Some(handle);
        }

        true
    }

    /// 取消当前条目
    pub async fn skip(&self) -> SkipOutcome {
        match self.active.lock().await.as_ref() {
            Some(token) => {
                token.cancel();
                tracing::info!(guild_id = %self.guild_id, "Active playback item cancelled");
                SkipOutcome::Skipped
            }
            None => SkipOutcome::NothingToSkip,
        }
    }

    /// 关闭队列：取消当前条目，丢弃排队条目，终止 drain
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let dropped = {
            let mut items = self.items.lock().await;
            let dropped = items.len();
            items.clear();
            dropped
        };
        if let Some(token) = self.active.lock().await.as_ref() {
            token.cancel();
        }
        if dropped > 0 {
            tracing::debug!(guild_id = %self.guild_id, dropped = dropped, "Queue closed with pending items");
        }
    }

    /// 是否有 drain 任务在跑
    pub fn is_draining(&self) -> bool {
        self.drain_running.load(Ordering::Acquire)
    }

    /// 排队条目数（不含正在播放的条目）
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// 等待当前 drain 任务退出
    pub async fn wait_idle(&self) {
        loop {
            let handle = self.drain_handle.lock().await.take();
            match handle {
                Some(handle) => {
                    let _ = handle.await;
                }
                None => break,
            }
        }
    }

    /// 单消费者 drain 循环
    async fn drain(self: Arc<Self>, worker: Arc<PlaybackWorker>) {
        tracing::debug!(guild_id = %self.guild_id, "Drain task started");

        loop {
            if self.closed.load(Ordering::Acquire) {
                self.drain_running.store(false, Ordering::Release);
                break;
            }

            let item = self.items.lock().await.pop_front();
            let Some(item) = item else {
                // 先释放标志再复查，堵住「释放与入队交错」的漏唤醒窗口
                self.drain_running.store(false, Ordering::Release);
                if self.items.lock().await.is_empty() {
                    break;
                }
                if self
                    .drain_running
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    // 入队方已接管标志并另起任务
                    break;
                }
                continue;
            };

            let token = CancellationToken::new();
            *self.active.lock().await = Some(token.clone());

            let result = worker.process(&item, &token).await;

            *self.active.lock().await = None;

            match result {
                Ok(PlaybackOutcome::Completed) => {
                    tracing::debug!(
                        guild_id = %self.guild_id,
                        item_id = %item.item_id,
                        kind = item.payload.kind(),
                        "Playback item completed"
                    );
                }
                Ok(PlaybackOutcome::Cancelled) => {
                    tracing::info!(
                        guild_id = %self.guild_id,
                        item_id = %item.item_id,
                        "Playback item skipped"
                    );
                }
                // 单个条目的失败不中断循环
                Err(e) => {
                    tracing::warn!(
                        guild_id = %self.guild_id,
                        item_id = %item.item_id,
                        kind = item.payload.kind(),
                        error = %e,
                        "Playback item failed, dropping"
                    );
                }
            }
        }

        tracing::debug!(guild_id = %self.guild_id, "Drain task stopped");
    }
}
