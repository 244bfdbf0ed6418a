//! NotifyHub — 订单事件实时分发
//!
//! 按用户身份维护活跃连接，向同一用户的所有连接扇出生命周期事件。
//! 纯内存注册表，不持久化、不重放：没有连接时事件被静默丢弃，
//! 接收方在重连后通过查询接口补齐状态。
//!
//! ```text
//! Lifecycle engine / checkout
//!       │ publish(user_id, OrderUpdate)
//!       ▼
//! NotifyHub
//!   └── subscribers: user_id → [SubscriberHandle]
//!         │ try_send (bounded, never blocks the publisher)
//!         ▼
//!   WebSocket handlers (one mpsc receiver per connection)
//! ```

use dashmap::DashMap;
use shared::message::NotifyEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Per-connection buffer. A consumer that falls this far behind loses
/// events rather than slowing the publisher down; the dashboard refetches
/// on reconnect anyway.
const SUBSCRIBER_BUFFER: usize = 32;

/// A live subscription held by one connection
pub struct Subscription {
    pub user_id: String,
    pub id: u64,
    pub rx: mpsc::Receiver<NotifyEvent>,
}

struct SubscriberHandle {
    id: u64,
    tx: mpsc::Sender<NotifyEvent>,
}

/// 全局事件分发 hub
#[derive(Clone, Default)]
pub struct NotifyHub {
    /// user_id → live connections for that user
    subscribers: Arc<DashMap<String, Vec<SubscriberHandle>>>,
    next_id: Arc<AtomicU64>,
    shutdown_token: CancellationToken,
}

impl NotifyHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live connection for `user_id`
    ///
    /// Multiple concurrent connections per user are allowed; each gets its
    /// own channel and all of them receive every published event.
    pub fn subscribe(&self, user_id: &str) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);

        self.subscribers
            .entry(user_id.to_string())
            .or_default()
            .push(SubscriberHandle { id, tx });

        tracing::debug!(user_id, subscriber_id = id, "notify subscriber added");

        Subscription {
            user_id: user_id.to_string(),
            id,
            rx,
        }
    }

    /// Drop one connection's registry entry (called on connection close)
    pub fn unsubscribe(&self, user_id: &str, subscriber_id: u64) {
        if let Some(mut entry) = self.subscribers.get_mut(user_id) {
            entry.retain(|s| s.id != subscriber_id);
            let now_empty = entry.is_empty();
            drop(entry);
            if now_empty {
                // 最后一个连接断开后移除整个条目
                self.subscribers
                    .remove_if(user_id, |_, subs| subs.is_empty());
            }
        }
        tracing::debug!(user_id, subscriber_id, "notify subscriber removed");
    }

    /// Deliver `event` to every open connection of `user_id`
    ///
    /// Best-effort: with no connections this is a no-op, and a full buffer
    /// drops the event for that connection instead of blocking. Closed
    /// channels are pruned as a side effect. Returns the delivered count.
    pub fn publish(&self, user_id: &str, event: &NotifyEvent) -> usize {
        let Some(mut entry) = self.subscribers.get_mut(user_id) else {
            return 0;
        };

        let mut delivered = 0;
        entry.retain(|sub| match sub.tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                // Slow consumer: drop this event, keep the connection
                tracing::debug!(user_id, subscriber_id = sub.id, "notify buffer full, event dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });

        let now_empty = entry.is_empty();
        drop(entry);
        if now_empty {
            self.subscribers.remove_if(user_id, |_, subs| subs.is_empty());
        }

        delivered
    }

    /// Open connection count for a user
    pub fn connection_count(&self, user_id: &str) -> usize {
        self.subscribers
            .get(user_id)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    /// 获取关闭令牌 (连接处理器监听它以便优雅下线)
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 优雅关闭 - 通知所有连接处理器退出
    pub fn shutdown(&self) {
        tracing::info!("Shutting down notify hub");
        self.shutdown_token.cancel();
    }
}
