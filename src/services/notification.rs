//! 通知服务 - 业务能力层
//!
//! 每条通知都是独立实例，有自己的计时器：停留一段时间后进入退出动画，然后移除。
//! 通知之间不排队、不合并，互不影响。

use crate::config::Config;
use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, error, info};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    Success,
    Error,
}

/// 通知当前所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticePhase {
    Visible,
    /// 退出动画中
    Leaving,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub kind: NoticeKind,
    pub created_at: DateTime<Local>,
    pub phase: NoticePhase,
}

/// 通知层事件，供终端打印等订阅者使用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeEvent {
    Shown(Notification),
    Leaving(u64),
    Removed(u64),
}

/// 停留与退出时长
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoticeTiming {
    pub success: Duration,
    pub error: Duration,
    pub exit: Duration,
}

impl Default for NoticeTiming {
    fn default() -> Self {
        Self {
            success: Duration::from_secs(4),
            error: Duration::from_secs(6),
            exit: Duration::from_millis(300),
        }
    }
}

impl NoticeTiming {
    pub fn from_config(config: &Config) -> Self {
        Self {
            success: config.success_notice(),
            error: config.error_notice(),
            exit: config.exit_transition(),
        }
    }

    pub fn display_for(&self, kind: NoticeKind) -> Duration {
        match kind {
            NoticeKind::Success => self.success,
            NoticeKind::Error => self.error,
        }
    }
}

/// 通知层：当前在屏幕上的通知
#[derive(Debug, Default)]
struct NotificationLayer {
    active: Mutex<Vec<Notification>>,
}

impl NotificationLayer {
    fn lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, notification: Notification) {
        self.lock().push(notification);
    }

    fn begin_leave(&self, id: u64) -> bool {
        match self.lock().iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.phase = NoticePhase::Leaving;
                true
            }
            None => false,
        }
    }

    fn remove(&self, id: u64) -> bool {
        let mut active = self.lock();
        let before = active.len();
        active.retain(|n| n.id != id);
        active.len() != before
    }
}

struct Inner {
    /// 第一次通知时才创建
    layer: OnceLock<NotificationLayer>,
    timing: NoticeTiming,
    next_id: AtomicU64,
    events: broadcast::Sender<NoticeEvent>,
}

/// 通知服务，克隆后共享同一通知层
#[derive(Clone)]
pub struct NotificationService {
    inner: Arc<Inner>,
}

impl NotificationService {
    pub fn new(timing: NoticeTiming) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                layer: OnceLock::new(),
                timing,
                next_id: AtomicU64::new(1),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NoticeEvent> {
        self.inner.events.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.notify(message, NoticeKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.notify(message, NoticeKind::Error)
    }

    /// 创建一条通知并安排自动移除（需在 tokio 运行时内调用）
    pub fn notify(&self, message: impl Into<String>, kind: NoticeKind) -> u64 {
        let notification = Notification {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            message: message.into(),
            kind,
            created_at: Local::now(),
            phase: NoticePhase::Visible,
        };
        let id = notification.id;

        match kind {
            NoticeKind::Success => info!("✅ {}", notification.message),
            NoticeKind::Error => error!("❌ {}", notification.message),
        }

        self.layer().push(notification.clone());
        let _ = self.inner.events.send(NoticeEvent::Shown(notification));

        let inner = self.inner.clone();
        // 显示时长从创建时刻起算，与任务何时被调度无关
        let leave_at = Instant::now() + inner.timing.display_for(kind);
        tokio::spawn(async move {
            tokio::time::sleep_until(leave_at).await;
            let Some(layer) = inner.layer.get() else {
                return;
            };
            if !layer.begin_leave(id) {
                debug!("通知 #{} 已被移除，跳过退出", id);
                return;
            }
            let _ = inner.events.send(NoticeEvent::Leaving(id));

            tokio::time::sleep(inner.timing.exit).await;
            if layer.remove(id) {
                let _ = inner.events.send(NoticeEvent::Removed(id));
            }
        });

        id
    }

    /// 立即移除；已移除时返回 false
    pub fn dismiss(&self, id: u64) -> bool {
        let removed = self
            .inner
            .layer
            .get()
            .is_some_and(|layer| layer.remove(id));
        if removed {
            let _ = self.inner.events.send(NoticeEvent::Removed(id));
        }
        removed
    }

    /// 当前在屏幕上的通知
    pub fn active(&self) -> Vec<Notification> {
        self.inner
            .layer
            .get()
            .map(|layer| layer.lock().clone())
            .unwrap_or_default()
    }

    /// 通知层是否已创建
    pub fn has_layer(&self) -> bool {
        self.inner.layer.get().is_some()
    }

    fn layer(&self) -> &NotificationLayer {
        self.inner.layer.get_or_init(NotificationLayer::default)
    }
}
