//! 忙碌操作守卫 - 业务能力层
//!
//! 同一逻辑操作同时只允许一个在途实例。进行中的重复触发直接被拒绝（防双击），
//! 不会调用被包装的操作，也不算错误。
//!
//! 进入时按 ActionId 动态查询所有入口并切换为忙碌；离开时无论成功失败都恢复一次，
//! 由 `BusyPermit` 的 `Drop` 保证（包括 future 在途中被丢弃的情况）。

use crate::error::AppResult;
use crate::infrastructure::{ActionId, SurfaceRegistry};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// 单个逻辑操作的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationState {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

/// 守卫的执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome<T> {
    Completed(T),
    /// 操作已在进行中，本次触发被丢弃
    Rejected,
}

impl<T> GuardOutcome<T> {
    pub fn is_rejected(&self) -> bool {
        matches!(self, GuardOutcome::Rejected)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            GuardOutcome::Completed(value) => Some(value),
            GuardOutcome::Rejected => None,
        }
    }
}

#[derive(Debug, Default)]
struct Ledger {
    states: HashMap<ActionId, OperationState>,
    /// 状态迁移历史（不含初始 Idle）
    history: HashMap<ActionId, Vec<OperationState>>,
}

impl Ledger {
    fn set(&mut self, action: ActionId, state: OperationState) {
        self.states.insert(action, state);
        self.history.entry(action).or_default().push(state);
    }
}

/// 忙碌操作守卫
pub struct BusyActionGuard {
    ledger: Mutex<Ledger>,
    surfaces: Arc<SurfaceRegistry>,
}

impl BusyActionGuard {
    pub fn new(surfaces: Arc<SurfaceRegistry>) -> Self {
        Self {
            ledger: Mutex::new(Ledger::default()),
            surfaces,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self, action: ActionId) -> OperationState {
        self.lock().states.get(&action).copied().unwrap_or_default()
    }

    pub fn is_busy(&self, action: ActionId) -> bool {
        self.state(action) == OperationState::InFlight
    }

    /// 状态迁移历史
    pub fn transitions(&self, action: ActionId) -> Vec<OperationState> {
        self.lock().history.get(&action).cloned().unwrap_or_default()
    }

    /// 最近一次完成的结果（Succeeded 或 Failed）
    pub fn last_outcome(&self, action: ActionId) -> Option<OperationState> {
        self.lock().history.get(&action).and_then(|h| {
            h.iter()
                .rev()
                .find(|s| matches!(s, OperationState::Succeeded | OperationState::Failed))
                .copied()
        })
    }

    /// 尝试进入忙碌；已在进行中时返回 None
    ///
    /// 状态检查、置位与入口切换在同一临界区内完成。
    pub fn try_acquire(&self, action: ActionId) -> Option<BusyPermit<'_>> {
        let mut ledger = self.lock();
        if ledger.states.get(&action) == Some(&OperationState::InFlight) {
            return None;
        }
        ledger.set(action, OperationState::InFlight);
        let flipped = self.surfaces.enter_busy(action, action.working_label());
        debug!("[{}] 进入忙碌，切换 {} 个入口", action, flipped);
        drop(ledger);

        Some(BusyPermit {
            guard: self,
            action,
            finished: None,
        })
    }

    /// 在守卫保护下运行操作
    ///
    /// 失败时入口先被恢复，再把错误交还给调用方上报。
    pub async fn run<T, F, Fut>(&self, action: ActionId, operation: F) -> AppResult<GuardOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let Some(mut permit) = self.try_acquire(action) else {
            debug!("[{}] 操作进行中，忽略重复触发", action);
            return Ok(GuardOutcome::Rejected);
        };

        let result = operation().await;
        permit.finish(if result.is_ok() {
            OperationState::Succeeded
        } else {
            OperationState::Failed
        });
        drop(permit);

        result.map(GuardOutcome::Completed)
    }

    fn release(&self, action: ActionId, outcome: OperationState) {
        let mut ledger = self.lock();
        ledger.set(action, outcome);
        ledger.set(action, OperationState::Idle);
        let restored = self.surfaces.restore(action);
        debug!("[{}] {:?} -> Idle，恢复 {} 个入口", action, outcome, restored);
    }
}

/// 忙碌期间的许可，drop 时恢复入口并回到 Idle
pub struct BusyPermit<'a> {
    guard: &'a BusyActionGuard,
    action: ActionId,
    finished: Option<OperationState>,
}

impl BusyPermit<'_> {
    /// 记录结果；未记录就被 drop 视为失败
    pub fn finish(&mut self, outcome: OperationState) {
        self.finished = Some(outcome);
    }
}

impl Drop for BusyPermit<'_> {
    fn drop(&mut self) {
        let outcome = self.finished.unwrap_or(OperationState::Failed);
        self.guard.release(self.action, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, ApplicationError};
    use crate::infrastructure::SurfaceId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;
    use tokio_test::{assert_pending, assert_ready, task};

    fn setup() -> (Arc<SurfaceRegistry>, BusyActionGuard) {
        let surfaces = Arc::new(SurfaceRegistry::new());
        surfaces.bind(ActionId::Export, SurfaceId::EXPORT_HEADER, "Download Excel");
        surfaces.bind(ActionId::Export, SurfaceId::EXPORT_INLINE, "Export");
        let guard = BusyActionGuard::new(surfaces.clone());
        (surfaces, guard)
    }

    #[test]
    fn test_second_run_rejected_while_first_pending() {
        let (surfaces, guard) = setup();
        let calls = AtomicUsize::new(0);
        let (tx, rx) = oneshot::channel::<()>();

        let mut first = task::spawn(guard.run(ActionId::Export, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            let _ = rx.await;
            Ok::<_, AppError>("saved")
        }));
        assert_pending!(first.poll());
        assert_eq!(guard.state(ActionId::Export), OperationState::InFlight);
        assert!(surfaces
            .snapshot(ActionId::Export)
            .iter()
            .all(|s| s.is_busy() && s.content == ActionId::Export.working_label()));

        let mut second = task::spawn(guard.run(ActionId::Export, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AppError>("duplicate")
        }));
        let rejected = assert_ready!(second.poll()).unwrap();
        assert!(rejected.is_rejected());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tx.send(()).unwrap();
        let done = assert_ready!(first.poll()).unwrap();
        assert_eq!(done, GuardOutcome::Completed("saved"));
        assert_eq!(guard.state(ActionId::Export), OperationState::Idle);
        assert_eq!(
            guard.transitions(ActionId::Export),
            vec![
                OperationState::InFlight,
                OperationState::Succeeded,
                OperationState::Idle
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_restores_surfaces_then_returns_error() {
        let (surfaces, guard) = setup();

        let result = guard
            .run(ActionId::Export, || async {
                Err::<(), _>(AppError::from(ApplicationError::NoValidData))
            })
            .await;

        assert!(matches!(
            result,
            Err(AppError::Application(ApplicationError::NoValidData))
        ));
        assert_eq!(
            surfaces.surface(SurfaceId::EXPORT_HEADER).unwrap().content,
            "Download Excel"
        );
        assert!(surfaces.snapshot(ActionId::Export).iter().all(|s| !s.is_busy()));
        assert_eq!(
            guard.transitions(ActionId::Export),
            vec![
                OperationState::InFlight,
                OperationState::Failed,
                OperationState::Idle
            ]
        );

        assert_eq!(
            guard.last_outcome(ActionId::Export),
            Some(OperationState::Failed)
        );

        let again = guard.run(ActionId::Export, || async { Ok(1) }).await.unwrap();
        assert_eq!(again, GuardOutcome::Completed(1));
        assert_eq!(
            guard.last_outcome(ActionId::Export),
            Some(OperationState::Succeeded)
        );
        assert_eq!(guard.last_outcome(ActionId::Submission), None);
    }

    #[test]
    fn test_dropped_future_still_restores() {
        let (surfaces, guard) = setup();
        let (_tx, rx) = oneshot::channel::<()>();

        let mut pending = task::spawn(guard.run(ActionId::Export, || async {
            let _ = rx.await;
            Ok::<_, AppError>(())
        }));
        assert_pending!(pending.poll());
        drop(pending);

        assert_eq!(guard.state(ActionId::Export), OperationState::Idle);
        assert!(surfaces.snapshot(ActionId::Export).iter().all(|s| !s.is_busy()));
        assert_eq!(
            guard.transitions(ActionId::Export).last(),
            Some(&OperationState::Idle)
        );
    }

    #[test]
    fn test_actions_are_independent() {
        let (_surfaces, guard) = setup();
        let permit = guard.try_acquire(ActionId::Export).unwrap();
        assert!(guard.try_acquire(ActionId::Export).is_none());
        assert!(guard.try_acquire(ActionId::Submission).is_some());
        drop(permit);
        assert!(guard.try_acquire(ActionId::Export).is_some());
    }
}
