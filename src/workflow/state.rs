//! 当前结果集
//!
//! 唯一的跨操作共享状态。单写者（提交流程持有 `ResultWriter`），多读者
//! （导出流程等持有 `ResultReader`）。替换是对不可变快照的原子交换。

use crate::models::ResultSet;
use std::sync::{Arc, PoisonError, RwLock};

/// 某一版本的结果集
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// 每次成功提交加一，从 1 开始
    pub version: u64,
    pub set: ResultSet,
}

type Cell = Arc<RwLock<Option<Arc<Snapshot>>>>;

/// 创建一对读写句柄
pub fn result_cell() -> (ResultWriter, ResultReader) {
    let cell: Cell = Arc::default();
    (
        ResultWriter { cell: cell.clone() },
        ResultReader { cell },
    )
}

/// 写句柄，不可克隆
#[derive(Debug)]
pub struct ResultWriter {
    cell: Cell,
}

impl ResultWriter {
    /// 整体替换当前结果集，返回新版本号
    pub fn replace(&self, set: ResultSet) -> u64 {
        let mut slot = self.cell.write().unwrap_or_else(PoisonError::into_inner);
        let version = slot.as_ref().map_or(0, |s| s.version) + 1;
        *slot = Some(Arc::new(Snapshot { version, set }));
        version
    }

    pub fn reader(&self) -> ResultReader {
        ResultReader {
            cell: self.cell.clone(),
        }
    }
}

/// 读句柄
#[derive(Debug, Clone)]
pub struct ResultReader {
    cell: Cell,
}

impl ResultReader {
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.cell
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn version(&self) -> u64 {
        self.current().map_or(0, |s| s.version)
    }
}
