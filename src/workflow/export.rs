//! 导出流程 - 流程层
//!
//! 把当前结果集发给导出服务，保存返回的表格文件。
//! 结果集为空时直接报错，不进入守卫也不发请求。

use crate::error::{
    AppError, AppResult, ApplicationError, EXPORT_FAILURE_PREFIX, GENERIC_EXPORT_FAILURE,
};
use crate::infrastructure::{ActionId, DownloadDir};
use crate::services::{
    BusyActionGuard, ExportReply, ExportService, GuardOutcome, NotificationService,
};
use crate::workflow::state::{ResultReader, Snapshot};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 一次导出的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Saved(PathBuf),
    Failed(String),
    Rejected,
}

/// 下载文件名：`<前缀>_<YYYY-MM-DD>_<HH-MM-SS>.xlsx`，日期和时间都取本地时间
pub fn export_file_name(prefix: &str, now: &DateTime<Local>) -> String {
    format!(
        "{}_{}_{}.xlsx",
        prefix,
        now.format("%Y-%m-%d"),
        now.format("%H-%M-%S")
    )
}

/// 导出失败的提示文本；保存失败已自带前缀
fn export_failure_message(e: &AppError) -> String {
    match e {
        AppError::File(_) => e.user_message(),
        _ => format!("{}{}", EXPORT_FAILURE_PREFIX, e.user_message()),
    }
}

/// 导出流程
pub struct ExportFlow {
    service: Arc<dyn ExportService>,
    guard: Arc<BusyActionGuard>,
    results: ResultReader,
    downloads: DownloadDir,
    notifier: NotificationService,
    file_prefix: String,
}

impl ExportFlow {
    pub fn new(
        service: Arc<dyn ExportService>,
        guard: Arc<BusyActionGuard>,
        results: ResultReader,
        downloads: DownloadDir,
        notifier: NotificationService,
        file_prefix: impl Into<String>,
    ) -> Self {
        Self {
            service,
            guard,
            results,
            downloads,
            notifier,
            file_prefix: file_prefix.into(),
        }
    }

    pub async fn export_current(&self) -> ExportOutcome {
        let Some(snapshot) = self.results.current() else {
            let message = AppError::from(ApplicationError::NothingToExport).user_message();
            self.notifier.error(message.clone());
            return ExportOutcome::Failed(message);
        };

        match self
            .guard
            .run(ActionId::Export, move || self.process(snapshot))
            .await
        {
            Ok(GuardOutcome::Completed(path)) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                self.notifier
                    .success(format!("Excel file downloaded successfully: {}", name));
                ExportOutcome::Saved(path)
            }
            Ok(GuardOutcome::Rejected) => {
                debug!("导出进行中，忽略本次触发");
                ExportOutcome::Rejected
            }
            Err(e) => {
                warn!("导出失败: {}", e);
                let message = export_failure_message(&e);
                self.notifier.error(message.clone());
                ExportOutcome::Failed(message)
            }
        }
    }

    async fn process(&self, snapshot: Arc<Snapshot>) -> AppResult<PathBuf> {
        let endpoint = self.service.endpoint();
        info!(
            "📊 导出 {} 条记录 (版本 {}) -> {}",
            snapshot.set.len(),
            snapshot.version,
            endpoint
        );

        match self.service.export(&snapshot.set).await? {
            ExportReply::Document(bytes) => {
                let file_name = export_file_name(&self.file_prefix, &Local::now());
                let path = self.downloads.save(&file_name, &bytes).await?;
                info!("✓ 表格已保存: {} ({} 字节)", path.display(), bytes.len());
                Ok(path)
            }
            ExportReply::Failed { status, body } => Err(AppError::bad_status(
                &endpoint,
                status,
                body.and_then(|b| b.message()),
                GENERIC_EXPORT_FAILURE,
            )),
        }
    }
}
