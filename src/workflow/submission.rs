//! 提交流程 - 流程层
//!
//! 流程顺序：
//! 1. 隐藏上一次的结果区（不动当前结果集）
//! 2. 检查是否已选择文件
//! 3. 上传 → 校验响应（HTTP 状态 → status → data → 批次错误标记）
//! 4. 成功：替换结果集 → 显示导出入口 → 渲染 → 成功通知
//! 5. 失败：一条错误通知，结果集保持不变

use crate::error::{
    AppError, AppResult, ApplicationError, ValidationError, GENERIC_ANALYSIS_FAILURE,
};
use crate::infrastructure::{ActionId, SurfaceId, SurfaceRegistry};
use crate::models::{DocumentUpload, ResultRecord, ResultSet};
use crate::services::{
    AnalysisReply, AnalysisService, BusyActionGuard, GuardOutcome, NotificationService,
    SharedRenderer,
};
use crate::workflow::state::{ResultReader, ResultWriter};
use serde_json::Value as JsonValue;
use std::sync::{Arc, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// 顶部导出按钮的默认内容
pub const EXPORT_HEADER_LABEL: &str = "📥 Download Excel";
/// 结果区导出按钮的默认内容
pub const EXPORT_INLINE_LABEL: &str = "📥 Export results";

/// 一次提交的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Completed { records: usize, version: u64 },
    /// 已上报的错误信息
    Failed(String),
    /// 已有提交在进行中
    Rejected,
}

/// 提交流程
pub struct SubmissionFlow {
    service: Arc<dyn AnalysisService>,
    guard: Arc<BusyActionGuard>,
    surfaces: Arc<SurfaceRegistry>,
    renderer: SharedRenderer,
    notifier: NotificationService,
    results: ResultWriter,
}

impl SubmissionFlow {
    pub fn new(
        service: Arc<dyn AnalysisService>,
        guard: Arc<BusyActionGuard>,
        surfaces: Arc<SurfaceRegistry>,
        renderer: SharedRenderer,
        notifier: NotificationService,
        results: ResultWriter,
    ) -> Self {
        Self {
            service,
            guard,
            surfaces,
            renderer,
            notifier,
            results,
        }
    }

    /// 只读的结果集句柄
    pub fn reader(&self) -> ResultReader {
        self.results.reader()
    }

    pub async fn submit(&self, file: Option<DocumentUpload>) -> SubmissionOutcome {
        let outcome = self
            .guard
            .run(ActionId::Submission, move || self.process(file))
            .await;

        match outcome {
            Ok(GuardOutcome::Completed((records, version))) => {
                self.notifier.success(format!(
                    "Analysis complete: {} record(s) processed successfully",
                    records
                ));
                SubmissionOutcome::Completed { records, version }
            }
            Ok(GuardOutcome::Rejected) => {
                debug!("提交进行中，忽略本次触发");
                SubmissionOutcome::Rejected
            }
            Err(e) => {
                warn!("提交失败: {}", e);
                let message = e.user_message();
                self.notifier.error(message.clone());
                SubmissionOutcome::Failed(message)
            }
        }
    }

    async fn process(&self, file: Option<DocumentUpload>) -> AppResult<(usize, u64)> {
        self.renderer().hide();

        let upload = file.ok_or(ValidationError::NoFileSelected)?;
        info!(
            "📤 上传 {} ({} MB) -> {}",
            upload.file_name,
            upload.size_mb(),
            self.service.endpoint()
        );

        let reply = self.service.analyze(&upload).await?;
        let set = validate_reply(&self.service.endpoint(), reply)?;
        let records = set.len();

        let version = self.results.replace(set.clone());
        self.reveal_export_surfaces();
        let first = self.renderer().render(set);

        info!(
            "✓ 分析完成: {} 条记录 (版本 {}), 首批渲染 {} 条",
            records,
            version,
            first.len()
        );
        Ok((records, version))
    }

    fn reveal_export_surfaces(&self) {
        for (id, label) in [
            (SurfaceId::EXPORT_HEADER, EXPORT_HEADER_LABEL),
            (SurfaceId::EXPORT_INLINE, EXPORT_INLINE_LABEL),
        ] {
            if self.surfaces.bind(ActionId::Export, id, label) {
                debug!("绑定导出入口 {}", id);
            }
            self.surfaces.set_visible(id, true);
        }
    }

    fn renderer(&self) -> MutexGuard<'_, crate::services::BatchRenderer> {
        self.renderer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 校验分析服务的回复，每一步失败都直接返回
pub fn validate_reply(endpoint: &str, reply: AnalysisReply) -> AppResult<ResultSet> {
    if !reply.is_success() {
        let message = reply.body.as_ref().and_then(|b| b.message());
        return Err(AppError::bad_status(
            endpoint,
            reply.http_status,
            message,
            GENERIC_ANALYSIS_FAILURE,
        ));
    }

    let body = reply.body.unwrap_or_default();
    if body.is_error_status() {
        return Err(AppError::error_status(body.message()));
    }

    let items = match body.data {
        Some(JsonValue::Array(items)) if !items.is_empty() => items,
        _ => return Err(ApplicationError::NoValidData.into()),
    };

    let set: ResultSet = items.into_iter().map(ResultRecord::from).collect();
    if let Some(marker) = set.first().and_then(ResultRecord::error_marker) {
        return Err(ApplicationError::BatchMarker(marker).into());
    }

    Ok(set)
}
