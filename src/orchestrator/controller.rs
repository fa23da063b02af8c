//! 事件循环控制器 - 编排层
//!
//! ## 职责
//!
//! 把用户动作（打开文件、提交、导出、加载更多、关闭通知）变成 `UiEvent`，
//! 在单个任务里顺序处理。循环本身从不等待网络：每个受守卫保护的操作都在
//! 独立任务中运行，完成后以 `OperationResolved` 回到循环里汇总统计。
//!
//! ## 装配
//!
//! `Controller::assemble` 负责把入口注册表、守卫、结果集、渲染器、通知服务
//! 和两个远程服务接到一起，编排层之外的模块互不感知。

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{ActionId, DownloadDir, ResultsView, SurfaceId, SurfaceRegistry};
use crate::models::{DocumentUpload, UploadPolicy};
use crate::services::{
    AnalysisService, BatchRenderer, BusyActionGuard, ExportService, NoticeTiming,
    NotificationService, OperationState, SharedRenderer,
};
use crate::workflow::{
    result_cell, ExportFlow, ExportOutcome, ResultReader, SubmissionFlow, SubmissionOutcome,
};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

const EVENT_CAPACITY: usize = 64;

/// 提交按钮的默认内容
pub const SUBMIT_LABEL: &str = "🔬 Analyze PDF";

/// 用户动作与内部回报
#[derive(Debug)]
pub enum UiEvent {
    FileSelected(PathBuf),
    SubmitTriggered,
    ExportTriggered(SurfaceId),
    LoadMoreTriggered,
    DismissNotice(u64),
    /// 后台任务完成（由循环内部产生）
    OperationResolved(Resolution),
    /// 查询当前状态
    Status(oneshot::Sender<ControllerStatus>),
    /// 所有后台任务结束后回复
    WhenIdle(oneshot::Sender<()>),
    Shutdown,
}

/// 后台任务的结果
#[derive(Debug)]
pub enum Resolution {
    FileLoaded {
        /// 选择序号，只接受最后一次选择
        selection: u64,
        path: PathBuf,
        result: AppResult<DocumentUpload>,
    },
    Submission(SubmissionOutcome),
    Export(ExportOutcome),
}

/// 会话统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerReport {
    pub submissions_completed: usize,
    pub submissions_failed: usize,
    pub exports_saved: usize,
    pub exports_failed: usize,
    /// 操作进行中被丢弃的触发
    pub rejected: usize,
    /// 选择文件时未通过校验
    pub selections_rejected: usize,
    /// 最近一次成功提交的记录数
    pub records_loaded: usize,
}

impl ControllerReport {
    pub fn succeeded(&self) -> usize {
        self.submissions_completed + self.exports_saved
    }

    pub fn failed(&self) -> usize {
        self.submissions_failed + self.exports_failed
    }

    pub fn total(&self) -> usize {
        self.succeeded() + self.failed()
    }
}

/// 某一时刻的可观察状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerStatus {
    pub pending_file: Option<String>,
    pub result_version: u64,
    pub rendered: usize,
    pub total: usize,
    pub has_more: bool,
    pub submission: OperationState,
    pub export: OperationState,
    pub active_notices: Vec<u64>,
    pub in_flight: usize,
    pub report: ControllerReport,
}

/// 控制器的发送端，以及测试与终端需要观察的共享部件
#[derive(Clone)]
pub struct ControllerHandle {
    events: mpsc::Sender<UiEvent>,
    surfaces: Arc<SurfaceRegistry>,
    notifier: NotificationService,
    results: ResultReader,
}

impl ControllerHandle {
    /// 发送事件；循环已结束时返回 false
    pub async fn send(&self, event: UiEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    pub async fn open(&self, path: impl Into<PathBuf>) -> bool {
        self.send(UiEvent::FileSelected(path.into())).await
    }

    pub async fn submit(&self) -> bool {
        self.send(UiEvent::SubmitTriggered).await
    }

    pub async fn export(&self, surface: SurfaceId) -> bool {
        self.send(UiEvent::ExportTriggered(surface)).await
    }

    pub async fn load_more(&self) -> bool {
        self.send(UiEvent::LoadMoreTriggered).await
    }

    pub async fn dismiss(&self, id: u64) -> bool {
        self.send(UiEvent::DismissNotice(id)).await
    }

    pub async fn status(&self) -> Option<ControllerStatus> {
        let (tx, rx) = oneshot::channel();
        if !self.send(UiEvent::Status(tx)).await {
            return None;
        }
        rx.await.ok()
    }

    /// 等到没有后台任务在运行
    pub async fn idle(&self) {
        let (tx, rx) = oneshot::channel();
        if self.send(UiEvent::WhenIdle(tx)).await {
            let _ = rx.await;
        }
    }

    pub async fn shutdown(&self) -> bool {
        self.send(UiEvent::Shutdown).await
    }

    pub fn surfaces(&self) -> &Arc<SurfaceRegistry> {
        &self.surfaces
    }

    pub fn notifier(&self) -> &NotificationService {
        &self.notifier
    }

    pub fn results(&self) -> &ResultReader {
        &self.results
    }
}

/// 事件循环控制器
pub struct Controller {
    submission: Arc<SubmissionFlow>,
    export: Arc<ExportFlow>,
    guard: Arc<BusyActionGuard>,
    surfaces: Arc<SurfaceRegistry>,
    renderer: SharedRenderer,
    notifier: NotificationService,
    results: ResultReader,
    policy: Arc<UploadPolicy>,
    pending: Option<DocumentUpload>,
    selection: u64,
    /// 已处理完的最新选择序号
    loaded: u64,
    /// 等待文件读取完成的提交触发
    held_submits: usize,
    tasks: JoinSet<Resolution>,
    idle_waiters: Vec<oneshot::Sender<()>>,
    report: ControllerReport,
}

impl Controller {
    /// 按配置装配所有部件；提交入口在此绑定，导出入口在首次成功提交后出现
    pub fn assemble(
        config: &Config,
        analysis: Arc<dyn AnalysisService>,
        exporter: Arc<dyn ExportService>,
        view: Box<dyn ResultsView>,
    ) -> Self {
        let surfaces = Arc::new(SurfaceRegistry::new());
        surfaces.bind(ActionId::Submission, SurfaceId::SUBMIT, SUBMIT_LABEL);
        surfaces.set_visible(SurfaceId::SUBMIT, true);

        let guard = Arc::new(BusyActionGuard::new(surfaces.clone()));
        let notifier = NotificationService::new(NoticeTiming::from_config(config));
        let renderer = BatchRenderer::new(view, config.window_size).shared();
        let (writer, reader) = result_cell();

        let submission = SubmissionFlow::new(
            analysis,
            guard.clone(),
            surfaces.clone(),
            renderer.clone(),
            notifier.clone(),
            writer,
        );
        let export = ExportFlow::new(
            exporter,
            guard.clone(),
            reader.clone(),
            DownloadDir::new(config.download_dir.clone()),
            notifier.clone(),
            config.export_file_prefix.clone(),
        );

        Self {
            submission: Arc::new(submission),
            export: Arc::new(export),
            guard,
            surfaces,
            renderer,
            notifier,
            results: reader,
            policy: Arc::new(UploadPolicy::new(
                config.accepted_mime.clone(),
                config.max_file_bytes,
            )),
            pending: None,
            selection: 0,
            loaded: 0,
            held_submits: 0,
            tasks: JoinSet::new(),
            idle_waiters: Vec::new(),
            report: ControllerReport::default(),
        }
    }

    pub fn notifier(&self) -> &NotificationService {
        &self.notifier
    }

    /// 启动事件循环（需在 tokio 运行时内调用）
    pub fn spawn(self) -> (ControllerHandle, JoinHandle<ControllerReport>) {
        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        let handle = ControllerHandle {
            events: tx,
            surfaces: self.surfaces.clone(),
            notifier: self.notifier.clone(),
            results: self.results.clone(),
        };
        (handle, tokio::spawn(self.run(rx)))
    }

    async fn run(mut self, mut events: mpsc::Receiver<UiEvent>) -> ControllerReport {
        info!("✓ 控制器已启动");
        loop {
            tokio::select! {
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.on_joined(joined);
                }
                event = events.recv() => match event {
                    Some(UiEvent::Shutdown) | None => break,
                    Some(event) => self.handle(event),
                },
            }
        }

        if !self.tasks.is_empty() {
            info!("⏳ 等待 {} 个后台任务结束...", self.tasks.len());
        }
        while let Some(joined) = self.tasks.join_next().await {
            self.on_joined(joined);
        }
        self.wake_idle();

        info!("✓ 控制器已停止");
        self.report
    }

    fn handle(&mut self, event: UiEvent) {
        match event {
            UiEvent::FileSelected(path) => self.select_file(path),
            UiEvent::SubmitTriggered => {
                if self.loaded < self.selection {
                    debug!("文件读取中，提交延后");
                    self.held_submits += 1;
                } else {
                    self.spawn_submission();
                }
            }
            UiEvent::ExportTriggered(surface) => {
                debug!("导出触发自 {}", surface);
                let flow = self.export.clone();
                self.tasks
                    .spawn(async move { Resolution::Export(flow.export_current().await) });
            }
            UiEvent::LoadMoreTriggered => {
                let mut renderer = self.renderer.lock().unwrap_or_else(PoisonError::into_inner);
                match renderer.load_more() {
                    Some(span) => info!(
                        "📄 加载更多: {}-{} / {}",
                        span.start + 1,
                        span.end,
                        span.total
                    ),
                    None => debug!("没有可加载的记录"),
                }
            }
            UiEvent::DismissNotice(id) => {
                if !self.notifier.dismiss(id) {
                    debug!("通知 #{} 不存在或已移除", id);
                }
            }
            UiEvent::OperationResolved(resolution) => self.resolve(resolution),
            UiEvent::Status(reply) => {
                let _ = reply.send(self.status());
            }
            UiEvent::WhenIdle(reply) => {
                self.idle_waiters.push(reply);
                self.wake_idle();
            }
            // run 中已处理
            UiEvent::Shutdown => {}
        }
    }

    fn spawn_submission(&mut self) {
        let flow = self.submission.clone();
        let file = self.pending.clone();
        self.tasks
            .spawn(async move { Resolution::Submission(flow.submit(file).await) });
    }

    fn select_file(&mut self, path: PathBuf) {
        self.selection += 1;
        let selection = self.selection;
        let policy = self.policy.clone();
        self.tasks.spawn(async move {
            let result = DocumentUpload::from_path(&path, &policy).await;
            Resolution::FileLoaded {
                selection,
                path,
                result,
            }
        });
    }

    fn on_joined(&mut self, joined: Result<Resolution, tokio::task::JoinError>) {
        match joined {
            Ok(resolution) => self.handle(UiEvent::OperationResolved(resolution)),
            Err(e) => error!("后台任务异常退出: {}", e),
        }
        self.wake_idle();
    }

    fn resolve(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::FileLoaded {
                selection,
                path,
                result,
            } => {
                if selection != self.selection {
                    debug!("忽略过期的文件选择: {}", path.display());
                    return;
                }
                self.loaded = selection;
                match result {
                    Ok(upload) => {
                        info!("✓ 已选择 {} ({} MB)", upload.file_name, upload.size_mb());
                        self.pending = Some(upload);
                    }
                    Err(e) => {
                        warn!("文件未通过校验 {}: {}", path.display(), e);
                        self.pending = None;
                        self.report.selections_rejected += 1;
                        self.notifier.error(e.user_message());
                    }
                }
                for _ in 0..std::mem::take(&mut self.held_submits) {
                    self.spawn_submission();
                }
            }
            Resolution::Submission(outcome) => match outcome {
                SubmissionOutcome::Completed { records, .. } => {
                    self.report.submissions_completed += 1;
                    self.report.records_loaded = records;
                }
                SubmissionOutcome::Failed(_) => self.report.submissions_failed += 1,
                SubmissionOutcome::Rejected => self.report.rejected += 1,
            },
            Resolution::Export(outcome) => match outcome {
                ExportOutcome::Saved(_) => self.report.exports_saved += 1,
                ExportOutcome::Failed(_) => self.report.exports_failed += 1,
                ExportOutcome::Rejected => self.report.rejected += 1,
            },
        }
    }

    fn wake_idle(&mut self) {
        if self.tasks.is_empty() {
            for waiter in self.idle_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    fn status(&self) -> ControllerStatus {
        let renderer = self.renderer.lock().unwrap_or_else(PoisonError::into_inner);
        ControllerStatus {
            pending_file: self.pending.as_ref().map(|f| f.file_name.clone()),
            result_version: self.results.version(),
            rendered: renderer.rendered_count(),
            total: renderer.total(),
            has_more: renderer.has_more(),
            submission: self.guard.state(ActionId::Submission),
            export: self.guard.state(ActionId::Export),
            active_notices: self.notifier.active().iter().map(|n| n.id).collect(),
            in_flight: self.tasks.len(),
            report: self.report.clone(),
        }
    }
}
