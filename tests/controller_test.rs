//! 控制器端到端测试：假的远程服务 + 内存显示区

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use soil_analysis_client::error::{AppResult, ValidationError, GENERIC_ANALYSIS_FAILURE};
use soil_analysis_client::infrastructure::{ActionId, MemoryView, SurfaceId};
use soil_analysis_client::models::{AnalysisResponse, DocumentUpload, ResultSet};
use soil_analysis_client::services::{
    AnalysisReply, AnalysisService, ExportReply, ExportService, NoticeKind, OperationState,
};
use soil_analysis_client::{AppError, Config, Controller, ControllerHandle};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ========== 假服务 ==========

#[derive(Default)]
struct FakeAnalysis {
    replies: Mutex<VecDeque<AnalysisReply>>,
    uploads: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl FakeAnalysis {
    fn replying(replies: Vec<AnalysisReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl AnalysisService for FakeAnalysis {
    async fn analyze(&self, upload: &DocumentUpload) -> AppResult<AnalysisReply> {
        self.uploads.lock().unwrap().push(upload.file_name.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let reply = self.replies.lock().unwrap().pop_front();
        Ok(reply.unwrap_or(AnalysisReply {
            http_status: 500,
            body: None,
        }))
    }

    fn endpoint(&self) -> String {
        "fake://analysis".to_string()
    }
}

#[derive(Default)]
struct FakeExport {
    calls: AtomicUsize,
    exported: Mutex<Vec<usize>>,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl ExportService for FakeExport {
    async fn export(&self, records: &ResultSet) -> AppResult<ExportReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.exported.lock().unwrap().push(records.len());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(ExportReply::Document(b"PK\x03\x04fake-xlsx".to_vec()))
    }

    fn endpoint(&self) -> String {
        "fake://export".to_string()
    }
}

// ========== 工具 ==========

fn records(n: usize) -> JsonValue {
    JsonValue::Array(
        (0..n)
            .map(|i| {
                json!({
                    "nombre_productor": format!("Productor {}", i + 1),
                    "municipio": if i % 2 == 0 { "Celaya" } else { "Irapuato" },
                    "cultivo_establecer": "Maíz",
                    "ph": 6.5,
                    "interp_ph": "Moderadamente ácido",
                })
            })
            .collect(),
    )
}

fn ok_reply(data: JsonValue) -> AnalysisReply {
    AnalysisReply::ok(AnalysisResponse {
        status: Some("ok".to_string()),
        data: Some(data),
        ..Default::default()
    })
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "soil-controller-{}-{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_pdf(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"%PDF-1.4\n% muestra\n").unwrap();
    path
}

struct Harness {
    handle: ControllerHandle,
    view: MemoryView,
    analysis: Arc<FakeAnalysis>,
    export: Arc<FakeExport>,
    dir: PathBuf,
}

impl Harness {
    fn start(name: &str, window: usize, analysis: FakeAnalysis, export: FakeExport) -> Self {
        let dir = scratch_dir(name);
        let config = Config {
            window_size: window,
            download_dir: dir.join("downloads"),
            ..Config::default()
        };
        let view = MemoryView::new();
        let analysis = Arc::new(analysis);
        let export = Arc::new(export);
        let controller = Controller::assemble(
            &config,
            analysis.clone(),
            export.clone(),
            Box::new(view.clone()),
        );
        let (handle, _join) = controller.spawn();
        Self {
            handle,
            view,
            analysis,
            export,
            dir,
        }
    }

    async fn select_pdf(&self) {
        let path = write_pdf(&self.dir, "informe.pdf");
        self.handle.open(path).await;
        self.handle.idle().await;
    }

    async fn submit(&self) {
        self.handle.submit().await;
        self.handle.idle().await;
    }

    fn notices(&self) -> Vec<(NoticeKind, String)> {
        self.handle
            .notifier()
            .active()
            .into_iter()
            .map(|n| (n.kind, n.message))
            .collect()
    }

    fn errors(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|(kind, _)| *kind == NoticeKind::Error)
            .map(|(_, message)| message)
            .collect()
    }

    async fn wait_until(&self, mut done: impl FnMut(&ControllerHandle) -> bool) {
        for _ in 0..200 {
            if done(&self.handle) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }
}

// ========== 场景 ==========

#[tokio::test]
async fn test_three_records_render_in_windows_of_two() {
    let h = Harness::start(
        "three",
        2,
        FakeAnalysis::replying(vec![ok_reply(records(3))]),
        FakeExport::default(),
    );
    h.select_pdf().await;
    h.submit().await;

    let state = h.view.state();
    assert!(state.visible);
    assert_eq!(state.summary.as_ref().unwrap().total, 3);
    assert_eq!(h.view.numbers(), vec![1, 2]);
    assert_eq!(state.load_more.unwrap().label(), "Load more records (2/3)");

    assert_eq!(
        h.notices(),
        vec![(
            NoticeKind::Success,
            "Analysis complete: 3 record(s) processed successfully".to_string()
        )]
    );

    h.handle.load_more().await;
    let status = h.handle.status().await.unwrap();
    assert_eq!(h.view.numbers(), vec![1, 2, 3]);
    assert!(h.view.state().load_more.is_none());
    assert_eq!((status.rendered, status.total, status.has_more), (3, 3, false));
    assert_eq!(status.result_version, 1);
    assert_eq!(status.report.records_loaded, 3);

    // 导出入口在成功提交后出现
    for id in [SurfaceId::EXPORT_HEADER, SurfaceId::EXPORT_INLINE] {
        let surface = h.handle.surfaces().surface(id).unwrap();
        assert!(surface.visible && surface.enabled);
    }
    assert_eq!(h.analysis.calls(), 1);
}

#[tokio::test]
async fn test_error_status_reports_server_message() {
    let reply = AnalysisReply::ok(AnalysisResponse {
        status: Some("error".to_string()),
        message: Some("bad format".to_string()),
        ..Default::default()
    });
    let h = Harness::start(
        "bad-format",
        20,
        FakeAnalysis::replying(vec![reply]),
        FakeExport::default(),
    );
    h.select_pdf().await;
    h.submit().await;

    assert_eq!(h.errors(), vec!["bad format".to_string()]);
    assert!(h.handle.results().current().is_none());
    assert!(!h.view.state().visible);

    let submit = h.handle.surfaces().surface(SurfaceId::SUBMIT).unwrap();
    assert!(submit.enabled);
    assert_eq!(submit.content, submit.label);
    assert!(h.handle.surfaces().surface(SurfaceId::EXPORT_HEADER).is_none());

    let status = h.handle.status().await.unwrap();
    assert_eq!(status.report.submissions_failed, 1);
    assert_eq!(status.submission, OperationState::Idle);
}

#[tokio::test]
async fn test_empty_data_reports_no_valid_data() {
    let h = Harness::start(
        "empty",
        20,
        FakeAnalysis::replying(vec![ok_reply(json!([]))]),
        FakeExport::default(),
    );
    h.select_pdf().await;
    h.submit().await;

    assert_eq!(
        h.errors(),
        vec!["no valid data found in the PDF file".to_string()]
    );
    assert!(h.handle.results().current().is_none());
}

#[tokio::test]
async fn test_submit_right_after_open_uploads_that_file() {
    let h = Harness::start(
        "open-then-submit",
        20,
        FakeAnalysis::replying(vec![ok_reply(records(2))]),
        FakeExport::default(),
    );
    let path = write_pdf(&h.dir, "muestra_1.pdf");
    h.handle.open(path).await;
    h.handle.submit().await;
    h.handle.idle().await;

    assert_eq!(*h.analysis.uploads.lock().unwrap(), vec!["muestra_1.pdf"]);
    assert!(h.errors().is_empty());
    assert_eq!(h.handle.results().version(), 1);
}

#[tokio::test]
async fn test_new_selection_replaces_pending_file_before_submit() {
    let h = Harness::start(
        "replace-pending",
        20,
        FakeAnalysis::replying(vec![ok_reply(records(1))]),
        FakeExport::default(),
    );
    h.handle.open(write_pdf(&h.dir, "anterior.pdf")).await;
    h.handle.idle().await;

    h.handle.open(write_pdf(&h.dir, "nuevo.pdf")).await;
    h.handle.submit().await;
    h.handle.idle().await;

    assert_eq!(*h.analysis.uploads.lock().unwrap(), vec!["nuevo.pdf"]);
    assert_eq!(
        h.handle.status().await.unwrap().pending_file.as_deref(),
        Some("nuevo.pdf")
    );
}

#[tokio::test]
async fn test_submit_without_file_makes_no_request() {
    let h = Harness::start("no-file", 20, FakeAnalysis::default(), FakeExport::default());
    h.submit().await;

    assert_eq!(h.analysis.calls(), 0);
    assert_eq!(
        h.errors(),
        vec![AppError::from(ValidationError::NoFileSelected).user_message()]
    );
}

#[tokio::test]
async fn test_invalid_selection_clears_pending_file() {
    let h = Harness::start("invalid", 20, FakeAnalysis::default(), FakeExport::default());
    h.select_pdf().await;
    assert_eq!(
        h.handle.status().await.unwrap().pending_file.as_deref(),
        Some("informe.pdf")
    );

    let notes = h.dir.join("notas.txt");
    std::fs::write(&notes, b"no es pdf").unwrap();
    h.handle.open(notes).await;
    h.handle.idle().await;

    let status = h.handle.status().await.unwrap();
    assert_eq!(status.pending_file, None);
    assert_eq!(status.report.selections_rejected, 1);
    assert_eq!(h.errors().len(), 1);
    assert!(h.errors()[0].starts_with("Please select a valid PDF file"));
}

#[tokio::test]
async fn test_export_without_data_never_calls_service() {
    let h = Harness::start("export-empty", 20, FakeAnalysis::default(), FakeExport::default());
    h.handle.export(SurfaceId::EXPORT_HEADER).await;
    h.handle.idle().await;

    assert_eq!(h.errors(), vec!["nothing to export".to_string()]);
    assert_eq!(h.export.calls.load(Ordering::SeqCst), 0);
    let status = h.handle.status().await.unwrap();
    assert_eq!(status.export, OperationState::Idle);
    assert_eq!(status.report.exports_failed, 1);
}

#[tokio::test]
async fn test_concurrent_export_is_rejected_and_surfaces_flip_together() {
    let gate = Arc::new(Notify::new());
    let h = Harness::start(
        "export-twice",
        20,
        FakeAnalysis::replying(vec![ok_reply(records(3))]),
        FakeExport {
            gate: Some(gate.clone()),
            ..Default::default()
        },
    );
    h.select_pdf().await;
    h.submit().await;

    h.handle.export(SurfaceId::EXPORT_HEADER).await;
    h.handle.export(SurfaceId::EXPORT_INLINE).await;
    h.wait_until(|handle| {
        handle
            .surfaces()
            .snapshot(ActionId::Export)
            .iter()
            .all(|s| s.is_busy())
    })
    .await;

    let status = loop {
        let status = h.handle.status().await.unwrap();
        if status.report.rejected == 1 {
            break status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    assert_eq!(status.export, OperationState::InFlight);
    assert!(h.handle.surfaces().is_consistent(ActionId::Export));
    for surface in h.handle.surfaces().snapshot(ActionId::Export) {
        assert_eq!(surface.content, ActionId::Export.working_label());
    }

    gate.notify_one();
    h.handle.idle().await;

    assert_eq!(h.export.calls.load(Ordering::SeqCst), 1);
    for surface in h.handle.surfaces().snapshot(ActionId::Export) {
        assert!(surface.enabled);
        assert_eq!(surface.content, surface.label);
    }

    let status = h.handle.status().await.unwrap();
    assert_eq!(status.report.exports_saved, 1);
    assert_eq!(status.export, OperationState::Idle);

    let saved: Vec<_> = std::fs::read_dir(h.dir.join("downloads"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].starts_with("analisis_suelo_INIFAP_"));
    assert!(saved[0].ends_with(".xlsx"));
}

#[tokio::test]
async fn test_failed_submission_keeps_previous_set_exportable() {
    let h = Harness::start(
        "keep-previous",
        20,
        FakeAnalysis::replying(vec![ok_reply(records(3))]),
        FakeExport::default(),
    );
    h.select_pdf().await;
    h.submit().await;
    assert_eq!(h.handle.results().version(), 1);

    // 第二次没有预设回复，假服务返回 500 且无响应体
    h.submit().await;
    assert_eq!(h.analysis.calls(), 2);
    assert_eq!(h.errors(), vec![GENERIC_ANALYSIS_FAILURE.to_string()]);
    assert_eq!(h.handle.results().version(), 1);

    h.handle.export(SurfaceId::EXPORT_INLINE).await;
    h.handle.idle().await;
    assert_eq!(*h.export.exported.lock().unwrap(), vec![3]);

    let report = h.handle.status().await.unwrap().report;
    assert_eq!(report.submissions_completed, 1);
    assert_eq!(report.submissions_failed, 1);
    assert_eq!(report.exports_saved, 1);
}

#[tokio::test]
async fn test_double_submit_sends_one_request() {
    let gate = Arc::new(Notify::new());
    let h = Harness::start(
        "double-submit",
        20,
        FakeAnalysis {
            replies: Mutex::new(vec![ok_reply(records(1))].into()),
            gate: Some(gate.clone()),
            ..Default::default()
        },
        FakeExport::default(),
    );
    h.select_pdf().await;

    h.handle.submit().await;
    h.handle.submit().await;
    h.wait_until(|handle| {
        handle
            .surfaces()
            .surface(SurfaceId::SUBMIT)
            .is_some_and(|s| s.is_busy())
    })
    .await;
    assert!(h.handle.surfaces().is_consistent(ActionId::Submission));

    gate.notify_one();
    h.handle.idle().await;

    assert_eq!(h.analysis.calls(), 1);
    let report = h.handle.status().await.unwrap().report;
    assert_eq!(report.submissions_completed, 1);
    assert_eq!(report.rejected, 1);
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_work() {
    let h = Harness::start(
        "shutdown",
        20,
        FakeAnalysis::replying(vec![ok_reply(records(2))]),
        FakeExport::default(),
    );
    let Harness { handle, dir, .. } = h;
    let path = write_pdf(&dir, "informe.pdf");
    handle.open(path).await;
    handle.idle().await;
    handle.submit().await;
    assert!(handle.shutdown().await);

    handle.idle().await;
    assert!(handle.status().await.is_none());
    assert_eq!(handle.results().version(), 1);
}
