//! 结果显示区 - 基础设施层
//!
//! 渲染器只通过 `ResultsView` 写入显示区，不关心显示介质。

use crate::models::display::{DisplayItem, LoadMoreControl};
use crate::models::ResultSummary;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 结果显示区
pub trait ResultsView: Send {
    /// 清空已渲染内容
    fn clear(&mut self);
    /// 显示/隐藏结果容器
    fn set_visible(&mut self, visible: bool);
    fn summary(&mut self, summary: &ResultSummary);
    fn item(&mut self, item: DisplayItem);
    /// 追加"加载更多"控件
    fn load_more(&mut self, control: LoadMoreControl);
    fn remove_load_more(&mut self);
}

/// 内存中的显示区状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryViewState {
    pub visible: bool,
    pub summary: Option<ResultSummary>,
    pub items: Vec<DisplayItem>,
    pub load_more: Option<LoadMoreControl>,
    /// 被清空的次数
    pub clears: usize,
}

/// 内存显示区，克隆后共享同一状态，便于检查渲染结果
#[derive(Debug, Clone, Default)]
pub struct MemoryView {
    state: Arc<Mutex<MemoryViewState>>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> MemoryViewState {
        self.lock().clone()
    }

    /// 已显示条目的序号
    pub fn numbers(&self) -> Vec<usize> {
        self.lock().items.iter().map(|i| i.number).collect()
    }
}

impl ResultsView for MemoryView {
    fn clear(&mut self) {
        let mut state = self.lock();
        state.summary = None;
        state.items.clear();
        state.load_more = None;
        state.clears += 1;
    }

    fn set_visible(&mut self, visible: bool) {
        self.lock().visible = visible;
    }

    fn summary(&mut self, summary: &ResultSummary) {
        self.lock().summary = Some(summary.clone());
    }

    fn item(&mut self, item: DisplayItem) {
        self.lock().items.push(item);
    }

    fn load_more(&mut self, control: LoadMoreControl) {
        self.lock().load_more = Some(control);
    }

    fn remove_load_more(&mut self) {
        self.lock().load_more = None;
    }
}

/// 终端显示区
pub struct TerminalView<W: Write + Send> {
    out: W,
    visible: bool,
}

impl TerminalView<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out, visible: false }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        if self.visible {
            // 终端写失败不影响流程
            let _ = writeln!(self.out, "{}", text.as_ref());
        }
    }
}

impl<W: Write + Send> ResultsView for TerminalView<W> {
    fn clear(&mut self) {
        let _ = writeln!(self.out);
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn summary(&mut self, summary: &ResultSummary) {
        let mut parts = vec![format!("🧪 Muestras analizadas: {}", summary.total)];
        for (field, count) in &summary.distinct {
            parts.push(format!("{}: {}", field, count));
        }
        self.line("=".repeat(60));
        self.line(parts.join(" | "));
        self.line("=".repeat(60));
    }

    fn item(&mut self, item: DisplayItem) {
        self.line(format!("🌱 {}:", item.title()));
        for field in &item.fields {
            let tag = field.interpretation.tag();
            if tag.is_empty() {
                self.line(format!("    {}: {}", field.label, field.value));
            } else {
                self.line(format!("    {}: {} [{}]", field.label, field.value, tag));
            }
        }
    }

    fn load_more(&mut self, control: LoadMoreControl) {
        self.line(format!("▶ {}  (type `more`)", control.label()));
    }

    fn remove_load_more(&mut self) {}
}
