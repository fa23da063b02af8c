//! 分批渲染器 - 业务能力层
//!
//! 大 PDF 会产生成千上万条记录，一次性渲染代价最高。这里按固定窗口大小分批物化，
//! 只有用户激活"加载更多"时才渲染下一批。给定结果集和窗口大小，批次边界完全确定。

use crate::infrastructure::ResultsView;
use crate::models::{DisplayItem, LoadMoreControl, ResultSet};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// 默认窗口大小
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// 已物化的记录数；只按窗口前进，新结果集时归零
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderCursor {
    rendered: usize,
}

impl RenderCursor {
    pub fn rendered_count(&self) -> usize {
        self.rendered
    }

    fn reset(&mut self) {
        self.rendered = 0;
    }

    fn advance_to(&mut self, end: usize) {
        debug_assert!(end >= self.rendered);
        self.rendered = end;
    }
}

/// 一次窗口渲染的区间 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpan {
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

impl WindowSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is_last(&self) -> bool {
        self.end == self.total
    }
}

/// 计算下一个窗口
pub fn next_window(rendered: usize, window_size: usize, total: usize) -> WindowSpan {
    let start = rendered.min(total);
    WindowSpan {
        start,
        end: (start + window_size).min(total),
        total,
    }
}

/// 在多个任务之间共享的渲染器
pub type SharedRenderer = Arc<Mutex<BatchRenderer>>;

pub struct BatchRenderer {
    view: Box<dyn ResultsView>,
    window_size: usize,
    current: Option<ResultSet>,
    cursor: RenderCursor,
    /// 当前是否挂着"加载更多"控件
    load_more_shown: bool,
    windows: usize,
}

impl BatchRenderer {
    pub fn new(view: Box<dyn ResultsView>, window_size: usize) -> Self {
        Self {
            view,
            window_size: window_size.max(1),
            current: None,
            cursor: RenderCursor::default(),
            load_more_shown: false,
            windows: 0,
        }
    }

    pub fn shared(self) -> SharedRenderer {
        Arc::new(Mutex::new(self))
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn rendered_count(&self) -> usize {
        self.cursor.rendered_count()
    }

    /// 当前结果集已渲染的窗口数
    pub fn windows_rendered(&self) -> usize {
        self.windows
    }

    pub fn has_more(&self) -> bool {
        self.load_more_shown
    }

    pub fn total(&self) -> usize {
        self.current.as_ref().map_or(0, ResultSet::len)
    }

    /// 渲染新结果集：清空、游标归零、输出汇总、渲染第一个窗口（空集时没有窗口）
    pub fn render(&mut self, result_set: ResultSet) -> WindowSpan {
        self.view.clear();
        self.cursor.reset();
        self.load_more_shown = false;
        self.windows = 0;

        let summary = result_set.summary();
        self.view.summary(&summary);
        let empty = result_set.is_empty();
        self.current = Some(result_set);

        // 空结果集只显示汇总，不产生窗口
        let span = if empty {
            next_window(0, self.window_size, 0)
        } else {
            self.render_window()
        };
        self.view.set_visible(true);
        span
    }

    /// 激活"加载更多"：移除控件并渲染下一个窗口；没有控件时返回 None
    pub fn load_more(&mut self) -> Option<WindowSpan> {
        if !self.load_more_shown {
            return None;
        }
        self.view.remove_load_more();
        self.load_more_shown = false;
        Some(self.render_window())
    }

    /// 隐藏结果容器，不清除已渲染内容
    pub fn hide(&mut self) {
        self.view.set_visible(false);
    }

    fn render_window(&mut self) -> WindowSpan {
        let total = self.total();
        let span = next_window(self.cursor.rendered_count(), self.window_size, total);

        if let Some(set) = &self.current {
            for (offset, record) in set.slice(span.start..span.end).iter().enumerate() {
                self.view
                    .item(DisplayItem::from_record(span.start + offset + 1, record));
            }
        }
        self.cursor.advance_to(span.end);
        self.windows += 1;

        if !span.is_last() {
            self.view.load_more(LoadMoreControl {
                rendered: span.end,
                total,
            });
            self.load_more_shown = true;
        }

        debug!(
            "渲染窗口 #{}: [{}, {}) / {}",
            self.windows, span.start, span.end, total
        );
        span
    }
}
